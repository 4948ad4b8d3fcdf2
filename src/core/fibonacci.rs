/// Iterator over the Fibonacci sequence as used by the GPP variable-length
/// integer encoding (1, 2, 3, 5, 8, ...).
///
/// The iterator ends once the next value no longer fits in a `u16`, which is
/// more than enough for GPP section IDs.
pub struct Fibonacci {
    curr: Option<u16>,
    next: Option<u16>,
}

impl Iterator for Fibonacci {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let next = self.curr?.checked_add(self.next?);

        self.curr = self.next;
        self.next = next;

        self.curr
    }
}

pub fn fibonacci_iterator() -> Fibonacci {
    Fibonacci {
        curr: Some(1),
        next: Some(1),
    }
}
