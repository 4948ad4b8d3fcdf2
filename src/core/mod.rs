use crate::core::fibonacci::fibonacci_iterator;
use crate::sections::SectionDecodeError;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, Numeric};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::BTreeSet;
use std::iter::repeat_with;
use thiserror::Error;

pub mod base64;
mod fibonacci;

/// A set of 1-based IDs, as carried by bitfields and ranges.
pub type IdSet = BTreeSet<u16>;

/// One entry of an integer range: either a single ID, or an inclusive
/// group of consecutive IDs.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RangeEntry {
    Single(u16),
    Group { start: u16, end: u16 },
}

/// The two wire representations of a set of IDs. The representation found
/// in the input is preserved so that re-encoding reproduces it.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RangeEncoding {
    Bitfield(IdSet),
    Ranges(Vec<RangeEntry>),
}

/// A set of IDs together with its declared maximum ID and wire
/// representation (bitfield of `max_id` bits, or a list of range entries).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct OptimizedIntegerRange {
    pub max_id: u16,
    pub encoding: RangeEncoding,
}

impl OptimizedIntegerRange {
    /// Builds a bitfield representation holding exactly `ids`, with
    /// `max_id` set to the largest ID.
    pub fn from_ids(ids: IdSet) -> Self {
        let max_id = ids.iter().next_back().copied().unwrap_or(0);
        Self {
            max_id,
            encoding: RangeEncoding::Bitfield(ids),
        }
    }

    /// Builds a range representation from the given entries, with `max_id`
    /// set to the largest ID they cover.
    pub fn from_entries(entries: Vec<RangeEntry>) -> Self {
        let max_id = entries
            .iter()
            .map(|e| match e {
                RangeEntry::Single(id) => *id,
                RangeEntry::Group { end, .. } => *end,
            })
            .max()
            .unwrap_or(0);
        Self {
            max_id,
            encoding: RangeEncoding::Ranges(entries),
        }
    }

    /// Materializes the set of IDs, whatever the representation.
    pub fn ids(&self) -> IdSet {
        match &self.encoding {
            RangeEncoding::Bitfield(ids) => ids.clone(),
            RangeEncoding::Ranges(entries) => entries
                .iter()
                .flat_map(|e| match e {
                    RangeEntry::Single(id) => *id..=*id,
                    RangeEntry::Group { start, end } => *start..=*end,
                })
                .collect(),
        }
    }

    pub fn contains(&self, id: u16) -> bool {
        match &self.encoding {
            RangeEncoding::Bitfield(ids) => ids.contains(&id),
            RangeEncoding::Ranges(entries) => entries.iter().any(|e| match e {
                RangeEntry::Single(single) => *single == id,
                RangeEntry::Group { start, end } => (*start..=*end).contains(&id),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.encoding {
            RangeEncoding::Bitfield(ids) => ids.is_empty(),
            RangeEncoding::Ranges(entries) => entries.is_empty(),
        }
    }
}

impl Default for OptimizedIntegerRange {
    fn default() -> Self {
        Self {
            max_id: 0,
            encoding: RangeEncoding::Bitfield(IdSet::new()),
        }
    }
}

/// A point in time, carried on the wire as a 36-bit count of deciseconds
/// since the Unix epoch. The raw decisecond value is preserved so that
/// re-encoding is lossless even for fractional-second timestamps.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Timestamp {
    deciseconds: u64,
}

impl Timestamp {
    pub fn from_deciseconds(deciseconds: u64) -> Self {
        Self { deciseconds }
    }

    pub fn from_unix_seconds(seconds: u64) -> Self {
        Self {
            deciseconds: seconds.saturating_mul(10),
        }
    }

    pub fn deciseconds(self) -> u64 {
        self.deciseconds
    }

    pub fn unix_seconds(self) -> u64 {
        self.deciseconds / 10
    }
}

/// A keyed range, as found in arrays of ranges (publisher restrictions).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Range {
    pub key: u8,
    pub range_type: u8,
    pub ids: OptimizedIntegerRange,
}

/// The error type that describes failures to encode a model back to bits.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: u32 },
    #[error("character {0:?} cannot be encoded")]
    InvalidCharacter(char),
    #[error("expected a string of {expected} characters, found {found}")]
    InvalidStringLength { expected: usize, found: usize },
    #[error("id {0} is out of bounds")]
    IdOutOfBounds(u16),
    #[error("invalid range entry, start {start} end {end}")]
    InvalidRangeEntry { start: u16, end: u16 },
}

pub trait FromDataReader: Sized {
    type Err;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err>;
}

pub trait ToDataWriter {
    type Err;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err>;
}

pub struct DataReader<'a> {
    bit_reader: BitReader<&'a [u8], BigEndian>,
    total_bits: u64,
    consumed_bits: u64,
}

impl<'a> DataReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bit_reader: BitReader::endian(bytes, BigEndian),
            total_bits: bytes.len() as u64 * 8,
            consumed_bits: 0,
        }
    }

    pub fn parse<F>(&mut self) -> Result<F, <F as FromDataReader>::Err>
    where
        F: FromDataReader,
    {
        FromDataReader::from_data_reader(self)
    }

    pub fn read_bool(&mut self) -> Result<bool, SectionDecodeError> {
        let bit = self.bit_reader.read_bit()?;
        self.consumed_bits += 1;
        Ok(bit)
    }

    pub fn read_fixed_integer<N: Numeric>(&mut self, bits: u32) -> Result<N, SectionDecodeError> {
        let n = self.bit_reader.read(bits)?;
        self.consumed_bits += u64::from(bits);
        Ok(n)
    }

    /// Number of bits left before the end of the buffer.
    pub fn remaining_bits(&self) -> u64 {
        self.total_bits - self.consumed_bits
    }

    pub fn read_fibonacci_integer(&mut self) -> Result<u16, SectionDecodeError> {
        let mut fib = fibonacci_iterator();
        let mut total = 0u16;
        let mut last_bit = false;

        loop {
            let bit = self.read_bool()?;

            // two consecutive 1's signal the end of the value
            if last_bit && bit {
                break;
            }

            let fib_value = fib.next().unwrap_or(0);
            if bit {
                total = total
                    .checked_add(fib_value)
                    .ok_or_else(|| SectionDecodeError::InvalidFieldValue {
                        expected: "fibonacci integer fitting in 16 bits".to_string(),
                        found: "larger value".to_string(),
                    })?;
            }
            last_bit = bit;
        }

        Ok(total)
    }

    pub fn read_string(&mut self, chars: usize) -> Result<String, SectionDecodeError> {
        repeat_with(|| self.read_fixed_integer::<u8>(6))
            .take(chars)
            .map(|r| r.map(|n| (n + 65) as char))
            .collect::<Result<String, _>>()
    }

    pub fn read_datetime(&mut self) -> Result<Timestamp, SectionDecodeError> {
        Ok(Timestamp::from_deciseconds(self.read_fixed_integer(36)?))
    }

    pub fn read_fixed_bitfield(&mut self, bits: usize) -> Result<IdSet, SectionDecodeError> {
        let mut result = IdSet::new();
        for i in 1..=bits {
            let b = self.read_bool()?;
            if b {
                result.insert(i as u16);
            }
        }

        Ok(result)
    }

    /// Reads a count-prefixed list of range entries, where each entry
    /// delta-encodes its IDs with Fibonacci integers, cumulatively over the
    /// previous entry. Used by the GPP header section ID list.
    pub fn read_fibonacci_range(&mut self) -> Result<Vec<u16>, SectionDecodeError> {
        let n = self.read_fixed_integer::<u16>(12)?;
        let mut range = vec![];
        let mut last_id = 0u16;

        for _ in 0..n {
            let is_group = self.read_bool()?;
            if is_group {
                let offset = self.read_fibonacci_integer()?;
                let count = self.read_fibonacci_integer()?;

                let start = u32::from(last_id) + u32::from(offset);
                let end = start + u32::from(count);
                if end > u32::from(u16::MAX) {
                    return Err(SectionDecodeError::InvalidFieldValue {
                        expected: "group of ids fitting in 16 bits".to_string(),
                        found: format!("group ending at {end}"),
                    });
                }

                for id in start as u16..=end as u16 {
                    range.push(id);
                }
                last_id = end as u16;
            } else {
                let offset = self.read_fibonacci_integer()?;
                let id = u32::from(last_id) + u32::from(offset);
                if id > u32::from(u16::MAX) {
                    return Err(SectionDecodeError::InvalidFieldValue {
                        expected: "id fitting in 16 bits".to_string(),
                        found: format!("id {id}"),
                    });
                }

                range.push(id as u16);
                last_id = id as u16;
            }
        }

        Ok(range)
    }

    /// Reads a count-prefixed list of range entries with fixed 16-bit IDs.
    pub fn read_integer_range(&mut self) -> Result<Vec<RangeEntry>, SectionDecodeError> {
        let n = self.read_fixed_integer::<u16>(12)?;
        let mut entries = vec![];

        for _ in 0..n {
            let is_group = self.read_bool()?;
            if is_group {
                let start = self.read_fixed_integer::<u16>(16)?;
                let end = self.read_fixed_integer::<u16>(16)?;

                if end < start {
                    return Err(SectionDecodeError::InvalidRangeEntry { start, end });
                }

                entries.push(RangeEntry::Group { start, end });
            } else {
                let id = self.read_fixed_integer::<u16>(16)?;
                entries.push(RangeEntry::Single(id));
            }
        }

        Ok(entries)
    }

    pub fn read_optimized_integer_range(
        &mut self,
    ) -> Result<OptimizedIntegerRange, SectionDecodeError> {
        let max_id = self.read_fixed_integer::<u16>(16)?;
        let is_int_range = self.read_bool()?;

        let encoding = if is_int_range {
            RangeEncoding::Ranges(self.read_integer_range()?)
        } else {
            RangeEncoding::Bitfield(self.read_fixed_bitfield(max_id as usize)?)
        };

        Ok(OptimizedIntegerRange { max_id, encoding })
    }

    pub fn read_array_of_ranges(&mut self) -> Result<Vec<Range>, SectionDecodeError> {
        let n = self.read_fixed_integer::<u16>(12)? as usize;
        repeat_with(|| {
            Ok(Range {
                key: self.read_fixed_integer::<u8>(6)?,
                range_type: self.read_fixed_integer::<u8>(2)?,
                ids: self.read_optimized_integer_range()?,
            })
        })
        .take(n)
        .collect()
    }

    /// Consumes the remaining bits and fails if any of them is set.
    pub fn verify_zero_padding(&mut self) -> Result<(), SectionDecodeError> {
        while self.remaining_bits() > 0 {
            if self.read_bool()? {
                return Err(SectionDecodeError::NonZeroPadding);
            }
        }
        Ok(())
    }
}

pub struct DataWriter {
    bit_writer: BitWriter<Vec<u8>, BigEndian>,
}

impl DataWriter {
    pub fn new() -> Self {
        Self {
            bit_writer: BitWriter::endian(Vec::new(), BigEndian),
        }
    }

    pub fn write<F>(&mut self, value: &F) -> Result<(), <F as ToDataWriter>::Err>
    where
        F: ToDataWriter,
    {
        value.to_data_writer(self)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), EncodeError> {
        self.bit_writer
            .write_bit(value)
            .expect("write into vec should not fail");
        Ok(())
    }

    pub fn write_fixed_integer(&mut self, value: u64, bits: u32) -> Result<(), EncodeError> {
        if bits < u64::BITS && value >> bits != 0 {
            return Err(EncodeError::ValueOutOfRange { value, bits });
        }

        self.bit_writer
            .write(bits, value)
            .expect("write into vec should not fail");
        Ok(())
    }

    pub fn write_fibonacci_integer(&mut self, value: u16) -> Result<(), EncodeError> {
        if value == 0 {
            return Err(EncodeError::IdOutOfBounds(0));
        }

        let fibs = fibonacci_iterator()
            .take_while(|&f| f <= value)
            .collect::<Vec<_>>();

        // Zeckendorf representation, terminated by a second 1 bit
        let mut bits = vec![false; fibs.len() + 1];
        *bits.last_mut().unwrap() = true;
        let mut rest = value;
        for (i, &f) in fibs.iter().enumerate().rev() {
            if f <= rest {
                bits[i] = true;
                rest -= f;
            }
        }

        for bit in bits {
            self.write_bool(bit)?;
        }

        Ok(())
    }

    pub fn write_string(&mut self, s: &str, chars: usize) -> Result<(), EncodeError> {
        if s.chars().count() != chars {
            return Err(EncodeError::InvalidStringLength {
                expected: chars,
                found: s.chars().count(),
            });
        }

        for c in s.chars() {
            let n = (c as u32)
                .checked_sub(65)
                .filter(|&n| n < 64)
                .ok_or(EncodeError::InvalidCharacter(c))?;
            self.write_fixed_integer(u64::from(n), 6)?;
        }

        Ok(())
    }

    pub fn write_datetime(&mut self, t: Timestamp) -> Result<(), EncodeError> {
        self.write_fixed_integer(t.deciseconds(), 36)
    }

    pub fn write_fixed_bitfield(&mut self, ids: &IdSet, bits: usize) -> Result<(), EncodeError> {
        if let Some(&id) = ids.iter().find(|&&id| id == 0 || id as usize > bits) {
            return Err(EncodeError::IdOutOfBounds(id));
        }

        for i in 1..=bits {
            self.write_bool(ids.contains(&(i as u16)))?;
        }

        Ok(())
    }

    /// Inverse of [`DataReader::read_fibonacci_range`]. IDs must be non-zero
    /// and strictly increasing; runs of consecutive IDs become groups.
    pub fn write_fibonacci_range(&mut self, ids: &[u16]) -> Result<(), EncodeError> {
        let mut last_id = 0u16;
        for &id in ids {
            if id <= last_id {
                return Err(EncodeError::IdOutOfBounds(id));
            }
            last_id = id;
        }

        // group runs of consecutive ids into (start, end) entries
        let mut entries: Vec<(u16, u16)> = vec![];
        for &id in ids {
            match entries.last_mut() {
                Some((_, end)) if u32::from(*end) + 1 == u32::from(id) => *end = id,
                _ => entries.push((id, id)),
            }
        }

        self.write_fixed_integer(entries.len() as u64, 12)?;

        let mut last_id = 0u16;
        for (start, end) in entries {
            if start == end {
                self.write_bool(false)?;
                self.write_fibonacci_integer(start - last_id)?;
            } else {
                self.write_bool(true)?;
                self.write_fibonacci_integer(start - last_id)?;
                self.write_fibonacci_integer(end - start)?;
            }
            last_id = end;
        }

        Ok(())
    }

    pub fn write_integer_range(&mut self, entries: &[RangeEntry]) -> Result<(), EncodeError> {
        self.write_fixed_integer(entries.len() as u64, 12)?;

        for entry in entries {
            match entry {
                RangeEntry::Single(id) => {
                    self.write_bool(false)?;
                    self.write_fixed_integer(u64::from(*id), 16)?;
                }
                RangeEntry::Group { start, end } => {
                    if end < start {
                        return Err(EncodeError::InvalidRangeEntry {
                            start: *start,
                            end: *end,
                        });
                    }
                    self.write_bool(true)?;
                    self.write_fixed_integer(u64::from(*start), 16)?;
                    self.write_fixed_integer(u64::from(*end), 16)?;
                }
            }
        }

        Ok(())
    }

    pub fn write_optimized_integer_range(
        &mut self,
        range: &OptimizedIntegerRange,
    ) -> Result<(), EncodeError> {
        self.write_fixed_integer(u64::from(range.max_id), 16)?;

        match &range.encoding {
            RangeEncoding::Bitfield(ids) => {
                self.write_bool(false)?;
                self.write_fixed_bitfield(ids, range.max_id as usize)?;
            }
            RangeEncoding::Ranges(entries) => {
                self.write_bool(true)?;
                self.write_integer_range(entries)?;
            }
        }

        Ok(())
    }

    pub fn write_array_of_ranges(&mut self, ranges: &[Range]) -> Result<(), EncodeError> {
        self.write_fixed_integer(ranges.len() as u64, 12)?;

        for range in ranges {
            self.write_fixed_integer(u64::from(range.key), 6)?;
            self.write_fixed_integer(u64::from(range.range_type), 2)?;
            self.write_optimized_integer_range(&range.ids)?;
        }

        Ok(())
    }

    /// Zero-pads to the next byte boundary and returns the written bytes.
    /// This is the only place padding bits are introduced.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bit_writer
            .byte_align()
            .expect("write into vec should not fail");
        self.bit_writer.into_writer()
    }
}

impl Default for DataWriter {
    fn default() -> Self {
        Self::new()
    }
}
