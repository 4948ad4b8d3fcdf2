use bitstream_io::{BigEndian, BitWrite, BitWriter};
use thiserror::Error;

/// The error type that describes failures to decode base64url encoded strings.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid character {0}")]
    InvalidCharacter(u8),
}

const BASE64_URL_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Custom base64 implementation, 6-bits aligned, no padding,
/// using the URL Safe Base64 dictionary.
///
/// The final partial byte, if any, is right-padded with zero bits. How many
/// of the decoded bits are meaningful is decided by the consumer.
pub fn decode(s: &str) -> Result<Vec<u8>, DecodeError> {
    // output buffer is smaller than the input string, so we pre-allocate
    // enough bytes to avoid a realloc
    let mut buffer = Vec::with_capacity(s.len());
    let mut bw = BitWriter::endian(&mut buffer, BigEndian);

    // write 6 bits for every decoded character
    for b in s.bytes() {
        let value = base64_value(b).ok_or(DecodeError::InvalidCharacter(b))?;
        bw.write(6, value).expect("write into vec should not fail");
    }

    // write remaining value if we're not 8-bit aligned at this point
    let (n, value) = bw.into_unwritten();
    if n > 0 {
        let n = 8 - n;
        let value = value << n;
        buffer.push(value);
    }

    Ok(buffer)
}

/// Inverse of [`decode`]: maps every 6 bits of the input to one character,
/// zero-padding the final group.
pub fn encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len().div_ceil(3) * 4);
    let mut acc = 0u32;
    let mut bits = 0u32;

    for &b in bytes {
        acc = (acc << 8) | u32::from(b);
        bits += 8;
        while bits >= 6 {
            bits -= 6;
            s.push(BASE64_URL_ALPHABET[((acc >> bits) & 0x3f) as usize] as char);
            acc &= (1 << bits) - 1;
        }
    }

    if bits > 0 {
        s.push(BASE64_URL_ALPHABET[((acc << (6 - bits)) & 0x3f) as usize] as char);
    }

    s
}

fn base64_value(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b'A' => Some(0))]
    #[test_case(b'Z' => Some(25))]
    #[test_case(b'a' => Some(26))]
    #[test_case(b'z' => Some(51))]
    #[test_case(b'0' => Some(52))]
    #[test_case(b'9' => Some(61))]
    #[test_case(b'-' => Some(62) ; "dash")]
    #[test_case(b'_' => Some(63) ; "underscore")]
    #[test_case(b'=' => None ; "equal")]
    #[test_case(b'#' => None ; "sharp")]
    fn base64_value_map(b: u8) -> Option<u8> {
        base64_value(b)
    }

    #[test_case("DBABM" => vec![12, 16, 1, 48] ; "simple header")]
    #[test_case("" => is empty ; "empty string")]
    fn test_decode(s: &str) -> Vec<u8> {
        decode(s).unwrap()
    }

    #[test_case("===" => matches DecodeError::InvalidCharacter(_) ; "equal signs")]
    #[test_case("   " => matches DecodeError::InvalidCharacter(_) ; "whitespaces")]
    fn error(s: &str) -> DecodeError {
        decode(s).unwrap_err()
    }

    #[test_case(&[] => "" ; "empty")]
    #[test_case(&[12, 16, 1, 48] => "DBABMA" ; "simple header")]
    #[test_case(&[0xff] => "_w" ; "single byte")]
    fn test_encode(bytes: &[u8]) -> String {
        encode(bytes)
    }

    #[test_case("DBAB")]
    #[test_case("CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA")]
    fn encode_is_inverse_of_decode(s: &str) {
        // holds whenever the string describes a whole number of bytes
        // (length divisible by 4), which is the case for strings produced
        // by `encode`
        assert_eq!(encode(&decode(s).unwrap()), s);
    }
}
