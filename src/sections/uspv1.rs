//! The deprecated USP v1 section.
//!
//! Unlike other sections, this one is not base64 encoded: it is made of four
//! literal characters, a version digit followed by three yes/no/not-applicable
//! flags.
use crate::core::EncodeError;
use crate::sections::{
    DecodableSection, DecodeOptions, EncodableSection, SectionDecodeError, SectionId,
};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::{Chars, FromStr};

const USP_V1_VERSION: u8 = 1;
const KIND: &str = "uspv1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Flag {
    Yes,
    No,
    NotApplicable,
}

impl Flag {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'Y' => Some(Self::Yes),
            'N' => Some(Self::No),
            '-' => Some(Self::NotApplicable),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Yes => 'Y',
            Self::No => 'N',
            Self::NotApplicable => '-',
        }
    }
}

// See https://github.com/InteractiveAdvertisingBureau/USPrivacy/blob/master/CCPA/US%20Privacy%20String.md#us-privacy-string-format
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct UspV1 {
    pub opt_out_notice: Flag,
    pub opt_out_sale: Flag,
    pub lspa_covered_transaction: Flag,
}

impl DecodableSection for UspV1 {
    const ID: SectionId = SectionId::UspV1;

    fn decode_with(s: &str, _options: DecodeOptions) -> Result<Self, SectionDecodeError> {
        let mut chars = s.chars();

        let version = chars
            .next()
            .ok_or(SectionDecodeError::UnexpectedEndOfString(s.to_string()))?;
        let version = version
            .to_digit(10)
            .ok_or(SectionDecodeError::InvalidCharacter {
                character: version,
                kind: KIND,
                s: s.to_string(),
            })? as u8;
        if version != USP_V1_VERSION {
            return Err(SectionDecodeError::InvalidSectionVersion {
                expected: USP_V1_VERSION,
                found: version,
            });
        }

        let opt_out_notice = parse_next_flag_char(&mut chars, s)?;
        let opt_out_sale = parse_next_flag_char(&mut chars, s)?;
        let lspa_covered_transaction = parse_next_flag_char(&mut chars, s)?;

        Ok(Self {
            opt_out_notice,
            opt_out_sale,
            lspa_covered_transaction,
        })
    }
}

impl FromStr for UspV1 {
    type Err = SectionDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_with(s, DecodeOptions::default())
    }
}

impl EncodableSection for UspV1 {
    fn encode(&self) -> Result<String, EncodeError> {
        Ok([
            char::from_digit(u32::from(USP_V1_VERSION), 10).unwrap_or('1'),
            self.opt_out_notice.as_char(),
            self.opt_out_sale.as_char(),
            self.lspa_covered_transaction.as_char(),
        ]
        .iter()
        .collect())
    }
}

fn parse_next_flag_char(
    chars: &mut Chars,
    original_str: &str,
) -> Result<Flag, SectionDecodeError> {
    let flag = chars
        .next()
        .ok_or(SectionDecodeError::UnexpectedEndOfString(
            original_str.to_string(),
        ))?;

    Flag::from_char(flag).ok_or(SectionDecodeError::InvalidCharacter {
        character: flag,
        kind: KIND,
        s: original_str.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1YN-" => UspV1 {
        opt_out_notice: Flag::Yes,
        opt_out_sale: Flag::No,
        lspa_covered_transaction: Flag::NotApplicable,
    } ; "mix")]
    #[test_case("1NNN" => UspV1 {
        opt_out_notice: Flag::No,
        opt_out_sale: Flag::No,
        lspa_covered_transaction: Flag::No,
    } ; "all no")]
    #[test_case("1YYY" => UspV1 {
        opt_out_notice: Flag::Yes,
        opt_out_sale: Flag::Yes,
        lspa_covered_transaction: Flag::Yes,
    } ; "all yes")]
    fn parse(s: &str) -> UspV1 {
        UspV1::from_str(s).unwrap()
    }

    #[test_case("ZYN-" => matches SectionDecodeError::InvalidCharacter { character: 'Z', .. } ; "invalid version character")]
    #[test_case("2YN-" => matches SectionDecodeError::InvalidSectionVersion {
        expected: USP_V1_VERSION,
        found: 2
    } ; "invalid version number")]
    #[test_case("" => matches SectionDecodeError::UnexpectedEndOfString(_) ; "empty string")]
    #[test_case("1" => matches SectionDecodeError::UnexpectedEndOfString(_) ; "header only")]
    #[test_case("1N" => matches SectionDecodeError::UnexpectedEndOfString(_) ; "missing characters")]
    #[test_case("1A" => matches SectionDecodeError::InvalidCharacter { character: 'A', .. } ; "invalid flag character")]
    fn error(s: &str) -> SectionDecodeError {
        UspV1::from_str(s).unwrap_err()
    }

    #[test_case("1YN-")]
    #[test_case("1NNN")]
    #[test_case("1YYY")]
    #[test_case("1---")]
    fn encode_reproduces_input(s: &str) {
        assert_eq!(UspV1::from_str(s).unwrap().encode().unwrap(), s);
    }
}
