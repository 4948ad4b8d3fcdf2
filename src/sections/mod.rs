//! Traits, helpers, and type definitions for working with GPP sections.
//!
//! All section IDs assigned by the standard are listed in the [`SectionId`]
//! enum. Sections with a codec in this crate appear as dedicated variants of
//! the [`Section`] enum; every other section is carried verbatim as
//! [`Section::Unsupported`] so the surrounding GPP string still round-trips.
//!
//! Implementation of each section is done in its corresponding submodule.
//! Note that the GPP specification states that each section specification is
//! supposed to be independent. As a consequence, there is some duplication
//! between implementations of these sections.
use crate::core::{DataReader, FromDataReader};
use crate::sections::tcfcav1::TcfCaV1;
use crate::sections::tcfeuv2::TcfEuV2;
use crate::sections::usnat::UsNat;
use crate::sections::uspv1::UspV1;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::BTreeSet;
use std::io;
use std::str::FromStr;
use strum_macros::Display;
use thiserror::Error;

pub mod tcfcav1;
pub mod tcfeuv2;
pub mod us_common;
pub mod usnat;
pub mod uspv1;

pub use crate::core::base64::DecodeError;
pub use crate::core::{
    EncodeError, IdSet, OptimizedIntegerRange, RangeEncoding, RangeEntry, Timestamp,
};

/// Section IDs assigned by the GPP standard.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive)]
#[non_exhaustive]
pub enum SectionId {
    TcfEuV1 = 1,
    TcfEuV2 = 2,
    GppHeader = 3,
    GppSignalIntegrity = 4,
    TcfCaV1 = 5,
    UspV1 = 6,
    UsNat = 7,
    UsCa = 8,
    UsVa = 9,
    UsCo = 10,
    UsUt = 11,
    UsCt = 12,
    UsFl = 13,
    UsMt = 14,
    UsOr = 15,
    UsTx = 16,
    UsDe = 17,
    UsIa = 18,
    UsNe = 19,
    UsNh = 20,
    UsNj = 21,
    UsTn = 22,
}

/// Options controlling how lenient decoding is.
///
/// The default is lenient on both axes: sections without a codec in this
/// crate are carried verbatim, and non-zero padding bits are ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DecodeOptions {
    /// Fail on section IDs without a codec instead of carrying them raw.
    pub strict_sections: bool,
    /// Fail when the trailing padding bits of a segment are not all zero.
    pub strict_padding: bool,
}

/// A section type that can be decoded from its raw section string.
pub trait DecodableSection: FromStr<Err = SectionDecodeError> {
    const ID: SectionId;

    fn decode_with(s: &str, options: DecodeOptions) -> Result<Self, SectionDecodeError>;
}

/// A section type that can be encoded back to its raw section string.
pub trait EncodableSection {
    fn encode(&self) -> Result<String, EncodeError>;
}

/// The error type for section decoding operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SectionDecodeError {
    #[error("input ends before the end of the section")]
    TruncatedInput,
    #[error("unexpected end of string in {0}")]
    UnexpectedEndOfString(String),
    #[error("invalid character {character:?} in {kind} string {s:?}")]
    InvalidCharacter {
        character: char,
        kind: &'static str,
        s: String,
    },
    #[error("invalid section version (expected {expected}, found {found})")]
    InvalidSectionVersion { expected: u8, found: u8 },
    #[error("unable to decode segment")]
    DecodeSegment(#[from] DecodeError),
    #[error("unknown segment type {segment_type}")]
    UnknownSegmentType { segment_type: u8 },
    #[error("duplicate segment type {segment_type}")]
    DuplicateSegmentType { segment_type: u8 },
    #[error("invalid range entry, start {start} end {end}")]
    InvalidRangeEntry { start: u16, end: u16 },
    #[error("invalid field value (expected {expected}, found {found})")]
    InvalidFieldValue { expected: String, found: String },
    #[error("non-zero padding bits at the end of a segment")]
    NonZeroPadding,
    #[error("unable to read string")]
    Read(#[source] io::Error),
}

impl From<io::Error> for SectionDecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::TruncatedInput
        } else {
            Self::Read(e)
        }
    }
}

/// A decoded GPP section.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub enum Section {
    TcfEuV2(TcfEuV2),
    TcfCaV1(TcfCaV1),
    UspV1(UspV1),
    UsNat(UsNat),
    /// A section without a codec in this crate, carried verbatim.
    Unsupported { id: u16, data: String },
}

impl Section {
    pub fn id(&self) -> u16 {
        match self {
            Section::TcfEuV2(_) => SectionId::TcfEuV2 as u16,
            Section::TcfCaV1(_) => SectionId::TcfCaV1 as u16,
            Section::UspV1(_) => SectionId::UspV1 as u16,
            Section::UsNat(_) => SectionId::UsNat as u16,
            Section::Unsupported { id, .. } => *id,
        }
    }
}

pub(crate) fn is_supported(id: u16) -> bool {
    matches!(
        SectionId::from_u16(id),
        Some(SectionId::TcfEuV2 | SectionId::TcfCaV1 | SectionId::UspV1 | SectionId::UsNat)
    )
}

pub(crate) fn decode_section(
    id: u16,
    s: &str,
    options: DecodeOptions,
) -> Result<Section, SectionDecodeError> {
    Ok(match SectionId::from_u16(id) {
        Some(SectionId::TcfEuV2) => Section::TcfEuV2(TcfEuV2::decode_with(s, options)?),
        Some(SectionId::TcfCaV1) => Section::TcfCaV1(TcfCaV1::decode_with(s, options)?),
        Some(SectionId::UspV1) => Section::UspV1(UspV1::decode_with(s, options)?),
        Some(SectionId::UsNat) => Section::UsNat(UsNat::decode_with(s, options)?),
        _ => Section::Unsupported {
            id,
            data: s.to_string(),
        },
    })
}

pub(crate) fn encode_section(section: &Section) -> Result<String, EncodeError> {
    match section {
        Section::TcfEuV2(s) => s.encode(),
        Section::TcfCaV1(s) => s.encode(),
        Section::UspV1(s) => s.encode(),
        Section::UsNat(s) => s.encode(),
        Section::Unsupported { data, .. } => Ok(data.clone()),
    }
}

/// An operation to parse a Base64-URL encoded string using '.' as separators
/// into a type composed of a mandatory core segment and an arbitrary number
/// of optional segments.
///
/// This guarantees a given segment cannot appear twice.
pub(crate) trait SegmentedStr<T> {
    fn parse_segmented_str(&self, options: DecodeOptions) -> Result<T, SectionDecodeError>;
}

impl<T> SegmentedStr<T> for str
where
    T: OptionalSegmentParser,
{
    fn parse_segmented_str(&self, options: DecodeOptions) -> Result<T, SectionDecodeError> {
        let mut segments_iter = self.split('.');

        // first mandatory segment is the core segment
        let core = crate::core::base64::decode(
            segments_iter
                .next()
                .ok_or_else(|| SectionDecodeError::UnexpectedEndOfString(self.to_string()))?,
        )?;
        let mut r = DataReader::new(&core);
        let mut output = r.parse()?;
        if options.strict_padding {
            r.verify_zero_padding()?;
        }

        // parse each optional segment and fill the output
        let mut segments = BTreeSet::new();
        for s in segments_iter {
            let b = crate::core::base64::decode(s)?;
            let mut r = DataReader::new(&b);

            let segment_type = T::read_segment_type(&mut r)?;
            if !segments.insert(segment_type) {
                return Err(SectionDecodeError::DuplicateSegmentType { segment_type });
            }

            T::parse_optional_segment(segment_type, &mut r, &mut output)?;
            if options.strict_padding {
                r.verify_zero_padding()?;
            }
        }

        Ok(output)
    }
}

/// An operation to parse optional segments of a section.
pub(crate) trait OptionalSegmentParser:
    Sized + FromDataReader<Err = SectionDecodeError>
{
    fn read_segment_type(r: &mut DataReader) -> Result<u8, SectionDecodeError> {
        r.read_fixed_integer(3)
    }

    fn parse_optional_segment(
        segment_type: u8,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), SectionDecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(2 => true)]
    #[test_case(5 => true)]
    #[test_case(6 => true)]
    #[test_case(7 => true)]
    #[test_case(12 => false ; "us ct has no codec")]
    #[test_case(42 => false ; "unassigned id")]
    fn supported(id: u16) -> bool {
        is_supported(id)
    }

    #[test]
    fn unsupported_section_is_carried_verbatim() {
        let section = decode_section(12, "BAAAAABA", DecodeOptions::default()).unwrap();
        assert_eq!(
            section,
            Section::Unsupported {
                id: 12,
                data: "BAAAAABA".to_string(),
            }
        );
        assert_eq!(section.id(), 12);
        assert_eq!(encode_section(&section).unwrap(), "BAAAAABA");
    }

    #[test]
    fn section_id_display() {
        assert_eq!(SectionId::TcfEuV2.to_string(), "TcfEuV2");
        assert_eq!(SectionId::UsNat.to_string(), "UsNat");
    }
}
