//! Version 1 of the IAB Global Privacy Platform string.
//!
//! A GPP string contains a header which lists the sections present in the
//! next parts, separated by `~` characters.
//!
//! A typical GPP string will look like this:
//!
//! ```text
//! DBACNY~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA~1YNN
//! ```
//!
//! It contains a header (`DBACNY`) and two sections.
//!
//! GPP string sections are usually encoded in a variation of URL-safe Base64.
//! It is not mandatory though, and certain sections, such as the deprecated
//! USP v1, are using a simpler character set.
//! In the example above, the first section is a base64 encoded TCF EU v2.2
//! section. The second section is a USP v1 section where `Y` and `N`
//! characters simply mean yes and no respectively.
//!
//! # Examples
//!
//! You can use the [`GPPModel::parse_str`] method to try to parse a consent
//! string:
//!
//! ```
//! use gpp_codec::v1::{GPPDecodeError, GPPModel};
//!
//! fn main() -> Result<(), GPPDecodeError> {
//!     let model = GPPModel::parse_str("DBABTA~1YNN")?;
//!     Ok(())
//! }
//! ```
//!
//! Since [`GPPModel`] implements the [`FromStr`] trait, you can also use
//! [`str::parse`]:
//!
//! ```
//! use gpp_codec::v1::{GPPDecodeError, GPPModel};
//!
//! fn main() -> Result<(), GPPDecodeError> {
//!     let model: GPPModel = "DBABTA~1YNN".parse()?;
//!     Ok(())
//! }
//! ```
//!
//! A model encodes back to a canonical GPP string:
//!
//! ```
//! use gpp_codec::v1::GPPModel;
//!
//! let model: GPPModel = "DBABTA~1YNN".parse().unwrap();
//! assert_eq!(model.encode().unwrap(), "DBABTA~1YNN");
//! ```
use crate::core::base64::{self, DecodeError};
use crate::core::{DataReader, DataWriter, EncodeError};
use crate::sections::{
    decode_section, encode_section, is_supported, DecodeOptions, Section, SectionDecodeError,
    SectionId,
};
use std::str::FromStr;
use thiserror::Error;

const GPP_HEADER: u8 = 3;
const GPP_VERSION: u8 = 1;

/// The error type for GPP string decoding operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GPPDecodeError {
    /// The string does not contain the mandatory header section.
    #[error("no header found")]
    NoHeaderFound,
    /// The header is not valid base64.
    #[error("unable to decode header")]
    DecodeHeader(#[from] DecodeError),
    /// The header bits could not be read, usually because the header is
    /// truncated.
    #[error("unable to read header")]
    ReadHeader(#[source] SectionDecodeError),
    /// The header has an invalid type for this version of GPP.
    #[error("invalid header type (expected {GPP_HEADER}, found {found})")]
    InvalidHeaderType { found: u8 },
    /// The header has an invalid GPP version.
    ///
    /// Note that there is currently only V1 of the standard.
    #[error("invalid GPP version (expected {GPP_VERSION}, found {found})")]
    InvalidGPPVersion { found: u8 },
    /// A section without a codec in this crate is listed in the string
    /// header, and strict section decoding was requested.
    #[error("unknown section id {0}")]
    UnknownSectionId(u16),
    /// The number of sections listed in the header does not match the number
    /// of actual sections present in the string.
    #[error("ids do not match sections (number of ids {ids}, number of sections {sections})")]
    IdSectionMismatch { ids: usize, sections: usize },
    /// A section failed to decode.
    #[error("unable to decode section with id {id}")]
    SectionDecode {
        id: u16,
        #[source]
        source: SectionDecodeError,
    },
}

/// The decoded representation of a GPP consent string.
///
/// Sections appear in the order declared by the header. Sections without a
/// codec in this crate are carried verbatim as [`Section::Unsupported`], so
/// the whole string still round-trips through [`encode`](GPPModel::encode).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GPPModel {
    section_ids: Vec<u16>,
    sections: Vec<Section>,
}

impl GPPModel {
    /// Parses a string with default (lenient) options.
    ///
    /// # Errors
    ///
    /// Returns a [`GPPDecodeError`] if unable to parse the string.
    ///
    /// # Example
    ///
    /// ```
    /// use gpp_codec::v1::GPPModel;
    ///
    /// let r = GPPModel::parse_str("DBABTA~1YNN");
    ///
    /// assert!(r.is_ok());
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, GPPDecodeError> {
        s.parse()
    }

    /// Parses a string with the given options.
    ///
    /// With [`DecodeOptions::strict_sections`], section IDs without a codec
    /// fail with [`GPPDecodeError::UnknownSectionId`] instead of being
    /// carried verbatim. With [`DecodeOptions::strict_padding`], non-zero
    /// padding bits in any segment are an error.
    pub fn parse_str_with(s: &str, options: DecodeOptions) -> Result<Self, GPPDecodeError> {
        let mut segments_iter = s.split('~');

        let header_str = segments_iter.next().ok_or(GPPDecodeError::NoHeaderFound)?;
        let header = base64::decode(header_str)?;
        let mut r = DataReader::new(&header);

        let header_type = r
            .read_fixed_integer::<u8>(6)
            .map_err(GPPDecodeError::ReadHeader)?;
        if header_type != GPP_HEADER {
            return Err(GPPDecodeError::InvalidHeaderType { found: header_type });
        }

        let gpp_version = r
            .read_fixed_integer::<u8>(6)
            .map_err(GPPDecodeError::ReadHeader)?;
        if gpp_version != GPP_VERSION {
            return Err(GPPDecodeError::InvalidGPPVersion { found: gpp_version });
        }

        let section_ids = r
            .read_fibonacci_range()
            .map_err(GPPDecodeError::ReadHeader)?;
        if options.strict_padding {
            r.verify_zero_padding().map_err(GPPDecodeError::ReadHeader)?;
        }

        let segments = segments_iter.collect::<Vec<_>>();
        if segments.len() != section_ids.len() {
            return Err(GPPDecodeError::IdSectionMismatch {
                ids: section_ids.len(),
                sections: segments.len(),
            });
        }

        let sections = section_ids
            .iter()
            .zip(segments)
            .map(|(&id, segment)| {
                if options.strict_sections && !is_supported(id) {
                    return Err(GPPDecodeError::UnknownSectionId(id));
                }
                decode_section(id, segment, options)
                    .map_err(|source| GPPDecodeError::SectionDecode { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            section_ids,
            sections,
        })
    }

    /// Builds a model from decoded sections.
    ///
    /// Sections are ordered by their section ID, as the GPP header requires
    /// a strictly increasing ID list.
    pub fn from_sections(mut sections: Vec<Section>) -> Self {
        sections.sort_by_key(Section::id);
        Self {
            section_ids: sections.iter().map(Section::id).collect(),
            sections,
        }
    }

    /// The section IDs declared by the header, in declaration order.
    pub fn section_ids(&self) -> &[u16] {
        &self.section_ids
    }

    /// The decoded sections, in header declaration order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the section with the given ID, if present.
    ///
    /// # Example
    ///
    /// ```
    /// use gpp_codec::sections::{Section, SectionId};
    /// use gpp_codec::v1::GPPModel;
    ///
    /// let model = GPPModel::parse_str("DBABTA~1YNN").unwrap();
    ///
    /// assert!(matches!(
    ///     model.section(SectionId::UspV1),
    ///     Some(Section::UspV1(_))
    /// ));
    /// assert!(model.section(SectionId::TcfEuV2).is_none());
    /// ```
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id as u16)
    }

    /// Encodes the model back to a GPP string.
    ///
    /// The output is canonical: padding bits are zero and the header is
    /// re-emitted from the section list. Re-encoding a decoded string is
    /// therefore not guaranteed to be byte-identical to the input, but it is
    /// guaranteed to decode to an equal model.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let mut w = DataWriter::new();
        w.write_fixed_integer(u64::from(GPP_HEADER), 6)?;
        w.write_fixed_integer(u64::from(GPP_VERSION), 6)?;
        w.write_fibonacci_range(&self.section_ids)?;

        let mut out = base64::encode(&w.into_bytes());
        for section in &self.sections {
            out.push('~');
            out.push_str(&encode_section(section)?);
        }

        Ok(out)
    }
}

impl FromStr for GPPModel {
    type Err = GPPDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str_with(s, DecodeOptions::default())
    }
}
