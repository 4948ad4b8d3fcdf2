use crate::core::{
    base64, DataReader, DataWriter, EncodeError, FromDataReader, OptimizedIntegerRange, Range,
    Timestamp, ToDataWriter,
};
use crate::sections::{
    DecodableSection, DecodeOptions, EncodableSection, IdSet, OptionalSegmentParser, SectionDecodeError,
    SectionId, SegmentedStr,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;

const TCF_EU_V2_VERSION: u8 = 2;
const DISCLOSED_VENDORS_SEGMENT_TYPE: u8 = 1;
const ALLOWED_VENDORS_SEGMENT_TYPE: u8 = 2;
const PUBLISHER_PURPOSES_SEGMENT_TYPE: u8 = 3;

/// The TCF EU v2 section, composed of a mandatory core segment and up to
/// three optional segments.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct TcfEuV2 {
    pub core: Core,
    pub disclosed_vendors: Option<OptimizedIntegerRange>,
    pub allowed_vendors: Option<OptimizedIntegerRange>,
    pub publisher_purposes: Option<PublisherPurposes>,
}

impl DecodableSection for TcfEuV2 {
    const ID: SectionId = SectionId::TcfEuV2;

    fn decode_with(s: &str, options: DecodeOptions) -> Result<Self, SectionDecodeError> {
        s.parse_segmented_str(options)
    }
}

impl FromStr for TcfEuV2 {
    type Err = SectionDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_with(s, DecodeOptions::default())
    }
}

impl FromDataReader for TcfEuV2 {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            core: r.parse()?,
            disclosed_vendors: None,
            allowed_vendors: None,
            publisher_purposes: None,
        })
    }
}

impl OptionalSegmentParser for TcfEuV2 {
    fn parse_optional_segment(
        segment_type: u8,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), SectionDecodeError> {
        match segment_type {
            DISCLOSED_VENDORS_SEGMENT_TYPE => {
                into.disclosed_vendors = Some(r.read_optimized_integer_range()?);
            }
            ALLOWED_VENDORS_SEGMENT_TYPE => {
                into.allowed_vendors = Some(r.read_optimized_integer_range()?);
            }
            PUBLISHER_PURPOSES_SEGMENT_TYPE => {
                into.publisher_purposes = Some(r.parse()?);
            }
            n => {
                return Err(SectionDecodeError::UnknownSegmentType { segment_type: n });
            }
        }
        Ok(())
    }
}

impl EncodableSection for TcfEuV2 {
    fn encode(&self) -> Result<String, EncodeError> {
        let mut segments = vec![];

        let mut w = DataWriter::new();
        w.write(&self.core)?;
        segments.push(base64::encode(&w.into_bytes()));

        if let Some(disclosed_vendors) = &self.disclosed_vendors {
            let mut w = DataWriter::new();
            w.write_fixed_integer(u64::from(DISCLOSED_VENDORS_SEGMENT_TYPE), 3)?;
            w.write_optimized_integer_range(disclosed_vendors)?;
            segments.push(base64::encode(&w.into_bytes()));
        }

        if let Some(allowed_vendors) = &self.allowed_vendors {
            let mut w = DataWriter::new();
            w.write_fixed_integer(u64::from(ALLOWED_VENDORS_SEGMENT_TYPE), 3)?;
            w.write_optimized_integer_range(allowed_vendors)?;
            segments.push(base64::encode(&w.into_bytes()));
        }

        if let Some(publisher_purposes) = &self.publisher_purposes {
            let mut w = DataWriter::new();
            w.write_fixed_integer(u64::from(PUBLISHER_PURPOSES_SEGMENT_TYPE), 3)?;
            w.write(publisher_purposes)?;
            segments.push(base64::encode(&w.into_bytes()));
        }

        Ok(segments.join("."))
    }
}

/// The mandatory core segment of a TCF EU v2 section.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct Core {
    pub created: Timestamp,
    pub last_updated: Timestamp,
    pub cmp_id: u16,
    pub cmp_version: u16,
    pub consent_screen: u8,
    pub consent_language: String,
    pub vendor_list_version: u16,
    pub policy_version: u8,
    pub is_service_specific: bool,
    pub use_non_standard_stacks: bool,
    pub special_feature_optins: IdSet,
    pub purpose_consents: IdSet,
    pub purpose_legitimate_interests: IdSet,
    pub purpose_one_treatment: bool,
    pub publisher_country_code: String,
    pub vendor_consents: OptimizedIntegerRange,
    pub vendor_legitimate_interests: OptimizedIntegerRange,
    pub publisher_restrictions: Vec<PublisherRestriction>,
}

impl FromDataReader for Core {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let version = r.read_fixed_integer(6)?;
        if version != TCF_EU_V2_VERSION {
            return Err(SectionDecodeError::InvalidSectionVersion {
                expected: TCF_EU_V2_VERSION,
                found: version,
            });
        }

        Ok(Self {
            created: r.read_datetime()?,
            last_updated: r.read_datetime()?,
            cmp_id: r.read_fixed_integer(12)?,
            cmp_version: r.read_fixed_integer(12)?,
            consent_screen: r.read_fixed_integer(6)?,
            consent_language: r.read_string(2)?,
            vendor_list_version: r.read_fixed_integer(12)?,
            policy_version: r.read_fixed_integer(6)?,
            is_service_specific: r.read_bool()?,
            use_non_standard_stacks: r.read_bool()?,
            special_feature_optins: r.read_fixed_bitfield(12)?,
            purpose_consents: r.read_fixed_bitfield(24)?,
            purpose_legitimate_interests: r.read_fixed_bitfield(24)?,
            purpose_one_treatment: r.read_bool()?,
            publisher_country_code: r.read_string(2)?,
            vendor_consents: r.read_optimized_integer_range()?,
            vendor_legitimate_interests: r.read_optimized_integer_range()?,
            publisher_restrictions: r
                .read_array_of_ranges()?
                .into_iter()
                .map(PublisherRestriction::from)
                .collect(),
        })
    }
}

impl ToDataWriter for Core {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(u64::from(TCF_EU_V2_VERSION), 6)?;
        w.write_datetime(self.created)?;
        w.write_datetime(self.last_updated)?;
        w.write_fixed_integer(u64::from(self.cmp_id), 12)?;
        w.write_fixed_integer(u64::from(self.cmp_version), 12)?;
        w.write_fixed_integer(u64::from(self.consent_screen), 6)?;
        w.write_string(&self.consent_language, 2)?;
        w.write_fixed_integer(u64::from(self.vendor_list_version), 12)?;
        w.write_fixed_integer(u64::from(self.policy_version), 6)?;
        w.write_bool(self.is_service_specific)?;
        w.write_bool(self.use_non_standard_stacks)?;
        w.write_fixed_bitfield(&self.special_feature_optins, 12)?;
        w.write_fixed_bitfield(&self.purpose_consents, 24)?;
        w.write_fixed_bitfield(&self.purpose_legitimate_interests, 24)?;
        w.write_bool(self.purpose_one_treatment)?;
        w.write_string(&self.publisher_country_code, 2)?;
        w.write_optimized_integer_range(&self.vendor_consents)?;
        w.write_optimized_integer_range(&self.vendor_legitimate_interests)?;

        let restrictions = self
            .publisher_restrictions
            .iter()
            .map(Range::from)
            .collect::<Vec<_>>();
        w.write_array_of_ranges(&restrictions)
    }
}

/// A restriction a publisher places on a purpose for a set of vendors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PublisherRestriction {
    pub purpose_id: u8,
    pub restriction_type: RestrictionType,
    pub restricted_vendor_ids: OptimizedIntegerRange,
}

impl From<Range> for PublisherRestriction {
    fn from(r: Range) -> Self {
        Self {
            purpose_id: r.key,
            restriction_type: RestrictionType::from_u8(r.range_type)
                .unwrap_or(RestrictionType::Undefined),
            restricted_vendor_ids: r.ids,
        }
    }
}

impl From<&PublisherRestriction> for Range {
    fn from(r: &PublisherRestriction) -> Self {
        Self {
            key: r.purpose_id,
            range_type: r.restriction_type as u8,
            ids: r.restricted_vendor_ids.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RestrictionType {
    NotAllowed = 0,
    RequireConsent = 1,
    RequireLegitimateInterest = 2,
    Undefined = 3,
}

/// The optional publisher purposes segment.
///
/// The number of custom purposes is kept in the model because it determines
/// the width of the two custom bitfields on re-encode.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct PublisherPurposes {
    pub consents: IdSet,
    pub legitimate_interests: IdSet,
    pub custom_purposes_count: u8,
    pub custom_consents: IdSet,
    pub custom_legitimate_interests: IdSet,
}

impl FromDataReader for PublisherPurposes {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let consents = r.read_fixed_bitfield(24)?;
        let legitimate_interests = r.read_fixed_bitfield(24)?;
        let custom_purposes_count = r.read_fixed_integer::<u8>(6)?;
        let custom_consents = r.read_fixed_bitfield(custom_purposes_count as usize)?;
        let custom_legitimate_interests = r.read_fixed_bitfield(custom_purposes_count as usize)?;

        Ok(Self {
            consents,
            legitimate_interests,
            custom_purposes_count,
            custom_consents,
            custom_legitimate_interests,
        })
    }
}

impl ToDataWriter for PublisherPurposes {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_bitfield(&self.consents, 24)?;
        w.write_fixed_bitfield(&self.legitimate_interests, 24)?;
        w.write_fixed_integer(u64::from(self.custom_purposes_count), 6)?;
        w.write_fixed_bitfield(&self.custom_consents, self.custom_purposes_count as usize)?;
        w.write_fixed_bitfield(
            &self.custom_legitimate_interests,
            self.custom_purposes_count as usize,
        )
    }
}
