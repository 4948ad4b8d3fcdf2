use crate::core::{
    base64, DataReader, DataWriter, EncodeError, FromDataReader, OptimizedIntegerRange, Range,
    Timestamp, ToDataWriter,
};
use crate::sections::{
    DecodableSection, DecodeOptions, EncodableSection, IdSet, OptionalSegmentParser,
    SectionDecodeError, SectionId, SegmentedStr,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;

const TCF_CA_V1_VERSION: u8 = 1;
const DISCLOSED_VENDORS_SEGMENT_TYPE: u8 = 1;
const PUBLISHER_PURPOSES_SEGMENT_TYPE: u8 = 3;

/// The TCF Canada v1 section, composed of a mandatory core segment and up to
/// two optional segments.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct TcfCaV1 {
    pub core: Core,
    pub disclosed_vendors: Option<OptimizedIntegerRange>,
    pub publisher_purposes: Option<PublisherPurposes>,
}

impl DecodableSection for TcfCaV1 {
    const ID: SectionId = SectionId::TcfCaV1;

    fn decode_with(s: &str, options: DecodeOptions) -> Result<Self, SectionDecodeError> {
        s.parse_segmented_str(options)
    }
}

impl FromStr for TcfCaV1 {
    type Err = SectionDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_with(s, DecodeOptions::default())
    }
}

impl FromDataReader for TcfCaV1 {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            core: r.parse()?,
            disclosed_vendors: None,
            publisher_purposes: None,
        })
    }
}

impl OptionalSegmentParser for TcfCaV1 {
    fn parse_optional_segment(
        segment_type: u8,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), SectionDecodeError> {
        match segment_type {
            DISCLOSED_VENDORS_SEGMENT_TYPE => {
                into.disclosed_vendors = Some(r.read_optimized_integer_range()?);
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

impl EncodableSection for TcfCaV1 {
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

        if let Some(publisher_purposes) = &self.publisher_purposes {
            let mut w = DataWriter::new();
            w.write_fixed_integer(u64::from(PUBLISHER_PURPOSES_SEGMENT_TYPE), 3)?;
            w.write(publisher_purposes)?;
            segments.push(base64::encode(&w.into_bytes()));
        }

        Ok(segments.join("."))
    }
}

/// The mandatory core segment of a TCF Canada v1 section.
///
/// Publisher restrictions were introduced in TCF CA v1.1; strings written
/// against v1.0 end right after the vendor consents, which is why the field
/// is optional. `None` means the field was absent from the wire, and
/// re-encoding omits it again.
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
    pub use_non_standard_stacks: bool,
    pub special_feature_express_consents: IdSet,
    pub purpose_express_consents: IdSet,
    pub purpose_implied_consents: IdSet,
    pub vendor_express_consents: OptimizedIntegerRange,
    pub vendor_implied_consents: OptimizedIntegerRange,
    pub publisher_restrictions: Option<Vec<PublisherRestriction>>,
}

impl FromDataReader for Core {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let version = r.read_fixed_integer(6)?;
        if version != TCF_CA_V1_VERSION {
            return Err(SectionDecodeError::InvalidSectionVersion {
                expected: TCF_CA_V1_VERSION,
                found: version,
            });
        }

        let created = r.read_datetime()?;
        let last_updated = r.read_datetime()?;
        let cmp_id = r.read_fixed_integer(12)?;
        let cmp_version = r.read_fixed_integer(12)?;
        let consent_screen = r.read_fixed_integer(6)?;
        let consent_language = r.read_string(2)?;
        let vendor_list_version = r.read_fixed_integer(12)?;
        let policy_version = r.read_fixed_integer(6)?;
        let use_non_standard_stacks = r.read_bool()?;
        let special_feature_express_consents = r.read_fixed_bitfield(12)?;
        let purpose_express_consents = r.read_fixed_bitfield(24)?;
        let purpose_implied_consents = r.read_fixed_bitfield(24)?;
        let vendor_express_consents = r.read_optimized_integer_range()?;
        let vendor_implied_consents = r.read_optimized_integer_range()?;

        // v1.0 strings end here; anything shorter than a restriction count
        // is padding
        let publisher_restrictions = if r.remaining_bits() >= 12 {
            Some(
                r.read_array_of_ranges()?
                    .into_iter()
                    .map(PublisherRestriction::from)
                    .collect(),
            )
        } else {
            None
        };

        Ok(Self {
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            vendor_list_version,
            policy_version,
            use_non_standard_stacks,
            special_feature_express_consents,
            purpose_express_consents,
            purpose_implied_consents,
            vendor_express_consents,
            vendor_implied_consents,
            publisher_restrictions,
        })
    }
}

impl ToDataWriter for Core {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(u64::from(TCF_CA_V1_VERSION), 6)?;
        w.write_datetime(self.created)?;
        w.write_datetime(self.last_updated)?;
        w.write_fixed_integer(u64::from(self.cmp_id), 12)?;
        w.write_fixed_integer(u64::from(self.cmp_version), 12)?;
        w.write_fixed_integer(u64::from(self.consent_screen), 6)?;
        w.write_string(&self.consent_language, 2)?;
        w.write_fixed_integer(u64::from(self.vendor_list_version), 12)?;
        w.write_fixed_integer(u64::from(self.policy_version), 6)?;
        w.write_bool(self.use_non_standard_stacks)?;
        w.write_fixed_bitfield(&self.special_feature_express_consents, 12)?;
        w.write_fixed_bitfield(&self.purpose_express_consents, 24)?;
        w.write_fixed_bitfield(&self.purpose_implied_consents, 24)?;
        w.write_optimized_integer_range(&self.vendor_express_consents)?;
        w.write_optimized_integer_range(&self.vendor_implied_consents)?;

        if let Some(publisher_restrictions) = &self.publisher_restrictions {
            let restrictions = publisher_restrictions
                .iter()
                .map(Range::from)
                .collect::<Vec<_>>();
            w.write_array_of_ranges(&restrictions)?;
        }

        Ok(())
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
    RequireExpressConsent = 1,
    RequireImpliedConsent = 2,
    Undefined = 3,
}

/// The optional publisher purposes segment.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct PublisherPurposes {
    pub purpose_express_consents: IdSet,
    pub purpose_implied_consents: IdSet,
    pub custom_purposes_count: u8,
    pub custom_purpose_express_consents: IdSet,
    pub custom_purpose_implied_consents: IdSet,
}

impl FromDataReader for PublisherPurposes {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let purpose_express_consents = r.read_fixed_bitfield(24)?;
        let purpose_implied_consents = r.read_fixed_bitfield(24)?;
        let custom_purposes_count = r.read_fixed_integer::<u8>(6)?;
        let custom_purpose_express_consents =
            r.read_fixed_bitfield(custom_purposes_count as usize)?;
        let custom_purpose_implied_consents =
            r.read_fixed_bitfield(custom_purposes_count as usize)?;

        Ok(Self {
            purpose_express_consents,
            purpose_implied_consents,
            custom_purposes_count,
            custom_purpose_express_consents,
            custom_purpose_implied_consents,
        })
    }
}

impl ToDataWriter for PublisherPurposes {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_bitfield(&self.purpose_express_consents, 24)?;
        w.write_fixed_bitfield(&self.purpose_implied_consents, 24)?;
        w.write_fixed_integer(u64::from(self.custom_purposes_count), 6)?;
        w.write_fixed_bitfield(
            &self.custom_purpose_express_consents,
            self.custom_purposes_count as usize,
        )?;
        w.write_fixed_bitfield(
            &self.custom_purpose_implied_consents,
            self.custom_purposes_count as usize,
        )
    }
}
