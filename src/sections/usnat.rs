use crate::core::{base64, DataReader, DataWriter, EncodeError, FromDataReader, ToDataWriter};
use crate::sections::us_common::{
    parse_mspa_covered_transaction, write_mspa_covered_transaction, Consent, MspaMode, Notice,
    OptOut,
};
use crate::sections::{
    DecodableSection, DecodeOptions, EncodableSection, OptionalSegmentParser, SectionDecodeError,
    SectionId, SegmentedStr,
};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;

const US_NAT_VERSION: u8 = 1;
const US_NAT_GPC_SEGMENT_TYPE: u8 = 1;

/// The US national privacy section, composed of a mandatory core segment
/// and an optional GPC segment.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct UsNat {
    pub core: Core,
    pub gpc: Option<bool>,
}

impl DecodableSection for UsNat {
    const ID: SectionId = SectionId::UsNat;

    fn decode_with(s: &str, options: DecodeOptions) -> Result<Self, SectionDecodeError> {
        s.parse_segmented_str(options)
    }
}

impl FromStr for UsNat {
    type Err = SectionDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_with(s, DecodeOptions::default())
    }
}

impl FromDataReader for UsNat {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            core: r.parse()?,
            gpc: None,
        })
    }
}

impl OptionalSegmentParser for UsNat {
    // US sections use a 2-bit segment type, unlike TCF's 3 bits
    fn read_segment_type(r: &mut DataReader) -> Result<u8, SectionDecodeError> {
        r.read_fixed_integer(2)
    }

    fn parse_optional_segment(
        segment_type: u8,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), SectionDecodeError> {
        match segment_type {
            US_NAT_GPC_SEGMENT_TYPE => {
                into.gpc = Some(r.read_bool()?);
            }
            n => {
                return Err(SectionDecodeError::UnknownSegmentType { segment_type: n });
            }
        }
        Ok(())
    }
}

impl EncodableSection for UsNat {
    fn encode(&self) -> Result<String, EncodeError> {
        let mut w = DataWriter::new();
        w.write(&self.core)?;
        let mut out = base64::encode(&w.into_bytes());

        if let Some(gpc) = self.gpc {
            let mut w = DataWriter::new();
            w.write_fixed_integer(u64::from(US_NAT_GPC_SEGMENT_TYPE), 2)?;
            w.write_bool(gpc)?;
            out.push('.');
            out.push_str(&base64::encode(&w.into_bytes()));
        }

        Ok(out)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct Core {
    pub sharing_notice: Notice,
    pub sale_opt_out_notice: Notice,
    pub sharing_opt_out_notice: Notice,
    pub targeted_advertising_opt_out_notice: Notice,
    pub sensitive_data_processing_opt_out_notice: Notice,
    pub sensitive_data_limit_use_notice: Notice,
    pub sale_opt_out: OptOut,
    pub sharing_opt_out: OptOut,
    pub targeted_advertising_opt_out: OptOut,
    pub sensitive_data_processing: SensitiveDataProcessing,
    pub known_child_sensitive_data_consents: KnownChildSensitiveDataConsents,
    pub personal_data_consent: Consent,
    pub mspa_covered_transaction: bool,
    pub mspa_opt_out_option_mode: MspaMode,
    pub mspa_service_provider_mode: MspaMode,
}

impl FromDataReader for Core {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let version = r.read_fixed_integer(6)?;
        if version != US_NAT_VERSION {
            return Err(SectionDecodeError::InvalidSectionVersion {
                expected: US_NAT_VERSION,
                found: version,
            });
        }

        Ok(Self {
            sharing_notice: r.parse()?,
            sale_opt_out_notice: r.parse()?,
            sharing_opt_out_notice: r.parse()?,
            targeted_advertising_opt_out_notice: r.parse()?,
            sensitive_data_processing_opt_out_notice: r.parse()?,
            sensitive_data_limit_use_notice: r.parse()?,
            sale_opt_out: r.parse()?,
            sharing_opt_out: r.parse()?,
            targeted_advertising_opt_out: r.parse()?,
            sensitive_data_processing: r.parse()?,
            known_child_sensitive_data_consents: r.parse()?,
            personal_data_consent: r.parse()?,
            mspa_covered_transaction: parse_mspa_covered_transaction(r)?,
            mspa_opt_out_option_mode: r.parse()?,
            mspa_service_provider_mode: r.parse()?,
        })
    }
}

impl ToDataWriter for Core {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(u64::from(US_NAT_VERSION), 6)?;
        w.write(&self.sharing_notice)?;
        w.write(&self.sale_opt_out_notice)?;
        w.write(&self.sharing_opt_out_notice)?;
        w.write(&self.targeted_advertising_opt_out_notice)?;
        w.write(&self.sensitive_data_processing_opt_out_notice)?;
        w.write(&self.sensitive_data_limit_use_notice)?;
        w.write(&self.sale_opt_out)?;
        w.write(&self.sharing_opt_out)?;
        w.write(&self.targeted_advertising_opt_out)?;
        w.write(&self.sensitive_data_processing)?;
        w.write(&self.known_child_sensitive_data_consents)?;
        w.write(&self.personal_data_consent)?;
        write_mspa_covered_transaction(w, self.mspa_covered_transaction)?;
        w.write(&self.mspa_opt_out_option_mode)?;
        w.write(&self.mspa_service_provider_mode)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct SensitiveDataProcessing {
    pub racial_or_ethnic_origin: Consent,
    pub religious_or_philosophical_beliefs: Consent,
    pub health_data: Consent,
    pub sex_life_or_sexual_orientation: Consent,
    pub citizenship_or_immigration_status: Consent,
    pub genetic_unique_identification: Consent,
    pub biometric_unique_identification: Consent,
    pub precise_geolocation_data: Consent,
    pub identification_documents: Consent,
    pub financial_data: Consent,
    pub union_membership: Consent,
    pub mail_email_or_text_messages: Consent,
}

impl FromDataReader for SensitiveDataProcessing {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            racial_or_ethnic_origin: r.parse()?,
            religious_or_philosophical_beliefs: r.parse()?,
            health_data: r.parse()?,
            sex_life_or_sexual_orientation: r.parse()?,
            citizenship_or_immigration_status: r.parse()?,
            genetic_unique_identification: r.parse()?,
            biometric_unique_identification: r.parse()?,
            precise_geolocation_data: r.parse()?,
            identification_documents: r.parse()?,
            financial_data: r.parse()?,
            union_membership: r.parse()?,
            mail_email_or_text_messages: r.parse()?,
        })
    }
}

impl ToDataWriter for SensitiveDataProcessing {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write(&self.racial_or_ethnic_origin)?;
        w.write(&self.religious_or_philosophical_beliefs)?;
        w.write(&self.health_data)?;
        w.write(&self.sex_life_or_sexual_orientation)?;
        w.write(&self.citizenship_or_immigration_status)?;
        w.write(&self.genetic_unique_identification)?;
        w.write(&self.biometric_unique_identification)?;
        w.write(&self.precise_geolocation_data)?;
        w.write(&self.identification_documents)?;
        w.write(&self.financial_data)?;
        w.write(&self.union_membership)?;
        w.write(&self.mail_email_or_text_messages)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct KnownChildSensitiveDataConsents {
    pub from_13_to_16: Consent,
    pub under_13: Consent,
}

impl FromDataReader for KnownChildSensitiveDataConsents {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            from_13_to_16: r.parse()?,
            under_13: r.parse()?,
        })
    }
}

impl ToDataWriter for KnownChildSensitiveDataConsents {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write(&self.from_13_to_16)?;
        w.write(&self.under_13)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn all_not_applicable() -> UsNat {
        UsNat {
            core: Core {
                sharing_notice: Notice::NotApplicable,
                sale_opt_out_notice: Notice::NotApplicable,
                sharing_opt_out_notice: Notice::NotApplicable,
                targeted_advertising_opt_out_notice: Notice::NotApplicable,
                sensitive_data_processing_opt_out_notice: Notice::NotApplicable,
                sensitive_data_limit_use_notice: Notice::NotApplicable,
                sale_opt_out: OptOut::NotApplicable,
                sharing_opt_out: OptOut::NotApplicable,
                targeted_advertising_opt_out: OptOut::NotApplicable,
                sensitive_data_processing: SensitiveDataProcessing {
                    racial_or_ethnic_origin: Consent::NotApplicable,
                    religious_or_philosophical_beliefs: Consent::NotApplicable,
                    health_data: Consent::NotApplicable,
                    sex_life_or_sexual_orientation: Consent::NotApplicable,
                    citizenship_or_immigration_status: Consent::NotApplicable,
                    genetic_unique_identification: Consent::NotApplicable,
                    biometric_unique_identification: Consent::NotApplicable,
                    precise_geolocation_data: Consent::NotApplicable,
                    identification_documents: Consent::NotApplicable,
                    financial_data: Consent::NotApplicable,
                    union_membership: Consent::NotApplicable,
                    mail_email_or_text_messages: Consent::NotApplicable,
                },
                known_child_sensitive_data_consents: KnownChildSensitiveDataConsents {
                    from_13_to_16: Consent::NotApplicable,
                    under_13: Consent::NotApplicable,
                },
                personal_data_consent: Consent::NotApplicable,
                mspa_covered_transaction: true,
                mspa_opt_out_option_mode: MspaMode::NotApplicable,
                mspa_service_provider_mode: MspaMode::NotApplicable,
            },
            gpc: None,
        }
    }

    fn all_set() -> UsNat {
        UsNat {
            core: Core {
                sharing_notice: Notice::Provided,
                sale_opt_out_notice: Notice::Provided,
                sharing_opt_out_notice: Notice::Provided,
                targeted_advertising_opt_out_notice: Notice::Provided,
                sensitive_data_processing_opt_out_notice: Notice::Provided,
                sensitive_data_limit_use_notice: Notice::Provided,
                sale_opt_out: OptOut::OptedOut,
                sharing_opt_out: OptOut::OptedOut,
                targeted_advertising_opt_out: OptOut::OptedOut,
                sensitive_data_processing: SensitiveDataProcessing {
                    racial_or_ethnic_origin: Consent::NoConsent,
                    religious_or_philosophical_beliefs: Consent::NoConsent,
                    health_data: Consent::NoConsent,
                    sex_life_or_sexual_orientation: Consent::NoConsent,
                    citizenship_or_immigration_status: Consent::NoConsent,
                    genetic_unique_identification: Consent::NoConsent,
                    biometric_unique_identification: Consent::NoConsent,
                    precise_geolocation_data: Consent::NoConsent,
                    identification_documents: Consent::NoConsent,
                    financial_data: Consent::NoConsent,
                    union_membership: Consent::NoConsent,
                    mail_email_or_text_messages: Consent::NoConsent,
                },
                known_child_sensitive_data_consents: KnownChildSensitiveDataConsents {
                    from_13_to_16: Consent::NoConsent,
                    under_13: Consent::NoConsent,
                },
                personal_data_consent: Consent::NoConsent,
                mspa_covered_transaction: true,
                mspa_opt_out_option_mode: MspaMode::Yes,
                mspa_service_provider_mode: MspaMode::No,
            },
            gpc: None,
        }
    }

    #[test]
    fn core_all_not_applicable() {
        assert_eq!(UsNat::from_str("BAAAAAAAAQA").unwrap(), all_not_applicable());
    }

    #[test]
    fn core_all_set() {
        assert_eq!(UsNat::from_str("BVVVVVVVVWA").unwrap(), all_set());
    }

    #[test]
    fn with_gpc_segment() {
        let expected = UsNat {
            gpc: Some(true),
            ..all_set()
        };
        assert_eq!(UsNat::from_str("BVVVVVVVVWA.YA").unwrap(), expected);
    }

    #[test_case("" => matches SectionDecodeError::TruncatedInput ; "empty string")]
    #[test_case("B" => matches SectionDecodeError::TruncatedInput ; "truncated core")]
    #[test_case("CAAAAAAAAQA" => matches SectionDecodeError::InvalidSectionVersion { expected: 1, found: 2 } ; "wrong version")]
    #[test_case("BAAAAAAAAAA" => matches SectionDecodeError::InvalidFieldValue { .. } ; "covered transaction cannot be 0")]
    #[test_case("BVVVVVVVVWA.AA" => matches SectionDecodeError::UnknownSegmentType { segment_type: 0 } ; "unknown segment type")]
    fn error(s: &str) -> SectionDecodeError {
        UsNat::from_str(s).unwrap_err()
    }

    #[test_case("BAAAAAAAAQA")]
    #[test_case("BVVVVVVVVWA")]
    #[test_case("BVVVVVVVVWA.YA")]
    fn encode_reproduces_input(s: &str) {
        let section = UsNat::from_str(s).unwrap();
        assert_eq!(section.encode().unwrap(), s);
    }

    #[test]
    fn gpc_false_round_trips() {
        let section = UsNat {
            gpc: Some(false),
            ..all_not_applicable()
        };
        let encoded = section.encode().unwrap();
        assert_eq!(UsNat::from_str(&encoded).unwrap(), section);
    }
}
