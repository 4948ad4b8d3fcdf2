//! Whole-string properties: decode → encode → decode yields an equal model,
//! canonical strings re-encode byte-for-byte, and decode options behave.
use gpp_codec::sections::{DecodeOptions, Section, SectionDecodeError};
use gpp_codec::v1::{GPPDecodeError, GPPModel};
use std::str::FromStr;
use test_case::test_case;

const TCF_EU_V2_CORE: &str = "CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA";
const TCF_EU_V2_FULL: &str = "COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.IFoEUQQgAIQwgIwQABAEAAAAOIAACAIAAAAQAIAgEAACEAAAAAgAQBAAAAAAAGBAAgAAAAAAAFAAECAAAgAAQARAEQAAAAAJAAIAAgAAAYQEAAAQmAgBC3ZAYzUw.ZAAgH9794ulA";
const TCF_CA_V1_SECTION: &str = "BPXuQIAPXuQIAAfKABENB-CgAAAAAAAAAAAAAAAA.YAAAAAAAAAA";
// US Connecticut, id 12, which this crate has no codec for
const US_CT_SECTION: &str = "BAAAAABA";

#[test_case("DBABTA~1YNN" ; "usp v1")]
#[test_case("DBABMA~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA" ; "tcf eu v2 core")]
#[test_case("DBABM~COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.IFoEUQQgAIQwgIwQABAEAAAAOIAACAIAAAAQAIAgEAACEAAAAAgAQBAAAAAAAGBAAgAAAAAAAFAAECAAAgAAQARAEQAAAAAJAAIAAgAAAYQEAAAQmAgBC3ZAYzUw.ZAAgH9794ulA" ; "tcf eu v2 with all segments")]
#[test_case("DBACNY~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA~1YNN" ; "two sections")]
#[test_case("DBABLA~BVVVVVVVVWA.YA" ; "usnat with gpc")]
#[test_case("DBABjw~BPXuQIAPXuQIAAfKABENB-CgAAAAAAAAAAAAAAAA.YAAAAAAAAAA~1YNN" ; "tcf ca v1 and usp v1")]
#[test_case("DBABVg~BAAAAABA" ; "unsupported section")]
fn round_trip_preserves_model(s: &str) {
    let model = GPPModel::from_str(s).unwrap();
    let encoded = model.encode().unwrap();
    assert_eq!(GPPModel::from_str(&encoded).unwrap(), model);
}

#[test_case("DBABTA~1YNN" => "DBABTA~1YNN".to_string() ; "already canonical")]
#[test_case("DBABM~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA" => format!("DBABMA~{TCF_EU_V2_CORE}") ; "header gains a padding char")]
#[test_case("DBACNY~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA~1YNN" => format!("DBACNYA~{TCF_EU_V2_CORE}~1YNN") ; "two sections")]
#[test_case("DBABLA~BAAAAAAAAQA" => "DBABLA~BAAAAAAAAQA".to_string() ; "usnat")]
fn encode_is_canonical(s: &str) -> String {
    GPPModel::from_str(s).unwrap().encode().unwrap()
}

#[test]
fn tcf_segments_reencode_byte_identical() {
    let s = format!("DBABMA~{TCF_EU_V2_FULL}");
    assert_eq!(GPPModel::from_str(&s).unwrap().encode().unwrap(), s);
}

#[test]
fn tcf_ca_segments_reencode_byte_identical() {
    let s = format!("DBABjw~{TCF_CA_V1_SECTION}~1YNN");
    let model = GPPModel::from_str(&s).unwrap();

    assert!(matches!(model.sections()[0], Section::TcfCaV1(_)));
    assert_eq!(model.encode().unwrap(), s);
}

#[test]
fn unsupported_section_round_trips_byte_identical() {
    let s = format!("DBABVg~{US_CT_SECTION}");
    let model = GPPModel::from_str(&s).unwrap();

    assert_eq!(
        model.sections()[0],
        Section::Unsupported {
            id: 12,
            data: US_CT_SECTION.to_string(),
        }
    );
    assert_eq!(model.encode().unwrap(), s);
}

#[test]
fn strict_sections_rejects_unsupported_ids() {
    let s = format!("DBABVg~{US_CT_SECTION}");
    let options = DecodeOptions {
        strict_sections: true,
        ..Default::default()
    };

    assert!(matches!(
        GPPModel::parse_str_with(&s, options),
        Err(GPPDecodeError::UnknownSectionId(12))
    ));
}

#[test]
fn strict_padding_rejects_dirty_padding() {
    // same TCF EU v2 core as the canonical vector, with the final padding
    // bit set
    let s = "DBABM~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAB";
    assert!(GPPModel::from_str(s).is_ok());

    let options = DecodeOptions {
        strict_padding: true,
        ..Default::default()
    };
    assert!(matches!(
        GPPModel::parse_str_with(s, options),
        Err(GPPDecodeError::SectionDecode {
            id: 2,
            source: SectionDecodeError::NonZeroPadding,
        })
    ));
}

#[test]
fn model_from_sections_encodes_header() {
    let model = GPPModel::from_sections(vec![
        Section::UspV1("1YN-".parse().unwrap()),
        Section::TcfCaV1(TCF_CA_V1_SECTION.parse().unwrap()),
    ]);

    assert_eq!(model.section_ids(), &[5, 6]);

    let encoded = model.encode().unwrap();
    assert_eq!(encoded, format!("DBABjw~{TCF_CA_V1_SECTION}~1YN-"));
    assert_eq!(GPPModel::from_str(&encoded).unwrap(), model);
}

#[test]
fn truncated_section_fails() {
    let r = GPPModel::from_str("DBABM~CPXxRfAPXxRf");
    assert!(matches!(
        r,
        Err(GPPDecodeError::SectionDecode {
            id: 2,
            source: SectionDecodeError::TruncatedInput,
        })
    ));
}
