//! 2-bit coded field types shared by the US privacy sections.
use crate::core::{DataReader, DataWriter, EncodeError, FromDataReader, ToDataWriter};
use crate::sections::SectionDecodeError;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Notice {
    NotApplicable = 0,
    Provided = 1,
    NotProvided = 2,
}

impl FromDataReader for Notice {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self::from_u8(r.read_fixed_integer(2)?).unwrap_or(Self::NotApplicable))
    }
}

impl ToDataWriter for Notice {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(*self as u64, 2)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum OptOut {
    NotApplicable = 0,
    OptedOut = 1,
    DidNotOptOut = 2,
}

impl FromDataReader for OptOut {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self::from_u8(r.read_fixed_integer(2)?).unwrap_or(Self::NotApplicable))
    }
}

impl ToDataWriter for OptOut {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(*self as u64, 2)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Consent {
    NotApplicable = 0,
    NoConsent = 1,
    Consent = 2,
}

impl FromDataReader for Consent {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self::from_u8(r.read_fixed_integer(2)?).unwrap_or(Self::NotApplicable))
    }
}

impl ToDataWriter for Consent {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(*self as u64, 2)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum MspaMode {
    NotApplicable = 0,
    Yes = 1,
    No = 2,
}

impl FromDataReader for MspaMode {
    type Err = SectionDecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self::from_u8(r.read_fixed_integer(2)?).unwrap_or(Self::NotApplicable))
    }
}

impl ToDataWriter for MspaMode {
    type Err = EncodeError;

    fn to_data_writer(&self, w: &mut DataWriter) -> Result<(), Self::Err> {
        w.write_fixed_integer(*self as u64, 2)
    }
}

/// The MSPA covered transaction field admits only the values 1 (yes)
/// and 2 (no).
pub(crate) fn parse_mspa_covered_transaction(
    r: &mut DataReader,
) -> Result<bool, SectionDecodeError> {
    let val = r.read_fixed_integer::<u8>(2)?;
    match val {
        1 => Ok(true),
        2 => Ok(false),
        v => Err(SectionDecodeError::InvalidFieldValue {
            expected: "1 or 2".to_string(),
            found: v.to_string(),
        }),
    }
}

pub(crate) fn write_mspa_covered_transaction(
    w: &mut DataWriter,
    covered: bool,
) -> Result<(), EncodeError> {
    w.write_fixed_integer(if covered { 1 } else { 2 }, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn read<F>(bits: u8) -> F
    where
        F: FromDataReader<Err = SectionDecodeError>,
    {
        // the 2-bit value sits in the top bits of a single byte
        DataReader::new(&[bits << 6]).parse().unwrap()
    }

    #[test_case(0 => Notice::NotApplicable)]
    #[test_case(1 => Notice::Provided)]
    #[test_case(2 => Notice::NotProvided)]
    #[test_case(3 => Notice::NotApplicable ; "out of range value defaults")]
    fn notice(bits: u8) -> Notice {
        read(bits)
    }

    #[test_case(1 => OptOut::OptedOut)]
    #[test_case(2 => OptOut::DidNotOptOut)]
    fn opt_out(bits: u8) -> OptOut {
        read(bits)
    }

    #[test_case(1 => Consent::NoConsent)]
    #[test_case(2 => Consent::Consent)]
    fn consent(bits: u8) -> Consent {
        read(bits)
    }

    #[test]
    fn covered_transaction() {
        assert!(parse_mspa_covered_transaction(&mut DataReader::new(&[0b01 << 6])).unwrap());
        assert!(!parse_mspa_covered_transaction(&mut DataReader::new(&[0b10 << 6])).unwrap());
        assert!(matches!(
            parse_mspa_covered_transaction(&mut DataReader::new(&[0])),
            Err(SectionDecodeError::InvalidFieldValue { .. })
        ));
        assert!(matches!(
            parse_mspa_covered_transaction(&mut DataReader::new(&[0b11 << 6])),
            Err(SectionDecodeError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn enums_round_trip() {
        let mut w = DataWriter::new();
        w.write(&Notice::Provided).unwrap();
        w.write(&OptOut::DidNotOptOut).unwrap();
        w.write(&Consent::Consent).unwrap();
        w.write(&MspaMode::Yes).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0b01_10_10_01]);

        let mut r = DataReader::new(&bytes);
        assert_eq!(r.parse::<Notice>().unwrap(), Notice::Provided);
        assert_eq!(r.parse::<OptOut>().unwrap(), OptOut::DidNotOptOut);
        assert_eq!(r.parse::<Consent>().unwrap(), Consent::Consent);
        assert_eq!(r.parse::<MspaMode>().unwrap(), MspaMode::Yes);
    }
}
