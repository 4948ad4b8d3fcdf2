//! This crate is a decoder and encoder for IAB Global Privacy Platform (GPP)
//! [consent strings](https://github.com/InteractiveAdvertisingBureau/Global-Privacy-Platform).
//!
//! It parses whole GPP strings into a [`GPPModel`](v1::GPPModel), decodes the
//! TCF EU v2, TCF CA v1, US national and USP v1 sections into typed
//! structures, carries
//! every other section verbatim, and encodes models back to canonical GPP
//! strings with a round-trip guarantee: encoding a decoded string yields a
//! string that decodes to an equal model.
//!
//! NOTE: This is not an official IAB library.
//!
//! # Parsing GPP strings
//!
//! A GPP consent string is made of a mandatory header and a list of sections.
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use std::str::FromStr;
//! use gpp_codec::v1::GPPModel;
//!
//! let s = "DBACNY~CPXxRfAPXxRfAAfKABENB-CgAAAAAAAAAAYgAAAAAAAA~1YNN";
//! let model = GPPModel::from_str(s)?;
//!
//! for section in model.sections() {
//!     println!("Section {}: {:?}", section.id(), section);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Accessing section data
//!
//! Depending on the legislation which applies with regard to the data you are
//! handling, you may want to analyze only specific sections.
//!
//! The following example checks that a specific vendor (id 755) has the right
//! to create a personalized ads profile (purpose ID 3) for the user who
//! submitted the provided consent string.
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use std::str::FromStr;
//! use gpp_codec::sections::{Section, SectionId};
//! use gpp_codec::v1::GPPModel;
//!
//! let s = "DBABMA~CPXuQIAPXuQIAAfKABENB-CgACAAAAAAAAYgF5wAQF5gAAAA.YAAAAAAAAAAA";
//! let model = GPPModel::from_str(s)?;
//!
//! let has_user_consent = match model.section(SectionId::TcfEuV2) {
//!     Some(Section::TcfEuV2(tcf)) => {
//!         // does the user consent to the vendor creating a personalized ads
//!         // profile based on their data?
//!         let personalized_ads_profile_consent = tcf.core.purpose_consents.contains(&3);
//!
//!         // does the user consent to vendor Google Advertising Products
//!         // using their data?
//!         let vendor_consent = tcf.core.vendor_consents.contains(755);
//!
//!         personalized_ads_profile_consent && vendor_consent
//!     }
//!     _ => false,
//! };
//!
//! assert!(has_user_consent);
//! # Ok(())
//! # }
//! ```
//!
//! # Encoding
//!
//! A model encodes back to a GPP string, whether it was parsed or built
//! programmatically:
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use gpp_codec::sections::Section;
//! use gpp_codec::v1::GPPModel;
//!
//! let model = GPPModel::from_sections(vec![Section::UspV1("1YNN".parse()?)]);
//!
//! assert_eq!(model.encode()?, "DBABTA~1YNN");
//! # Ok(())
//! # }
//! ```
//!
//! # Error handling
//!
//! This crate is conservative with regard to how it handles parsing failure.
//! If a section cannot be fully decoded, then it is considered as an error.
//! This is done to avoid obtaining erroneous user consent information from
//! potentially corrupted payloads. The only designed leniency is the
//! verbatim passthrough of sections this crate has no codec for, which can
//! be turned off with [`DecodeOptions`](sections::DecodeOptions).
//!
pub(crate) mod core;
pub mod sections;
pub mod v1;
