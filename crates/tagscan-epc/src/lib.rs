//! GS1 SGTIN-96 decoding for RFID shopping-basket scanners.
//!
//! A UHF reader reports each tag's EPC as 24 hex characters. When the tag is
//! encoded as SGTIN-96 the EPC carries a GS1 company prefix, item reference
//! and serial number, from which the product's GTIN-14 can be rebuilt.
//!
//! ```
//! use tagscan_epc::decode;
//!
//! let result = decode("3074257BF7194E4000001A85");
//! assert_eq!(result.gtin14(), Some("06141418123456"));
//! ```
//!
//! Decoding is a pure function returning [`EpcDecodeResult`]; tags that are
//! not SGTIN-96 produce a [`DecodeFailure`] value, never a panic.

pub mod constants;
pub mod decoder;
pub mod error;
pub mod types;

pub use constants::{PARTITION_TABLE, PartitionInfo, SGTIN96_HEADER, partition_info};
pub use decoder::{decode, gs1_check_digit, try_decode};
pub use error::DecodeFailure;
pub use types::{EpcDecodeResult, Sgtin96};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
