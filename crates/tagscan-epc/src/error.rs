//! Decode failure reasons.
//!
//! Non-SGTIN tags are common on a shop floor, so a failed decode is an
//! ordinary outcome. [`DecodeFailure`] is carried as data inside
//! [`EpcDecodeResult::Failure`](crate::EpcDecodeResult::Failure); it implements
//! `std::error::Error` only so callers can log or chain it.

use serde::{Deserialize, Serialize};

/// Why an EPC could not be decoded as SGTIN-96.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DecodeFailure {
    /// Normalized input is not exactly 24 characters long.
    #[error("invalid length: expected 24 hex chars, got {actual}")]
    InvalidLength { actual: usize },

    /// Input contains a character that is not a hexadecimal digit.
    #[error("invalid hex character {found:?} at position {position}")]
    InvalidHex { found: char, position: usize },

    /// Header byte is not `0x30`.
    #[error("not SGTIN-96 (header: 0x{header:02X})")]
    NotSgtin96 { header: u8 },

    /// Partition value has no layout in the partition table.
    #[error("invalid partition value: {value}")]
    InvalidPartition { value: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_length_message() {
        let failure = DecodeFailure::InvalidLength { actual: 10 };
        assert_eq!(
            failure.to_string(),
            "invalid length: expected 24 hex chars, got 10"
        );
    }

    #[test]
    fn test_header_message_references_observed_header() {
        let failure = DecodeFailure::NotSgtin96 { header: 0x35 };
        assert_eq!(failure.to_string(), "not SGTIN-96 (header: 0x35)");
    }

    #[test]
    fn test_invalid_partition_message() {
        let failure = DecodeFailure::InvalidPartition { value: 7 };
        assert_eq!(failure.to_string(), "invalid partition value: 7");
    }

    #[test]
    fn test_failure_serialization() {
        let failure = DecodeFailure::InvalidHex {
            found: 'G',
            position: 3,
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"invalid_hex\""));

        let back: DecodeFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }
}
