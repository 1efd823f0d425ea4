use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeFailure;

/// Product identity decoded from an SGTIN-96 EPC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sgtin96 {
    /// GTIN-14, including the trailing GS1 check digit.
    pub gtin14: String,

    /// Serial number in decimal (no padding, up to 2^38 - 1).
    pub serial: String,

    /// GS1 company prefix, zero-padded to the partition's digit count.
    pub company_prefix: String,

    /// Item reference without the indicator digit.
    pub item_reference: String,

    /// GTIN indicator digit (leading digit of the item reference field).
    pub indicator_digit: u8,

    /// Filter value (packaging level). Informational only.
    pub filter: u8,
}

impl Sgtin96 {
    /// The GS1 check digit carried as the last digit of `gtin14`.
    #[must_use]
    pub fn check_digit(&self) -> Option<u8> {
        self.gtin14
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|d| d as u8)
    }

    /// Pure identity URI: `urn:epc:id:sgtin:<prefix>.<indicator><itemref>.<serial>`.
    #[must_use]
    pub fn to_urn(&self) -> String {
        format!(
            "urn:epc:id:sgtin:{}.{}{}.{}",
            self.company_prefix, self.indicator_digit, self.item_reference, self.serial
        )
    }
}

impl fmt::Display for Sgtin96 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GTIN {} serial {}", self.gtin14, self.serial)
    }
}

/// Outcome of decoding one EPC.
///
/// Decoding never raises: callers match on the variant and fall back to the
/// raw EPC when it is a [`Failure`](EpcDecodeResult::Failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EpcDecodeResult {
    /// The EPC is a well-formed SGTIN-96.
    Success(Sgtin96),

    /// The EPC could not be decoded.
    Failure { reason: DecodeFailure },
}

impl EpcDecodeResult {
    /// Create a failure result.
    pub fn failure(reason: DecodeFailure) -> Self {
        Self::Failure { reason }
    }

    /// Check if decoding succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Get the decoded identity, if any.
    pub fn as_sgtin(&self) -> Option<&Sgtin96> {
        match self {
            Self::Success(sgtin) => Some(sgtin),
            Self::Failure { .. } => None,
        }
    }

    /// Get the GTIN-14, if decoding succeeded.
    pub fn gtin14(&self) -> Option<&str> {
        self.as_sgtin().map(|s| s.gtin14.as_str())
    }

    /// Get the failure reason, if decoding failed.
    pub fn failure_reason(&self) -> Option<&DecodeFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure { reason } => Some(reason),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<Sgtin96, DecodeFailure> {
        match self {
            Self::Success(sgtin) => Ok(sgtin),
            Self::Failure { reason } => Err(reason),
        }
    }
}

impl From<Result<Sgtin96, DecodeFailure>> for EpcDecodeResult {
    fn from(result: Result<Sgtin96, DecodeFailure>) -> Self {
        match result {
            Ok(sgtin) => Self::Success(sgtin),
            Err(reason) => Self::failure(reason),
        }
    }
}
