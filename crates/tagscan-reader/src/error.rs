//! Error types for reader drivers and reader sessions.
//!
//! Two layers are kept apart:
//!
//! - [`DriverError`] is what a vendor driver reports for a single operation.
//! - [`ReaderError`] is what a [`ReaderSession`](crate::session::ReaderSession)
//!   reports to its caller after classifying the driver fault.
//!
//! Non-fatal configuration failures are not errors at all; they are collected
//! as [`ConfigWarning`] values and returned from a successful connect.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::traits::ConfigStepKind;

/// Result type alias for reader session operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Result type alias for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Substring (matched case-insensitively) identifying the vendor fault raised
/// while the handheld is on external power.
pub const CHARGING_SOURCE_MARKER: &str = "charging source";

/// User guidance shown when the reader refuses to operate on external power.
pub const CHARGING_SOURCE_GUIDANCE: &str = "Disconnect USB/charging cable to use RFID reader.";

/// Vendor result codes the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum VendorCode {
    /// The radio has no regulatory region configured.
    RegionNotConfigured,

    /// Any other vendor result code.
    Other(u16),
}

impl fmt::Display for VendorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorCode::RegionNotConfigured => write!(f, "REGION_NOT_CONFIGURED"),
            VendorCode::Other(code) => write!(f, "code {}", code),
        }
    }
}

/// Faults reported by a reader driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DriverError {
    /// The driver API was called incorrectly.
    #[error("Invalid usage: {info}")]
    InvalidUsage { info: String },

    /// The reader rejected the operation.
    #[error(
        "Operation failed ({code}): {}",
        .vendor_message.as_deref().unwrap_or("no vendor message")
    )]
    OperationFailure {
        code: VendorCode,
        vendor_message: Option<String>,
    },

    /// The link to the reader failed below the vendor API.
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl DriverError {
    /// Create a new invalid usage error.
    pub fn invalid_usage(info: impl Into<String>) -> Self {
        Self::InvalidUsage { info: info.into() }
    }

    /// Create a new operation failure carrying a vendor message.
    pub fn operation_failure(code: VendorCode, vendor_message: impl Into<String>) -> Self {
        Self::OperationFailure {
            code,
            vendor_message: Some(vendor_message.into()),
        }
    }

    /// Create the failure a radio reports before a region is chosen.
    pub fn region_not_configured() -> Self {
        Self::OperationFailure {
            code: VendorCode::RegionNotConfigured,
            vendor_message: Some("Region is not configured".to_string()),
        }
    }

    /// Create a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Vendor message attached to an operation failure, if any.
    pub fn vendor_message(&self) -> Option<&str> {
        match self {
            Self::OperationFailure { vendor_message, .. } => vendor_message.as_deref(),
            _ => None,
        }
    }

    pub fn is_region_not_configured(&self) -> bool {
        matches!(
            self,
            Self::OperationFailure {
                code: VendorCode::RegionNotConfigured,
                ..
            }
        )
    }

    /// Whether the vendor message says the device is on external power.
    pub fn is_charging_source(&self) -> bool {
        self.vendor_message()
            .is_some_and(|message| message.to_lowercase().contains(CHARGING_SOURCE_MARKER))
    }
}

/// Errors returned by reader session operations.
///
/// Connect and start-inventory faults are also mirrored into
/// [`ReaderState::Error`](crate::state::ReaderState::Error); the message stored
/// there is this type's `Display` output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ReaderError {
    /// Discovery returned no readers on every attempt.
    #[error("No RFID readers found after {attempts} discovery attempts")]
    DiscoveryExhausted { attempts: u32 },

    /// The operation needs an established connection.
    #[error("Reader not connected")]
    NotConnected,

    /// Connect was called while already connected or scanning.
    #[error("Reader already connected")]
    AlreadyConnected,

    /// Another connect, start or stop is still running.
    #[error("Another reader operation is in progress")]
    Busy,

    /// Connect was interrupted by disconnect.
    #[error("Operation cancelled")]
    Cancelled,

    /// The driver reported an invalid usage fault.
    #[error("Invalid usage: {info}")]
    InvalidUsage { info: String },

    /// The reader refuses to operate on external power.
    #[error("Disconnect USB/charging cable to use RFID reader.")]
    ChargingSource { vendor_message: String },

    /// The reader rejected an operation.
    #[error("Operation failed: {message}")]
    OperationFailure { code: VendorCode, message: String },

    /// Region recovery found nothing to apply.
    #[error("No supported regions found")]
    NoSupportedRegions,

    /// Region recovery could not query or apply a region.
    #[error("Failed to configure region: {message}")]
    RegionRecovery { message: String },

    /// The link to the reader failed.
    #[error("Connection error: {message}")]
    Transport { message: String },

    /// State machine rejected a transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Configuration values are unusable.
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },
}

impl ReaderError {
    /// Create a new region recovery error.
    pub fn region_recovery(message: impl Into<String>) -> Self {
        Self::RegionRecovery {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Driver supplied text without the category prefix.
    ///
    /// Falls back to the full `Display` output for errors that carry no
    /// driver text.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidUsage { info } => info.clone(),
            Self::OperationFailure { message, .. }
            | Self::RegionRecovery { message }
            | Self::Transport { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<DriverError> for ReaderError {
    fn from(error: DriverError) -> Self {
        if error.is_charging_source() {
            return Self::ChargingSource {
                vendor_message: error.vendor_message().unwrap_or_default().to_string(),
            };
        }

        match error {
            DriverError::InvalidUsage { info } => Self::InvalidUsage { info },
            DriverError::OperationFailure {
                code,
                vendor_message,
            } => Self::OperationFailure {
                code,
                message: vendor_message.unwrap_or_else(|| format!("Unknown error ({})", code)),
            },
            DriverError::Transport { message } => Self::Transport { message },
        }
    }
}

/// A non-fatal configuration step failure collected during connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWarning {
    /// Step that failed.
    pub step: ConfigStepKind,

    /// Driver error text.
    pub message: String,
}

impl ConfigWarning {
    pub fn new(step: ConfigStepKind, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration skipped: {}", self.step, self.message)
    }
}
