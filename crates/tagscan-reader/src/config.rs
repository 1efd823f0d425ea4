//! Reader session configuration.
//!
//! [`ReaderConfig`] deserializes from JSON with every field optional; missing
//! fields take the defaults below.
//!
//! | Field                   | Default          |
//! |-------------------------|------------------|
//! | `discovery_attempts`    | 5                |
//! | `discovery_interval_ms` | 1000             |
//! | `tag_buffer_capacity`   | 100              |
//! | `duplicate_policy`      | `pass_through`   |
//! | `profile`               | [`ReaderProfile`] defaults |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};
use crate::traits::ConfigStep;

/// Discovery attempts before giving up.
pub const DEFAULT_DISCOVERY_ATTEMPTS: u32 = 5;

/// Wait between discovery attempts.
pub const DEFAULT_DISCOVERY_INTERVAL_MS: u64 = 1000;

/// Tags kept per subscriber before the oldest is dropped.
pub const DEFAULT_TAG_BUFFER_CAPACITY: usize = 100;

/// Transmit power index applied to the antenna.
pub const DEFAULT_TRANSMIT_POWER_INDEX: u16 = 270;

/// How repeated reads of the same EPC are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every read is delivered.
    #[default]
    PassThrough,

    /// Only the first read of each EPC per inventory run is delivered.
    FirstReadPerInventory,
}

/// Gen2 singulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingulationSession {
    #[default]
    S0,
    S1,
    S2,
    S3,
}

/// Gen2 inventory flag targeted by singulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InventoryState {
    #[default]
    A,
    B,
    AbFlip,
}

/// Which per-tag fields the reader reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFieldSelection {
    pub rssi: bool,
    pub peak_rssi: bool,
    pub seen_count: bool,
    pub antenna_id: bool,
    pub pc: bool,
    pub memory_bank: bool,
}

impl TagFieldSelection {
    /// Every field.
    pub const fn all() -> Self {
        Self {
            rssi: true,
            peak_rssi: true,
            seen_count: true,
            antenna_id: true,
            pc: true,
            memory_bank: true,
        }
    }
}

impl Default for TagFieldSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Antenna RF settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntennaConfig {
    pub antenna_id: u16,
    pub transmit_power_index: u16,
    pub rf_mode_table_index: u16,
}

impl Default for AntennaConfig {
    fn default() -> Self {
        Self {
            antenna_id: 1,
            transmit_power_index: DEFAULT_TRANSMIT_POWER_INDEX,
            rf_mode_table_index: 0,
        }
    }
}

/// Singulation control settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SingulationConfig {
    pub antenna_id: u16,
    pub session: SingulationSession,
    pub inventory_state: InventoryState,
    pub state_aware: bool,
}

/// RF profile applied on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderProfile {
    pub antenna_id: u16,
    pub transmit_power_index: u16,
    pub rf_mode_table_index: u16,
    pub session: SingulationSession,
    pub inventory_state: InventoryState,
    pub state_aware_singulation: bool,
    pub tag_fields: TagFieldSelection,
}

impl Default for ReaderProfile {
    fn default() -> Self {
        Self {
            antenna_id: 1,
            transmit_power_index: DEFAULT_TRANSMIT_POWER_INDEX,
            rf_mode_table_index: 0,
            session: SingulationSession::S0,
            inventory_state: InventoryState::A,
            state_aware_singulation: false,
            tag_fields: TagFieldSelection::all(),
        }
    }
}

impl ReaderProfile {
    /// Configuration steps in the order they are applied.
    pub fn steps(&self) -> Vec<ConfigStep> {
        vec![
            ConfigStep::EventReporting,
            ConfigStep::TagFields(self.tag_fields),
            ConfigStep::Antenna(AntennaConfig {
                antenna_id: self.antenna_id,
                transmit_power_index: self.transmit_power_index,
                rf_mode_table_index: self.rf_mode_table_index,
            }),
            ConfigStep::Singulation(SingulationConfig {
                antenna_id: self.antenna_id,
                session: self.session,
                inventory_state: self.inventory_state,
                state_aware: self.state_aware_singulation,
            }),
        ]
    }
}

/// Configuration for a [`ReaderSession`](crate::session::ReaderSession).
///
/// # Examples
///
/// ```
/// use tagscan_reader::config::{DuplicatePolicy, ReaderConfig};
///
/// let config: ReaderConfig =
///     serde_json::from_str(r#"{ "duplicate_policy": "first_read_per_inventory" }"#).unwrap();
/// assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstReadPerInventory);
/// assert_eq!(config.tag_buffer_capacity, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Discovery attempts before giving up.
    pub discovery_attempts: u32,

    /// Wait between discovery attempts, in milliseconds.
    pub discovery_interval_ms: u64,

    /// Tags buffered per subscriber.
    pub tag_buffer_capacity: usize,

    /// Handling of repeated reads.
    pub duplicate_policy: DuplicatePolicy,

    /// RF profile.
    pub profile: ReaderProfile,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            discovery_attempts: DEFAULT_DISCOVERY_ATTEMPTS,
            discovery_interval_ms: DEFAULT_DISCOVERY_INTERVAL_MS,
            tag_buffer_capacity: DEFAULT_TAG_BUFFER_CAPACITY,
            duplicate_policy: DuplicatePolicy::PassThrough,
            profile: ReaderProfile::default(),
        }
    }
}

impl ReaderConfig {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    /// Reject values a session cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidConfig`] when discovery attempts or the
    /// tag buffer capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.discovery_attempts == 0 {
            return Err(ReaderError::invalid_config(
                "discovery_attempts must be at least 1",
            ));
        }
        if self.tag_buffer_capacity == 0 {
            return Err(ReaderError::invalid_config(
                "tag_buffer_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}
