//! Reader driver trait definitions.
//!
//! This module defines the contract between a [`ReaderSession`] and a vendor
//! reader driver. A driver discovers readers, opens a connection, applies
//! configuration steps, and pushes tag reads and status notifications into an
//! [`EventSink`] from whatever context its vendor SDK calls back on.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.
//!
//! [`ReaderSession`]: crate::session::ReaderSession

#![allow(async_fn_in_trait)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{AntennaConfig, SingulationConfig, TagFieldSelection};
use crate::error::DriverResult;
use crate::pipeline::EventSink;
use crate::types::{DeviceHandle, Region};

/// A raw tag read reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReadEvent {
    /// Tag identifier (hex EPC). Empty identifiers are ignored by the pipeline.
    pub id: String,

    /// Signal strength in dBm.
    pub rssi: i16,

    /// Peak signal strength in dBm.
    pub peak_rssi: i16,

    /// Times the tag was seen in this report.
    pub seen_count: u32,

    /// Antenna that saw the tag.
    pub antenna_id: u16,

    /// Memory bank data, if requested.
    pub memory_bank: Option<String>,

    /// Protocol control word, if requested.
    pub pc: Option<String>,
}

impl TagReadEvent {
    /// Create a read of `id` seen once on antenna 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagscan_reader::TagReadEvent;
    ///
    /// let event = TagReadEvent::new("3074257BF7194E4000001A85").with_rssi(-48);
    /// assert_eq!(event.peak_rssi, -48);
    /// assert_eq!(event.seen_count, 1);
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rssi: 0,
            peak_rssi: 0,
            seen_count: 1,
            antenna_id: 1,
            memory_bank: None,
            pc: None,
        }
    }

    /// Set both the read and peak signal strength.
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = rssi;
        self.peak_rssi = rssi;
        self
    }

    pub fn with_antenna(mut self, antenna_id: u16) -> Self {
        self.antenna_id = antenna_id;
        self
    }

    pub fn with_seen_count(mut self, seen_count: u32) -> Self {
        self.seen_count = seen_count;
        self
    }

    pub fn with_memory_bank(mut self, memory_bank: impl Into<String>) -> Self {
        self.memory_bank = Some(memory_bank.into());
        self
    }

    pub fn with_pc(mut self, pc: impl Into<String>) -> Self {
        self.pc = Some(pc.into());
        self
    }
}

/// Kind of a reader status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StatusKind {
    /// The reader dropped the link.
    Disconnection,

    /// An inventory round started.
    InventoryStarted,

    /// An inventory round stopped.
    InventoryStopped,

    /// The trigger on a handheld was pressed or released.
    Trigger { pressed: bool },

    /// Battery level report, in percent.
    Battery { level: u8 },

    /// Any other vendor notification.
    Other(String),
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Disconnection => write!(f, "disconnection"),
            StatusKind::InventoryStarted => write!(f, "inventory started"),
            StatusKind::InventoryStopped => write!(f, "inventory stopped"),
            StatusKind::Trigger { pressed: true } => write!(f, "trigger pressed"),
            StatusKind::Trigger { pressed: false } => write!(f, "trigger released"),
            StatusKind::Battery { level } => write!(f, "battery {}%", level),
            StatusKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A reader status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: StatusKind,
}

impl StatusEvent {
    pub fn new(kind: StatusKind) -> Self {
        Self { kind }
    }

    /// Shorthand for the notification sent when the reader drops the link.
    pub fn disconnection() -> Self {
        Self::new(StatusKind::Disconnection)
    }
}

/// Identifies a configuration step without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStepKind {
    EventReporting,
    TagFields,
    Antenna,
    Singulation,
}

impl fmt::Display for ConfigStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigStepKind::EventReporting => "event reporting",
            ConfigStepKind::TagFields => "tag fields",
            ConfigStepKind::Antenna => "antenna",
            ConfigStepKind::Singulation => "singulation",
        };
        write!(f, "{}", name)
    }
}

/// One step of reader configuration, applied in order during connect.
///
/// Event reporting and tag field selection are required: without them no tag
/// reads reach the pipeline. Antenna and singulation settings are optional;
/// when the reader rejects them it keeps its own defaults and connect carries
/// on with a [`ConfigWarning`](crate::error::ConfigWarning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConfigStep {
    /// Enable tag-read, inventory start/stop and handheld trigger events, with
    /// tag data attached to each event.
    EventReporting,

    /// Select which fields the reader reports per tag.
    TagFields(TagFieldSelection),

    /// Transmit power and RF mode for one antenna.
    Antenna(AntennaConfig),

    /// Session, inventory state and state-aware singulation.
    Singulation(SingulationConfig),
}

impl ConfigStep {
    pub fn kind(&self) -> ConfigStepKind {
        match self {
            ConfigStep::EventReporting => ConfigStepKind::EventReporting,
            ConfigStep::TagFields(_) => ConfigStepKind::TagFields,
            ConfigStep::Antenna(_) => ConfigStepKind::Antenna,
            ConfigStep::Singulation(_) => ConfigStepKind::Singulation,
        }
    }

    /// Whether a failure of this step is only a warning.
    pub fn is_optional(&self) -> bool {
        matches!(self, ConfigStep::Antenna(_) | ConfigStep::Singulation(_))
    }
}

/// Trait for UHF reader drivers.
///
/// A driver owns the vendor SDK. The session calls it from one task at a time,
/// so methods take `&mut self`; event delivery happens through the
/// [`EventSink`] handed over in [`subscribe`](ReaderDriver::subscribe), which
/// may be called from any thread.
///
/// # Examples
///
/// ```no_run
/// use tagscan_reader::traits::ReaderDriver;
/// use tagscan_reader::DriverResult;
///
/// async fn first_reader<D: ReaderDriver>(driver: &mut D) -> DriverResult<Option<String>> {
///     let devices = driver.discover().await?;
///     Ok(devices.into_iter().next().map(|device| device.name))
/// }
/// ```
pub trait ReaderDriver: Send + Sync {
    /// Open connection to one reader.
    type Connection: Send;

    /// List readers currently reachable. An empty list is not an error.
    async fn discover(&mut self) -> DriverResult<Vec<DeviceHandle>>;

    /// Open a connection to `device`.
    ///
    /// # Errors
    ///
    /// Fails with [`VendorCode::RegionNotConfigured`](crate::error::VendorCode)
    /// when the radio has no region yet.
    async fn open(&mut self, device: &DeviceHandle) -> DriverResult<Self::Connection>;

    /// Apply one configuration step.
    async fn configure(
        &mut self,
        connection: &mut Self::Connection,
        step: &ConfigStep,
    ) -> DriverResult<()>;

    /// Start delivering events for `connection` into `sink`.
    async fn subscribe(
        &mut self,
        connection: &mut Self::Connection,
        sink: EventSink,
    ) -> DriverResult<()>;

    /// Stop delivering events for `connection`.
    async fn unsubscribe(&mut self, connection: &mut Self::Connection) -> DriverResult<()>;

    /// Begin continuous inventory.
    async fn start_inventory(&mut self, connection: &mut Self::Connection) -> DriverResult<()>;

    /// End continuous inventory.
    async fn stop_inventory(&mut self, connection: &mut Self::Connection) -> DriverResult<()>;

    /// Release the connection and its resources.
    async fn close(&mut self, connection: Self::Connection) -> DriverResult<()>;

    /// Regions the reader may be set to.
    async fn supported_regions(&mut self, device: &DeviceHandle) -> DriverResult<Vec<Region>>;

    /// Set the reader's regulatory region.
    async fn set_region(&mut self, device: &DeviceHandle, region: &Region) -> DriverResult<()>;
}
