//! Common types shared between drivers, sessions and consumers.
//!
//! This module defines discovered device handles, regulatory regions, and the
//! [`Tag`] records delivered to consumers of the tag stream.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tagscan_epc::EpcDecodeResult;

use crate::traits::TagReadEvent;

/// A reader found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    /// Reader name (e.g., "RFD40 Sled").
    pub name: String,

    /// Transport address such as a serial port or Bluetooth MAC.
    pub address: Option<String>,

    /// Optional reader serial number.
    pub serial_number: Option<String>,
}

impl DeviceHandle {
    /// Create a new DeviceHandle with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            serial_number: None,
        }
    }

    /// Set the transport address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// A regulatory region the radio can operate in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Vendor region code (e.g., "USA", "EU").
    pub code: String,

    /// Human readable name.
    pub name: String,
}

impl Region {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// One tag read as delivered to consumers.
///
/// Tags are immutable values; every consumer receives its own clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag identifier as reported by the reader (hex EPC).
    pub epc: String,

    /// Signal strength of this read in dBm.
    pub rssi: i16,

    /// Peak signal strength in dBm.
    pub peak_rssi: i16,

    /// Number of times the reader saw the tag in this report.
    pub read_count: u32,

    /// When the pipeline received the read.
    pub timestamp: DateTime<Utc>,

    /// Memory bank data, when the reader reports it.
    pub memory_bank: Option<String>,

    /// Protocol control word, when the reader reports it.
    pub pc: Option<String>,

    /// Antenna that saw the tag.
    pub antenna_id: u16,
}

impl Tag {
    /// Build a tag from a driver event stamped with the given arrival time.
    pub fn from_event(event: &TagReadEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            epc: event.id.clone(),
            rssi: event.rssi,
            peak_rssi: event.peak_rssi,
            read_count: event.seen_count,
            timestamp,
            memory_bank: event.memory_bank.clone(),
            pc: event.pc.clone(),
            antenna_id: event.antenna_id,
        }
    }

    /// Arrival time in local time, `HH:MM:SS.mmm`.
    pub fn formatted_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S%.3f")
            .to_string()
    }

    /// Decode the EPC as SGTIN-96.
    pub fn decode(&self) -> EpcDecodeResult {
        tagscan_epc::decode(&self.epc)
    }

    /// Label for display: the GTIN when the EPC is SGTIN-96, otherwise the raw EPC.
    pub fn display_name(&self) -> String {
        match self.decode() {
            EpcDecodeResult::Success(sgtin) => format!("GTIN {} / {}", sgtin.gtin14, sgtin.serial),
            EpcDecodeResult::Failure { .. } => self.epc.clone(),
        }
    }
}
