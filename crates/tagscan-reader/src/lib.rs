//! UHF reader session management for RFID basket scanners.
//!
//! This crate drives a handheld UHF reader from discovery to inventory and
//! turns its callbacks into two observable outputs: a [`ReaderState`] and a
//! bounded stream of [`Tag`] reads.
//!
//! # Design
//!
//! - **Async-first**: driver operations are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyReaderDriver`](devices::AnyReaderDriver) wraps
//!   concrete drivers, since RPITIT traits are not object-safe.
//! - **Never blocks the driver**: tag reads are published with drop-oldest
//!   overflow, so a slow consumer loses old reads rather than stalling the
//!   vendor callback thread.
//! - **Faults are state**: connect and start failures are returned to the
//!   caller and also published as [`ReaderState::Error`] with a user facing
//!   message.
//!
//! # Modules
//!
//! - [`traits`]: the [`ReaderDriver`] contract and driver event types
//! - [`session`]: [`ReaderSession`], the connection state machine
//! - [`pipeline`]: [`EventSink`](pipeline::EventSink) and the tag stream
//! - [`state`]: [`ReaderState`] and its transition rules
//! - [`config`]: [`ReaderConfig`] and the RF profile
//! - [`mock`]: a scriptable driver for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use tagscan_reader::devices::AnyReaderDriver;
//! use tagscan_reader::{ReaderConfig, ReaderSession};
//!
//! async fn scan(driver: AnyReaderDriver) -> tagscan_reader::Result<()> {
//!     let session = ReaderSession::new(driver, ReaderConfig::default());
//!     let mut tags = session.subscribe_tags();
//!
//!     let report = session.connect().await?;
//!     for warning in &report.warnings {
//!         eprintln!("{}", warning);
//!     }
//!
//!     session.start_inventory().await?;
//!     while let Some(tag) = tags.recv().await {
//!         println!("{} {}", tag.formatted_time(), tag.display_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod devices;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{DuplicatePolicy, ReaderConfig, ReaderProfile};
pub use error::{ConfigWarning, DriverError, DriverResult, ReaderError, Result, VendorCode};
pub use pipeline::{EventSink, TagReceiver, TagStream};
pub use session::{ConnectReport, ReaderSession};
pub use state::{ReaderState, StateTransition};
pub use traits::{ConfigStep, ConfigStepKind, ReaderDriver, StatusEvent, StatusKind, TagReadEvent};
pub use types::{DeviceHandle, Region, Tag};
