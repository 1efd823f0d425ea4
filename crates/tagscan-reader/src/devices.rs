//! Enum wrappers for reader driver dispatch.
//!
//! Native `async fn` in traits (RPITIT) are not object-safe, so a
//! `Box<dyn ReaderDriver>` is not available. [`AnyReaderDriver`] gives the
//! binary one concrete driver type to build a session around, with each vendor
//! backend as a variant.
//!
//! # Examples
//!
//! ```
//! use tagscan_reader::devices::AnyReaderDriver;
//! use tagscan_reader::mock::MockDriver;
//! use tagscan_reader::{ReaderConfig, ReaderSession};
//!
//! let (driver, _handle) = MockDriver::with_device("Mock Sled");
//! let session = ReaderSession::new(AnyReaderDriver::from(driver), ReaderConfig::default());
//! assert!(!session.is_connected());
//! ```

use crate::error::DriverResult;
use crate::mock::{MockConnection, MockDriver};
use crate::pipeline::EventSink;
use crate::traits::{ConfigStep, ReaderDriver};
use crate::types::{DeviceHandle, Region};

/// Enum wrapper for reader driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReaderDriver {
    /// Mock driver for development and testing.
    Mock(MockDriver),
}

/// Connection produced by an [`AnyReaderDriver`].
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyConnection {
    Mock(MockConnection),
}

impl From<MockDriver> for AnyReaderDriver {
    fn from(driver: MockDriver) -> Self {
        Self::Mock(driver)
    }
}

impl ReaderDriver for AnyReaderDriver {
    type Connection = AnyConnection;

    async fn discover(&mut self) -> DriverResult<Vec<DeviceHandle>> {
        match self {
            Self::Mock(driver) => driver.discover().await,
        }
    }

    async fn open(&mut self, device: &DeviceHandle) -> DriverResult<AnyConnection> {
        match self {
            Self::Mock(driver) => driver.open(device).await.map(AnyConnection::Mock),
        }
    }

    async fn configure(
        &mut self,
        connection: &mut AnyConnection,
        step: &ConfigStep,
    ) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.configure(connection, step).await
            }
        }
    }

    async fn subscribe(
        &mut self,
        connection: &mut AnyConnection,
        sink: EventSink,
    ) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.subscribe(connection, sink).await
            }
        }
    }

    async fn unsubscribe(&mut self, connection: &mut AnyConnection) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.unsubscribe(connection).await
            }
        }
    }

    async fn start_inventory(&mut self, connection: &mut AnyConnection) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.start_inventory(connection).await
            }
        }
    }

    async fn stop_inventory(&mut self, connection: &mut AnyConnection) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.stop_inventory(connection).await
            }
        }
    }

    async fn close(&mut self, connection: AnyConnection) -> DriverResult<()> {
        match (self, connection) {
            (Self::Mock(driver), AnyConnection::Mock(connection)) => {
                driver.close(connection).await
            }
        }
    }

    async fn supported_regions(&mut self, device: &DeviceHandle) -> DriverResult<Vec<Region>> {
        match self {
            Self::Mock(driver) => driver.supported_regions(device).await,
        }
    }

    async fn set_region(&mut self, device: &DeviceHandle, region: &Region) -> DriverResult<()> {
        match self {
            Self::Mock(driver) => driver.set_region(device, region).await,
        }
    }
}
