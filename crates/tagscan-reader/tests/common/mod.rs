//! Shared helpers for reader session integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tagscan_reader::mock::{MockConnection, MockDriver, MockDriverHandle};
use tagscan_reader::{
    ConfigStep, DeviceHandle, DriverResult, EventSink, ReaderConfig, ReaderDriver, ReaderSession,
    Region, StatusEvent,
};

pub type MockSession = Arc<ReaderSession<MockDriver>>;

/// Session around a mock driver that discovers one reader.
pub fn mock_session() -> (MockSession, MockDriverHandle) {
    mock_session_with(ReaderConfig::default())
}

pub fn mock_session_with(config: ReaderConfig) -> (MockSession, MockDriverHandle) {
    let (driver, handle) = MockDriver::with_device("Mock Sled");
    (Arc::new(ReaderSession::new(driver, config)), handle)
}

/// Session around a mock driver that never discovers anything.
pub fn empty_session() -> (MockSession, MockDriverHandle) {
    let (driver, handle) = MockDriver::new();
    (
        Arc::new(ReaderSession::new(driver, ReaderConfig::default())),
        handle,
    )
}

/// Session already connected and scanning.
pub async fn scanning_session(config: ReaderConfig) -> (MockSession, MockDriverHandle) {
    let (session, handle) = mock_session_with(config);
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    (session, handle)
}

pub fn regions() -> Vec<Region> {
    vec![
        Region::new("USA", "United States"),
        Region::new("EU", "European Union"),
    ]
}

/// Distinct SGTIN-96 EPC for each index.
pub fn epc(index: u32) -> String {
    format!("3074257BF7194E40{index:08X}")
}

/// Mock driver with timing and event quirks layered on top.
#[derive(Debug)]
pub struct ScriptedDriver {
    inner: MockDriver,
    close_delay: Option<Duration>,
    drop_on_subscribe: bool,
}

impl ScriptedDriver {
    /// Closing a connection takes `delay`.
    pub fn slow_close(delay: Duration) -> (Self, MockDriverHandle) {
        let (inner, handle) = MockDriver::with_device("Mock Sled");
        let driver = Self {
            inner,
            close_delay: Some(delay),
            drop_on_subscribe: false,
        };
        (driver, handle)
    }

    /// The reader reports a disconnection as soon as events are subscribed.
    pub fn drop_on_subscribe() -> (Self, MockDriverHandle) {
        let (inner, handle) = MockDriver::with_device("Mock Sled");
        let driver = Self {
            inner,
            close_delay: None,
            drop_on_subscribe: true,
        };
        (driver, handle)
    }
}

impl ReaderDriver for ScriptedDriver {
    type Connection = MockConnection;

    async fn discover(&mut self) -> DriverResult<Vec<DeviceHandle>> {
        self.inner.discover().await
    }

    async fn open(&mut self, device: &DeviceHandle) -> DriverResult<MockConnection> {
        self.inner.open(device).await
    }

    async fn configure(
        &mut self,
        connection: &mut MockConnection,
        step: &ConfigStep,
    ) -> DriverResult<()> {
        self.inner.configure(connection, step).await
    }

    async fn subscribe(
        &mut self,
        connection: &mut MockConnection,
        sink: EventSink,
    ) -> DriverResult<()> {
        self.inner.subscribe(connection, sink.clone()).await?;
        if self.drop_on_subscribe {
            sink.on_status(StatusEvent::disconnection());
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, connection: &mut MockConnection) -> DriverResult<()> {
        self.inner.unsubscribe(connection).await
    }

    async fn start_inventory(&mut self, connection: &mut MockConnection) -> DriverResult<()> {
        self.inner.start_inventory(connection).await
    }

    async fn stop_inventory(&mut self, connection: &mut MockConnection) -> DriverResult<()> {
        self.inner.stop_inventory(connection).await
    }

    async fn close(&mut self, connection: MockConnection) -> DriverResult<()> {
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.close(connection).await
    }

    async fn supported_regions(&mut self, device: &DeviceHandle) -> DriverResult<Vec<Region>> {
        self.inner.supported_regions(device).await
    }

    async fn set_region(&mut self, device: &DeviceHandle, region: &Region) -> DriverResult<()> {
        self.inner.set_region(device, region).await
    }
}

pub fn scripted_session(
    (driver, handle): (ScriptedDriver, MockDriverHandle),
) -> (Arc<ReaderSession<ScriptedDriver>>, MockDriverHandle) {
    (
        Arc::new(ReaderSession::new(driver, ReaderConfig::default())),
        handle,
    )
}
