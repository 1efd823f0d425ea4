//! Mock reader driver for testing and development.
//!
//! This module provides a simulated UHF reader whose discovery results,
//! faults, regions and event traffic are scripted through a
//! [`MockDriverHandle`], so session behavior can be exercised without a
//! physical sled.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{DriverError, DriverResult};
use crate::pipeline::EventSink;
use crate::traits::{ConfigStep, ConfigStepKind, ReaderDriver, StatusEvent, TagReadEvent};
use crate::types::{DeviceHandle, Region};

/// Driver operation a fault can be scripted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Discover,
    Open,
    Configure(ConfigStepKind),
    Subscribe,
    Unsubscribe,
    StartInventory,
    StopInventory,
    Close,
    SupportedRegions,
    SetRegion,
}

/// Open connection to the mock reader.
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    device: DeviceHandle,
}

impl MockConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<DeviceHandle>,
    empty_discoveries: u32,
    faults: HashMap<MockOperation, VecDeque<DriverError>>,
    regions: Vec<Region>,
    region: Option<Region>,
    require_region: bool,
    sink: Option<EventSink>,
    scanning: bool,
    next_connection_id: u64,
    open_connections: u32,
    applied_steps: Vec<ConfigStep>,
    calls: HashMap<MockOperation, u32>,
}

impl MockState {
    /// Count the call and pop any scripted fault for it.
    fn enter(&mut self, operation: MockOperation) -> DriverResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        match self
            .faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn lock(shared: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock UHF reader driver.
///
/// # Examples
///
/// ```
/// use tagscan_reader::mock::MockDriver;
/// use tagscan_reader::traits::ReaderDriver;
/// use tagscan_reader::DeviceHandle;
///
/// #[tokio::main]
/// async fn main() -> tagscan_reader::DriverResult<()> {
///     let (mut driver, handle) = MockDriver::new();
///     handle.add_device(DeviceHandle::new("Mock Sled"));
///
///     let devices = driver.discover().await?;
///     assert_eq!(devices[0].name, "Mock Sled");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockDriver {
    shared: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create a driver with no devices, paired with its control handle.
    pub fn new() -> (Self, MockDriverHandle) {
        let shared = Arc::new(Mutex::new(MockState::default()));
        let driver = Self {
            shared: Arc::clone(&shared),
        };
        (driver, MockDriverHandle { shared })
    }

    /// Create a driver that discovers one reader named `name`.
    pub fn with_device(name: impl Into<String>) -> (Self, MockDriverHandle) {
        let (driver, handle) = Self::new();
        handle.add_device(DeviceHandle::new(name));
        (driver, handle)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.shared)
    }
}

impl ReaderDriver for MockDriver {
    type Connection = MockConnection;

    async fn discover(&mut self) -> DriverResult<Vec<DeviceHandle>> {
        let mut state = self.state();
        state.enter(MockOperation::Discover)?;
        if state.empty_discoveries > 0 {
            state.empty_discoveries -= 1;
            return Ok(Vec::new());
        }
        Ok(state.devices.clone())
    }

    async fn open(&mut self, device: &DeviceHandle) -> DriverResult<MockConnection> {
        let mut state = self.state();
        state.enter(MockOperation::Open)?;
        if !state.devices.contains(device) {
            return Err(DriverError::transport(format!(
                "Device {} is not reachable",
                device.name
            )));
        }
        if state.require_region && state.region.is_none() {
            return Err(DriverError::region_not_configured());
        }
        state.next_connection_id += 1;
        state.open_connections += 1;
        Ok(MockConnection {
            id: state.next_connection_id,
            device: device.clone(),
        })
    }

    async fn configure(
        &mut self,
        _connection: &mut MockConnection,
        step: &ConfigStep,
    ) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::Configure(step.kind()))?;
        state.applied_steps.push(step.clone());
        Ok(())
    }

    async fn subscribe(
        &mut self,
        _connection: &mut MockConnection,
        sink: EventSink,
    ) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::Subscribe)?;
        state.sink = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&mut self, _connection: &mut MockConnection) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::Unsubscribe)?;
        state.sink = None;
        Ok(())
    }

    async fn start_inventory(&mut self, _connection: &mut MockConnection) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::StartInventory)?;
        state.scanning = true;
        Ok(())
    }

    async fn stop_inventory(&mut self, _connection: &mut MockConnection) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::StopInventory)?;
        state.scanning = false;
        Ok(())
    }

    async fn close(&mut self, _connection: MockConnection) -> DriverResult<()> {
        let mut state = self.state();
        // The connection is consumed either way; a scripted fault only changes
        // what is reported.
        state.open_connections = state.open_connections.saturating_sub(1);
        state.scanning = false;
        state.sink = None;
        state.enter(MockOperation::Close)
    }

    async fn supported_regions(&mut self, _device: &DeviceHandle) -> DriverResult<Vec<Region>> {
        let mut state = self.state();
        state.enter(MockOperation::SupportedRegions)?;
        Ok(state.regions.clone())
    }

    async fn set_region(&mut self, _device: &DeviceHandle, region: &Region) -> DriverResult<()> {
        let mut state = self.state();
        state.enter(MockOperation::SetRegion)?;
        if !state.regions.contains(region) {
            return Err(DriverError::invalid_usage(format!(
                "Region {} is not supported",
                region.code
            )));
        }
        state.region = Some(region.clone());
        Ok(())
    }
}

/// Handle for scripting and inspecting a [`MockDriver`].
///
/// Clones control the same driver.
///
/// # Examples
///
/// ```
/// use tagscan_reader::error::{DriverError, VendorCode};
/// use tagscan_reader::mock::{MockDriver, MockOperation};
/// use tagscan_reader::traits::ReaderDriver;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut driver, handle) = MockDriver::with_device("Mock Sled");
///     handle.fail_next(
///         MockOperation::Discover,
///         DriverError::operation_failure(VendorCode::Other(1), "radio busy"),
///     );
///
///     assert!(driver.discover().await.is_err());
///     assert!(driver.discover().await.is_ok());
///     assert_eq!(handle.calls(MockOperation::Discover), 2);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    shared: Arc<Mutex<MockState>>,
}

impl MockDriverHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.shared)
    }

    /// Make a reader discoverable.
    pub fn add_device(&self, device: DeviceHandle) {
        self.state().devices.push(device);
    }

    /// Remove every discoverable reader.
    pub fn clear_devices(&self) {
        self.state().devices.clear();
    }

    /// Make the next `count` discovery calls return no readers.
    pub fn set_empty_discoveries(&self, count: u32) {
        self.state().empty_discoveries = count;
    }

    /// Fail the next call of `operation` with `error`. Faults queue up.
    pub fn fail_next(&self, operation: MockOperation, error: DriverError) {
        self.state()
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Regions the reader reports as supported.
    pub fn set_supported_regions(&self, regions: Vec<Region>) {
        self.state().regions = regions;
    }

    /// Make open fail with a region fault until a region is set.
    pub fn require_region(&self) {
        let mut state = self.state();
        state.require_region = true;
        state.region = None;
    }

    pub fn current_region(&self) -> Option<Region> {
        self.state().region.clone()
    }

    /// Deliver a tag read to the subscribed sink.
    ///
    /// Returns whether a tag was published.
    pub fn emit_tag(&self, event: TagReadEvent) -> bool {
        match self.sink() {
            Some(sink) => sink.on_tag_read(event),
            None => false,
        }
    }

    /// Deliver reads for each identifier in order. Returns how many published.
    pub fn emit_tags<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter()
            .map(|id| self.emit_tag(TagReadEvent::new(id)))
            .filter(|published| *published)
            .count()
    }

    /// Deliver a status notification. Returns false with no subscription.
    pub fn emit_status(&self, event: StatusEvent) -> bool {
        match self.sink() {
            Some(sink) => {
                sink.on_status(event);
                true
            }
            None => false,
        }
    }

    /// Simulate the reader dropping the link.
    pub fn drop_link(&self) -> bool {
        let delivered = self.emit_status(StatusEvent::disconnection());
        self.state().scanning = false;
        delivered
    }

    // Sink is cloned out so callbacks run without the mock lock held.
    fn sink(&self) -> Option<EventSink> {
        self.state().sink.clone()
    }

    pub fn has_subscription(&self) -> bool {
        self.state().sink.is_some()
    }

    pub fn is_scanning(&self) -> bool {
        self.state().scanning
    }

    pub fn open_connections(&self) -> u32 {
        self.state().open_connections
    }

    /// Number of times `operation` was called.
    pub fn calls(&self, operation: MockOperation) -> u32 {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Configuration steps applied successfully, in order.
    pub fn applied_steps(&self) -> Vec<ConfigStep> {
        self.state().applied_steps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DuplicatePolicy, ReaderProfile};
    use crate::error::VendorCode;
    use crate::pipeline::TagStream;
    use crate::state::StatePublisher;

    fn region(code: &str) -> Region {
        Region::new(code, code)
    }

    #[tokio::test]
    async fn test_discover_empty_then_devices() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        handle.set_empty_discoveries(2);

        assert!(driver.discover().await.unwrap().is_empty());
        assert!(driver.discover().await.unwrap().is_empty());
        assert_eq!(driver.discover().await.unwrap().len(), 1);
        assert_eq!(handle.calls(MockOperation::Discover), 3);
    }

    #[tokio::test]
    async fn test_open_and_close_track_connections() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        let device = DeviceHandle::new("Sled");

        let connection = driver.open(&device).await.unwrap();
        assert_eq!(connection.id(), 1);
        assert_eq!(connection.device(), &device);
        assert_eq!(handle.open_connections(), 1);

        driver.close(connection).await.unwrap();
        assert_eq!(handle.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_open_unknown_device_fails() {
        let (mut driver, _handle) = MockDriver::new();
        let result = driver.open(&DeviceHandle::new("Ghost")).await;
        assert!(matches!(result, Err(DriverError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_faults_are_one_shot_and_queued() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        let device = DeviceHandle::new("Sled");
        handle.fail_next(MockOperation::Open, DriverError::transport("first"));
        handle.fail_next(MockOperation::Open, DriverError::transport("second"));

        assert_eq!(
            driver.open(&device).await.unwrap_err(),
            DriverError::transport("first")
        );
        assert_eq!(
            driver.open(&device).await.unwrap_err(),
            DriverError::transport("second")
        );
        assert!(driver.open(&device).await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_fault_per_step() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        let mut connection = driver.open(&DeviceHandle::new("Sled")).await.unwrap();
        handle.fail_next(
            MockOperation::Configure(ConfigStepKind::Antenna),
            DriverError::operation_failure(VendorCode::Other(5), "power out of range"),
        );

        let mut failures = 0;
        for step in ReaderProfile::default().steps() {
            if driver.configure(&mut connection, &step).await.is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(handle.applied_steps().len(), 3);
    }

    #[tokio::test]
    async fn test_region_requirement() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        let device = DeviceHandle::new("Sled");
        handle.require_region();
        handle.set_supported_regions(vec![region("USA"), region("EU")]);

        let error = driver.open(&device).await.unwrap_err();
        assert!(error.is_region_not_configured());

        let regions = driver.supported_regions(&device).await.unwrap();
        driver.set_region(&device, &regions[0]).await.unwrap();
        assert_eq!(handle.current_region(), Some(region("USA")));
        assert!(driver.open(&device).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_unsupported_region_fails() {
        let (mut driver, _handle) = MockDriver::with_device("Sled");
        let result = driver
            .set_region(&DeviceHandle::new("Sled"), &region("JP"))
            .await;
        assert!(matches!(result, Err(DriverError::InvalidUsage { .. })));
    }

    #[tokio::test]
    async fn test_emit_requires_subscription() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        assert!(!handle.emit_tag(TagReadEvent::new("E200")));

        let stream = TagStream::new(10);
        let mut rx = stream.subscribe();
        let sink = EventSink::new(stream, StatePublisher::new(), DuplicatePolicy::PassThrough);

        let mut connection = driver.open(&DeviceHandle::new("Sled")).await.unwrap();
        driver.subscribe(&mut connection, sink).await.unwrap();
        assert!(handle.has_subscription());

        assert_eq!(handle.emit_tags(["E200", "E201"]), 2);
        assert_eq!(rx.try_recv().unwrap().epc, "E200");

        driver.unsubscribe(&mut connection).await.unwrap();
        assert!(!handle.emit_tag(TagReadEvent::new("E202")));
    }

    #[tokio::test]
    async fn test_inventory_flags() {
        let (mut driver, handle) = MockDriver::with_device("Sled");
        let mut connection = driver.open(&DeviceHandle::new("Sled")).await.unwrap();

        driver.start_inventory(&mut connection).await.unwrap();
        assert!(handle.is_scanning());
        driver.stop_inventory(&mut connection).await.unwrap();
        assert!(!handle.is_scanning());
    }
}
