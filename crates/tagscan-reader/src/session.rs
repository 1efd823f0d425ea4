//! Reader session manager.
//!
//! A [`ReaderSession`] owns one driver and walks it through discovery,
//! connection, configuration, inventory and teardown while publishing a
//! [`ReaderState`] and a stream of [`Tag`](crate::types::Tag) reads.
//!
//! # Connect Pipeline
//!
//! ```text
//! discover ──► open ──► configure steps ──► subscribe ──► Connected
//!  (retry)      │            │ optional step fails: ConfigWarning
//!               │            │ required step fails: close, Error
//!               └────────────┴─► region not configured:
//!                                 query regions, set first, resume once
//! ```
//!
//! # Concurrency
//!
//! Operations take `&self`; put the session in an `Arc` to drive it from
//! several tasks. Connect, start and stop never queue behind each other: a
//! call made while another is running returns [`ReaderError::Busy`].
//! Disconnect is the exception. It cancels a connect that is waiting on
//! discovery, then waits for the driver and always completes.
//!
//! # Examples
//!
//! ```
//! use tagscan_reader::mock::MockDriver;
//! use tagscan_reader::{ReaderConfig, ReaderSession, ReaderState, TagReadEvent};
//!
//! #[tokio::main]
//! async fn main() -> tagscan_reader::Result<()> {
//!     let (driver, handle) = MockDriver::with_device("Mock Sled");
//!     let session = ReaderSession::new(driver, ReaderConfig::default());
//!     let mut tags = session.subscribe_tags();
//!
//!     session.connect().await?;
//!     session.start_inventory().await?;
//!     assert_eq!(session.current_state(), ReaderState::Scanning);
//!
//!     handle.emit_tag(TagReadEvent::new("3074257BF7194E4000001A85"));
//!     let tag = tags.recv().await.unwrap();
//!     assert_eq!(tag.display_name(), "GTIN 06141418123456 / 6789");
//!
//!     session.disconnect().await;
//!     assert_eq!(session.current_state(), ReaderState::Disconnected);
//!     Ok(())
//! }
//! ```

use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ReaderConfig;
use crate::error::{ConfigWarning, DriverResult, ReaderError, Result};
use crate::pipeline::{EventSink, TagReceiver, TagStream};
use crate::state::{ReaderState, StatePublisher, StateTransition};
use crate::traits::ReaderDriver;
use crate::types::{DeviceHandle, Region};

/// Outcome of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    /// Reader the session connected to.
    pub device: DeviceHandle,

    /// Region applied during connect, when the reader had none.
    pub region: Option<Region>,

    /// Optional configuration steps the reader rejected.
    pub warnings: Vec<ConfigWarning>,
}

/// Established connection and the sink registered for it.
struct Link<C> {
    device: DeviceHandle,
    connection: C,
    sink: EventSink,
}

struct Inner<D: ReaderDriver> {
    driver: D,
    link: Option<Link<D::Connection>>,
}

/// Connection lifecycle manager for one reader.
pub struct ReaderSession<D: ReaderDriver> {
    inner: Mutex<Inner<D>>,
    state: StatePublisher,
    tags: TagStream,
    config: ReaderConfig,
    /// Cancels the discovery wait of the connect in flight.
    pending: StdMutex<CancellationToken>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D: ReaderDriver> ReaderSession<D> {
    /// Create a disconnected session around `driver`.
    pub fn new(driver: D, config: ReaderConfig) -> Self {
        let tags = TagStream::new(config.tag_buffer_capacity);
        Self {
            inner: Mutex::new(Inner { driver, link: None }),
            state: StatePublisher::new(),
            tags,
            config,
            pending: StdMutex::new(CancellationToken::new()),
        }
    }

    /// Discover a reader, connect, configure it and subscribe to its events.
    ///
    /// Allowed from `Disconnected` and `Error`; from `Error` any leftover
    /// resources are released first.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::AlreadyConnected`] when connected or scanning (state unchanged)
    /// - [`ReaderError::Busy`] while another operation runs (state unchanged)
    /// - [`ReaderError::Cancelled`] when disconnect interrupts the connect, or
    ///   the reader reports a disconnection before it completes
    /// - any other error leaves the session in `Error` with the error's message
    pub async fn connect(&self) -> Result<ConnectReport> {
        let mut inner = self.inner.try_lock().map_err(|_| ReaderError::Busy)?;

        match self.state.current() {
            ReaderState::Connected | ReaderState::Scanning => {
                return Err(ReaderError::AlreadyConnected);
            }
            ReaderState::Error(message) => debug!("Leaving error state: {}", message),
            _ => {}
        }

        // Armed before the first await so a disconnect issued during release
        // still reaches this connect.
        let token = self.arm_cancellation();

        // Leftovers from a failed start or a reader-initiated disconnection.
        self.release(&mut inner).await;
        self.state.mark_disconnected();
        if token.is_cancelled() {
            info!("Connect cancelled before discovery");
            return Err(ReaderError::Cancelled);
        }
        self.state.transition_to(ReaderState::Connecting)?;

        match self.establish(&mut inner, &token).await {
            Ok(report) => {
                if self.state.transition_to(ReaderState::Connected).is_err() {
                    warn!("Reader dropped while connecting");
                    self.release(&mut inner).await;
                    self.state.mark_disconnected();
                    return Err(ReaderError::Cancelled);
                }
                info!(
                    "Connected to {} ({} configuration warnings)",
                    report.device.name,
                    report.warnings.len()
                );
                Ok(report)
            }
            Err(ReaderError::Cancelled) => {
                info!("Connect cancelled");
                self.state.mark_disconnected();
                Err(ReaderError::Cancelled)
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.state.enter_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Start continuous inventory.
    ///
    /// Calling it while already scanning is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::NotConnected`] unless connected (state unchanged)
    /// - [`ReaderError::Busy`] while another operation runs
    /// - a driver failure moves the session to `Error`
    pub async fn start_inventory(&self) -> Result<()> {
        let mut guard = self.inner.try_lock().map_err(|_| ReaderError::Busy)?;
        let inner = &mut *guard;

        match self.state.current() {
            ReaderState::Connected => {}
            ReaderState::Scanning => {
                debug!("Inventory already running");
                return Ok(());
            }
            _ => return Err(ReaderError::NotConnected),
        }
        let Some(link) = inner.link.as_mut() else {
            return Err(ReaderError::NotConnected);
        };

        link.sink.reset_seen();
        if let Err(e) = inner.driver.start_inventory(&mut link.connection).await {
            let error = ReaderError::from(e);
            let message = match &error {
                ReaderError::ChargingSource { .. } => error.to_string(),
                _ => format!("Failed to start scanning: {}", error.detail()),
            };
            error!("{}", message);
            self.state.enter_error(message);
            return Err(error);
        }

        self.state.transition_to(ReaderState::Scanning)?;
        info!("Inventory started on {}", link.device.name);
        Ok(())
    }

    /// Stop continuous inventory.
    ///
    /// The session returns to `Connected` even if the reader rejects the stop
    /// command; the rejection is logged.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::NotConnected`] without an active connection
    /// - [`ReaderError::Busy`] while another operation runs
    pub async fn stop_inventory(&self) -> Result<()> {
        let mut guard = self.inner.try_lock().map_err(|_| ReaderError::Busy)?;
        let inner = &mut *guard;

        if !self.state.current().is_connected() {
            return Err(ReaderError::NotConnected);
        }
        let Some(link) = inner.link.as_mut() else {
            return Err(ReaderError::NotConnected);
        };

        if let Err(e) = inner.driver.stop_inventory(&mut link.connection).await {
            warn!("Stop inventory failed: {}", e);
        }

        self.state.transition_to(ReaderState::Connected)?;
        info!("Inventory stopped");
        Ok(())
    }

    /// Tear down the connection and enter `Disconnected`.
    ///
    /// Idempotent. Every teardown step is best-effort.
    pub async fn disconnect(&self) {
        lock(&self.pending).cancel();

        let mut inner = self.inner.lock().await;
        self.release(&mut inner).await;
        self.state.mark_disconnected();
        info!("Reader session disconnected");
    }

    /// Observe state changes.
    pub fn state(&self) -> watch::Receiver<ReaderState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ReaderState {
        self.state.current()
    }

    pub fn is_connected(&self) -> bool {
        self.state.current().is_connected()
    }

    /// Receive tags read from now on.
    pub fn subscribe_tags(&self) -> TagReceiver {
        self.tags.subscribe()
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.state.history()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn arm_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.pending) = token.clone();
        token
    }

    async fn establish(
        &self,
        inner: &mut Inner<D>,
        token: &CancellationToken,
    ) -> Result<ConnectReport> {
        let device = self.discover(&mut inner.driver, token).await?;

        let mut region = None;
        let warnings = match self.open_link(inner, &device).await {
            Err(e) if e.is_region_not_configured() => {
                warn!("No region configured on {}, applying one", device.name);
                region = Some(self.recover_region(&mut inner.driver, &device).await?);
                self.open_link(inner, &device).await?
            }
            other => other?,
        };

        Ok(ConnectReport {
            device,
            region,
            warnings,
        })
    }

    /// Poll discovery until a reader shows up or attempts run out.
    async fn discover(&self, driver: &mut D, token: &CancellationToken) -> Result<DeviceHandle> {
        let attempts = self.config.discovery_attempts.max(1);

        for attempt in 1..=attempts {
            let devices = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ReaderError::Cancelled),
                result = driver.discover() => result?,
            };

            if let Some(device) = devices.first() {
                info!(
                    "Found {} reader(s) on attempt {}/{}, using {}",
                    devices.len(),
                    attempt,
                    attempts,
                    device.name
                );
                return Ok(device.clone());
            }

            debug!("No readers found (attempt {}/{})", attempt, attempts);
            if attempt < attempts {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ReaderError::Cancelled),
                    _ = tokio::time::sleep(self.config.discovery_interval()) => {}
                }
            }
        }

        Err(ReaderError::DiscoveryExhausted { attempts })
    }

    /// Open, configure and subscribe. A connection that fails part way is
    /// closed before returning.
    async fn open_link(
        &self,
        inner: &mut Inner<D>,
        device: &DeviceHandle,
    ) -> DriverResult<Vec<ConfigWarning>> {
        let mut connection = inner.driver.open(device).await?;
        let sink = EventSink::new(
            self.tags.clone(),
            self.state.clone(),
            self.config.duplicate_policy,
        );

        match self
            .prepare(&mut inner.driver, &mut connection, sink.clone())
            .await
        {
            Ok(warnings) => {
                inner.link = Some(Link {
                    device: device.clone(),
                    connection,
                    sink,
                });
                Ok(warnings)
            }
            Err(e) => {
                sink.cancel();
                if let Err(close_error) = inner.driver.close(connection).await {
                    warn!("Failed to close connection after setup error: {}", close_error);
                }
                Err(e)
            }
        }
    }

    async fn prepare(
        &self,
        driver: &mut D,
        connection: &mut D::Connection,
        sink: EventSink,
    ) -> DriverResult<Vec<ConfigWarning>> {
        let mut warnings = Vec::new();

        for step in self.config.profile.steps() {
            match driver.configure(connection, &step).await {
                Ok(()) => debug!("Applied {} configuration", step.kind()),
                Err(e) if step.is_optional() => {
                    warn!("Skipping {} configuration: {}", step.kind(), e);
                    warnings.push(ConfigWarning::new(step.kind(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        driver.subscribe(connection, sink).await?;
        Ok(warnings)
    }

    /// Apply the first region the reader supports.
    async fn recover_region(&self, driver: &mut D, device: &DeviceHandle) -> Result<Region> {
        let regions = driver
            .supported_regions(device)
            .await
            .map_err(|e| ReaderError::region_recovery(e.to_string()))?;

        let Some(region) = regions.into_iter().next() else {
            return Err(ReaderError::NoSupportedRegions);
        };

        driver
            .set_region(device, &region)
            .await
            .map_err(|e| ReaderError::region_recovery(e.to_string()))?;

        info!("Region set to {} ({})", region.name, region.code);
        Ok(region)
    }

    /// Best-effort teardown of the current link, if any.
    async fn release(&self, inner: &mut Inner<D>) {
        let Some(mut link) = inner.link.take() else {
            return;
        };
        link.sink.cancel();

        if let Err(e) = inner.driver.stop_inventory(&mut link.connection).await {
            debug!("Stop inventory during teardown failed: {}", e);
        }
        if let Err(e) = inner.driver.unsubscribe(&mut link.connection).await {
            debug!("Unsubscribe during teardown failed: {}", e);
        }
        if let Err(e) = inner.driver.close(link.connection).await {
            warn!("Failed to close connection to {}: {}", link.device.name, e);
        }
    }
}

impl<D: ReaderDriver> Drop for ReaderSession<D> {
    fn drop(&mut self) {
        lock(&self.pending).cancel();
        if let Some(link) = &self.inner.get_mut().link {
            link.sink.cancel();
        }
    }
}
