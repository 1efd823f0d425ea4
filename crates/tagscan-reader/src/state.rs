//! Reader connection state machine.
//!
//! # States
//!
//! - `Disconnected`: no reader connection
//! - `Connecting`: discovery and connection setup in progress
//! - `Connected`: configured and subscribed, not reading
//! - `Scanning`: inventory running, tags flowing
//! - `Error(message)`: last operation failed; `message` is user facing
//!
//! # Valid Transitions
//!
//! - Disconnected → Connecting → Connected ⇄ Scanning
//! - any → Error
//! - any → Disconnected
//!
//! The current state is published through a [`tokio::sync::watch`] channel, so
//! observers always see the latest value and never block the session.
//!
//! # Examples
//!
//! ```
//! use tagscan_reader::state::{ReaderState, StatePublisher};
//!
//! let state = StatePublisher::new();
//! let observer = state.subscribe();
//!
//! state.transition_to(ReaderState::Connecting).unwrap();
//! assert_eq!(*observer.borrow(), ReaderState::Connecting);
//!
//! // Scanning needs a connection first.
//! assert!(state.transition_to(ReaderState::Scanning).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{ReaderError, Result};

/// Maximum number of state transitions to keep in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Observable state of a reader session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ReaderState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Scanning,
    Error(String),
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderState::Disconnected => write!(f, "Disconnected"),
            ReaderState::Connecting => write!(f, "Connecting"),
            ReaderState::Connected => write!(f, "Connected"),
            ReaderState::Scanning => write!(f, "Scanning"),
            ReaderState::Error(message) => write!(f, "Error({})", message),
        }
    }
}

impl ReaderState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagscan_reader::ReaderState;
    ///
    /// assert!(ReaderState::Connected.can_transition_to(&ReaderState::Scanning));
    /// assert!(!ReaderState::Disconnected.can_transition_to(&ReaderState::Scanning));
    /// ```
    pub fn can_transition_to(&self, target: &ReaderState) -> bool {
        matches!(
            (self, target),
            // Always reachable
            (_, ReaderState::Disconnected | ReaderState::Error(_))
            // Connect
            | (ReaderState::Disconnected, ReaderState::Connecting)
            | (ReaderState::Connecting, ReaderState::Connected)
            // Inventory
            | (ReaderState::Connected, ReaderState::Scanning)
            | (ReaderState::Scanning, ReaderState::Connected)
        )
    }

    /// Connected or scanning.
    pub fn is_connected(&self) -> bool {
        matches!(self, ReaderState::Connected | ReaderState::Scanning)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReaderState::Error(_))
    }

    /// Error message, when in the error state.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ReaderState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Record of a single state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ReaderState,
    pub to: ReaderState,
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: ReaderState, to: ReaderState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Owner of the current [`ReaderState`].
///
/// Cloning yields another handle to the same state; the session and its event
/// sink share one publisher so a disconnection notification from the driver
/// lands in the same place as session-driven transitions.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    inner: Arc<PublisherInner>,
}

#[derive(Debug)]
struct PublisherInner {
    tx: watch::Sender<ReaderState>,
    history: Mutex<VecDeque<StateTransition>>,
}

impl StatePublisher {
    /// Create a publisher in the `Disconnected` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReaderState::Disconnected);
        Self {
            inner: Arc::new(PublisherInner {
                tx,
                history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY_SIZE)),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> ReaderState {
        self.inner.tx.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ReaderState> {
        self.inner.tx.subscribe()
    }

    /// Move to `next` if the transition is allowed.
    ///
    /// Re-entering the current state is accepted and publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidStateTransition`] and leaves the state
    /// unchanged when the transition is not allowed.
    pub fn transition_to(&self, next: ReaderState) -> Result<()> {
        let mut outcome = Ok(None);

        // Validate and store under the channel lock.
        self.inner.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if !current.can_transition_to(&next) {
                outcome = Err(ReaderError::InvalidStateTransition {
                    from: current.to_string(),
                    to: next.to_string(),
                });
                return false;
            }
            let previous = std::mem::replace(current, next.clone());
            outcome = Ok(Some(StateTransition::new(previous, next.clone())));
            true
        });

        if let Some(transition) = outcome? {
            debug!("Reader state {} -> {}", transition.from, transition.to);
            self.add_to_history(transition);
        }
        Ok(())
    }

    /// Enter the error state with a user facing message.
    pub fn enter_error(&self, message: impl Into<String>) {
        let _ = self.transition_to(ReaderState::Error(message.into()));
    }

    /// Enter the disconnected state.
    pub fn mark_disconnected(&self) {
        let _ = self.transition_to(ReaderState::Disconnected);
    }

    /// Transitions recorded so far, oldest first (at most 100).
    pub fn history(&self) -> Vec<StateTransition> {
        self.lock_history().iter().cloned().collect()
    }

    fn add_to_history(&self, transition: StateTransition) {
        let mut history = self.lock_history();
        history.push_back(transition);
        if history.len() > MAX_HISTORY_SIZE {
            history.pop_front();
        }
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, VecDeque<StateTransition>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}
