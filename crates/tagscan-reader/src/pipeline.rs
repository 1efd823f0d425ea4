//! Tag event pipeline.
//!
//! Drivers call into an [`EventSink`] from their own callback context. The
//! sink turns tag reads into [`Tag`] values and publishes them on a
//! [`TagStream`]; status notifications update the session state.
//!
//! ```text
//! ┌──────────┐  on_tag_read   ┌───────────┐  publish   ┌──────────────┐
//! │ Driver   │───────────────►│ EventSink │───────────►│ TagStream    │──► TagReceiver (UI)
//! │ callback │  on_status     │           │            │ drop-oldest  │──► TagReceiver (log)
//! └──────────┘───────────────►└─────┬─────┘            └──────────────┘
//!                                   │ Disconnection
//!                                   ▼
//!                            StatePublisher
//! ```
//!
//! Every receiver owns a bounded buffer. Publishing never waits: when a
//! buffer is full its oldest tag is discarded and counted, so a slow
//! consumer always sees the most recent reads.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::Stream;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::config::DuplicatePolicy;
use crate::state::StatePublisher;
use crate::traits::{StatusEvent, StatusKind, TagReadEvent};
use crate::types::Tag;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multi-consumer tag channel with drop-oldest overflow.
///
/// Cloning yields another publisher for the same stream. Receivers see only
/// tags published after they subscribed. When the last clone is dropped,
/// receivers drain what they hold and then end.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use tagscan_reader::{Tag, TagReadEvent, pipeline::TagStream};
///
/// let stream = TagStream::new(2);
/// let mut rx = stream.subscribe();
///
/// for id in ["A1", "B2", "C3"] {
///     stream.publish(Tag::from_event(&TagReadEvent::new(id), Utc::now()));
/// }
///
/// assert_eq!(rx.try_recv().unwrap().epc, "B2");
/// assert_eq!(rx.try_recv().unwrap().epc, "C3");
/// assert_eq!(rx.dropped(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TagStream {
    shared: Arc<StreamShared>,
}

#[derive(Debug)]
struct StreamShared {
    capacity: usize,
    subscribers: Mutex<Vec<Weak<Slot>>>,
}

#[derive(Debug)]
struct Slot {
    queue: Mutex<SlotQueue>,
    notify: Notify,
}

#[derive(Debug)]
struct SlotQueue {
    buffer: VecDeque<Tag>,
    dropped: u64,
    closed: bool,
}

impl TagStream {
    /// Create a stream buffering up to `capacity` tags per receiver.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                capacity: capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Register a new receiver.
    pub fn subscribe(&self) -> TagReceiver {
        let slot = Arc::new(Slot {
            queue: Mutex::new(SlotQueue {
                buffer: VecDeque::with_capacity(self.shared.capacity),
                dropped: 0,
                closed: false,
            }),
            notify: Notify::new(),
        });
        lock(&self.shared.subscribers).push(Arc::downgrade(&slot));
        TagReceiver { slot }
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        let mut subscribers = lock(&self.shared.subscribers);
        subscribers.retain(|slot| slot.strong_count() > 0);
        subscribers.len()
    }

    /// Deliver `tag` to every live receiver without blocking.
    ///
    /// Returns the number of receivers the tag reached.
    pub fn publish(&self, tag: Tag) -> usize {
        let mut subscribers = lock(&self.shared.subscribers);
        subscribers.retain(|slot| slot.strong_count() > 0);

        let mut delivered = 0;
        for slot in subscribers.iter().filter_map(Weak::upgrade) {
            {
                let mut queue = lock(&slot.queue);
                if queue.buffer.len() >= self.shared.capacity {
                    queue.buffer.pop_front();
                    queue.dropped += 1;
                }
                queue.buffer.push_back(tag.clone());
            }
            slot.notify.notify_one();
            delivered += 1;
        }
        delivered
    }
}

impl Drop for StreamShared {
    fn drop(&mut self) {
        let subscribers = self
            .subscribers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for slot in subscribers.iter().filter_map(Weak::upgrade) {
            lock(&slot.queue).closed = true;
            slot.notify.notify_one();
        }
    }
}

/// Receiving half of a [`TagStream`].
#[derive(Debug)]
pub struct TagReceiver {
    slot: Arc<Slot>,
}

impl TagReceiver {
    /// Wait for the next tag.
    ///
    /// Returns `None` once the stream is gone and the buffer is empty.
    pub async fn recv(&mut self) -> Option<Tag> {
        loop {
            {
                let mut queue = lock(&self.slot.queue);
                if let Some(tag) = queue.buffer.pop_front() {
                    return Some(tag);
                }
                if queue.closed {
                    return None;
                }
            }
            self.slot.notify.notified().await;
        }
    }

    /// Take the next buffered tag without waiting.
    pub fn try_recv(&mut self) -> Option<Tag> {
        lock(&self.slot.queue).buffer.pop_front()
    }

    /// Tags discarded from this receiver's buffer on overflow.
    pub fn dropped(&self) -> u64 {
        lock(&self.slot.queue).dropped
    }

    /// Tags currently buffered.
    pub fn len(&self) -> usize {
        lock(&self.slot.queue).buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into a [`Stream`] of tags.
    pub fn into_stream(self) -> impl Stream<Item = Tag> + Send + 'static {
        futures::stream::unfold(self, |mut rx| async move {
            let tag = rx.recv().await?;
            Some((tag, rx))
        })
    }
}

/// Callback target handed to a driver on subscribe.
///
/// Clones share state. After [`cancel`](EventSink::cancel) every callback is
/// ignored, so a driver that keeps calling a stale sink after disconnect
/// cannot publish tags or change state.
#[derive(Debug, Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

#[derive(Debug)]
struct SinkInner {
    tags: TagStream,
    state: StatePublisher,
    policy: DuplicatePolicy,
    seen: Mutex<HashSet<String>>,
    active: AtomicBool,
}

impl EventSink {
    pub fn new(tags: TagStream, state: StatePublisher, policy: DuplicatePolicy) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                tags,
                state,
                policy,
                seen: Mutex::new(HashSet::new()),
                active: AtomicBool::new(true),
            }),
        }
    }

    /// Handle a tag read. Returns whether a tag was published.
    pub fn on_tag_read(&self, event: TagReadEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        if event.id.is_empty() {
            trace!("Ignoring tag read without identifier");
            return false;
        }
        if self.inner.policy == DuplicatePolicy::FirstReadPerInventory
            && !lock(&self.inner.seen).insert(event.id.clone())
        {
            return false;
        }

        let tag = Tag::from_event(&event, chrono::Utc::now());
        trace!("Tag read {} rssi {}", tag.epc, tag.rssi);
        self.inner.tags.publish(tag);
        true
    }

    /// Handle a reader status notification.
    pub fn on_status(&self, event: StatusEvent) {
        if !self.is_active() {
            return;
        }
        match &event.kind {
            StatusKind::Disconnection => {
                warn!("Reader reported disconnection");
                self.inner.state.mark_disconnected();
            }
            kind @ (StatusKind::InventoryStarted | StatusKind::InventoryStopped) => {
                debug!("Reader status: {}", kind);
            }
            kind => info!("Reader status: {}", kind),
        }
    }

    /// Ignore all further callbacks.
    pub fn cancel(&self) {
        self.inner.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Forget EPCs seen in the previous inventory run.
    pub fn reset_seen(&self) {
        lock(&self.inner.seen).clear();
    }
}
