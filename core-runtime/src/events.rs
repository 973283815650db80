//! # Event Bus System
//!
//! Broadcasts tone cache activity to any number of observers using
//! `tokio::sync::broadcast`. Hosts use it to drive UI state (a "loading"
//! spinner, a play/pause toggle) without polling the cache.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for cache lifecycle and per-tone activity
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    emit     ┌───────────┐   subscribe   ┌────────────┐
//! │ ToneCache ops   ├────────────>│           ├──────────────>│ Subscriber │
//! └─────────────────┘             │ EventBus  │               └────────────┘
//! ┌─────────────────┐    emit     │ (broadcast│   subscribe   ┌────────────┐
//! │ Completion task ├────────────>│  channel) ├──────────────>│ Subscriber │
//! └─────────────────┘             └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ToneEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(16);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Tone(ToneEvent::Loaded {
//!         name: "ring.wav".to_string(),
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Tone loaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns an error which publishers are free
//! to ignore; the cache never fails an operation because nobody is listening.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Cache-wide lifecycle transitions
    Lifecycle(LifecycleEvent),
    /// Per-tone load and playback activity
    Tone(ToneEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Lifecycle(e) => e.description(),
            CoreEvent::Tone(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Tone(ToneEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Lifecycle(_) => EventSeverity::Info,
            CoreEvent::Tone(ToneEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Name of the tone this event concerns, if any.
    pub fn tone_name(&self) -> Option<&str> {
        match self {
            CoreEvent::Tone(e) => e.name(),
            CoreEvent::Lifecycle(_) => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// Cache activation and teardown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// The cache was initialized.
    Initialized {
        /// Maximum number of tones the cache will hold.
        capacity: usize,
    },
    /// The cache was terminated and every entry dropped.
    Terminated {
        /// Number of entries that were registered at teardown.
        released: usize,
    },
}

impl LifecycleEvent {
    fn description(&self) -> &str {
        match self {
            LifecycleEvent::Initialized { .. } => "Tone cache initialized",
            LifecycleEvent::Terminated { .. } => "Tone cache terminated",
        }
    }
}

// ============================================================================
// Tone Events
// ============================================================================

/// Load and playback activity for a single tone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ToneEvent {
    /// A platform load was issued.
    LoadStarted {
        name: String,
        /// Raw mixer handle assigned to the load.
        handle: u32,
    },
    /// The platform finished loading the tone.
    Loaded { name: String },
    /// The platform failed to load the tone; the entry was removed.
    LoadFailed {
        name: String,
        /// Human-readable error message.
        message: String,
    },
    /// The tone was released by the caller.
    Released { name: String },
    /// The tone became the active playback.
    PlaybackStarted {
        name: String,
        looping: bool,
        volume: f32,
        rate: f32,
    },
    /// The active tone was paused.
    PlaybackPaused { name: String },
    /// Global volume changed.
    VolumeChanged { volume: f32 },
    /// Global playback rate changed.
    RateChanged {
        rate: f32,
        /// Whether the rate lies inside the supported range.
        in_range: bool,
    },
}

impl ToneEvent {
    fn description(&self) -> &str {
        match self {
            ToneEvent::LoadStarted { .. } => "Tone load started",
            ToneEvent::Loaded { .. } => "Tone loaded",
            ToneEvent::LoadFailed { .. } => "Tone load failed",
            ToneEvent::Released { .. } => "Tone released",
            ToneEvent::PlaybackStarted { .. } => "Tone playback started",
            ToneEvent::PlaybackPaused { .. } => "Tone playback paused",
            ToneEvent::VolumeChanged { .. } => "Volume changed",
            ToneEvent::RateChanged { .. } => "Playback rate changed",
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            ToneEvent::LoadStarted { name, .. }
            | ToneEvent::Loaded { name }
            | ToneEvent::LoadFailed { name, .. }
            | ToneEvent::Released { name }
            | ToneEvent::PlaybackStarted { name, .. }
            | ToneEvent::PlaybackPaused { name } => Some(name),
            ToneEvent::VolumeChanged { .. } | ToneEvent::RateChanged { .. } => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by the cache and its observers.
///
/// Cloning the bus yields another publisher on the same channel. Each
/// [`EventBus::subscribe`] call gets its own buffer of `capacity` events;
/// a subscriber that falls further behind sees `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Publish `event`, returning how many subscribers will see it.
    ///
    /// Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscriber that skips events rejected by a predicate.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let ring_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.tone_name() == Some("ring.wav"));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Replace the predicate events must satisfy.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Wait for the next accepted event.
    ///
    /// Lag and closure are reported as by `broadcast::Receiver::recv`.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event already buffered, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
