//! # Event Bus System
//!
//! Typed notifications about what the overlay is doing, published on a
//! broadcast channel so hosts, tests and diagnostics can observe playback
//! without reaching into the coordinator.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: one enum per domain (music, effects, zone display)
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: wrapper for consuming events with filtering
//!
//! ```text
//! ┌─────────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ PlaybackCoordinator ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └─────────────────────┘           │ (broadcast│               └────────────┘
//! ┌─────────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ OverlayService      ├──────────>│           ├──────────────>│ Subscriber │
//! └─────────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).ok();
//! assert_eq!(
//!     subscriber.recv().await.unwrap(),
//!     CoreEvent::Playback(PlaybackEvent::Stopped)
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; the service shut down.
//!
//! Emitting with no subscribers returns an error that publishers ignore:
//! events are best-effort.

use bridge_traits::video::PlayerState;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Background music events
    Playback(PlaybackEvent),
    /// Sound effect events
    Effect(EffectEvent),
    /// Zone banner events
    Display(DisplayEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Effect(e) => e.description(),
            CoreEvent::Display(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Effect(EffectEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::BackendReady)
            | CoreEvent::Playback(PlaybackEvent::TrackLoading { .. })
            | CoreEvent::Playback(PlaybackEvent::Stopped) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events about the background music player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The player signalled readiness; commands may now be issued.
    BackendReady,
    /// A track load was issued to the player.
    TrackLoading {
        track_id: String,
        start_seconds: f64,
    },
    /// The already-loaded track was resumed.
    Resumed { track_id: String },
    /// Playback stopped and the loaded media was released.
    Stopped,
    /// The track ended while playback was wanted and was restarted.
    Looped { track_id: String },
    /// The player reported a state change.
    StateChanged { state: PlayerState },
    /// A volume was pushed to the player, as an integer percentage.
    VolumeApplied { percent: u8 },
    /// The player or a command issued to it failed.
    Error {
        /// The track ID if available.
        track_id: Option<String>,
        /// Player error code, when the failure came from the player itself.
        code: Option<i32>,
        /// Human-readable error message.
        message: String,
        /// Whether a later command may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::BackendReady => "Player ready",
            PlaybackEvent::TrackLoading { .. } => "Track loading",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::Looped { .. } => "Track looped",
            PlaybackEvent::StateChanged { .. } => "Player state changed",
            PlaybackEvent::VolumeApplied { .. } => "Volume applied",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Effect Events
// ============================================================================

/// Events about positional sound effects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum EffectEvent {
    /// The effect is decoded and cached.
    Preloaded { sound: String },
    /// A voice was started.
    Played { sound: String, gain: f32 },
    /// Fetching, decoding or starting the effect failed.
    Failed { sound: String, message: String },
}

impl EffectEvent {
    fn description(&self) -> &str {
        match self {
            EffectEvent::Preloaded { .. } => "Effect preloaded",
            EffectEvent::Played { .. } => "Effect played",
            EffectEvent::Failed { .. } => "Effect failed",
        }
    }
}

// ============================================================================
// Display Events
// ============================================================================

/// Events about the area-of-play banner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DisplayEvent {
    ZoneShown {
        zone_name: String,
        player_count: Option<u32>,
    },
    ZoneHidden,
}

impl DisplayEvent {
    fn description(&self) -> &str {
        match self {
            DisplayEvent::ZoneShown { .. } => "Zone banner shown",
            DisplayEvent::ZoneHidden => "Zone banner hidden",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses a broadcast channel internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
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
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let effects = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Effect(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
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

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
