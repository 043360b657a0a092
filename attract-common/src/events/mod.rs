//! Event types for the Attract event system
//!
//! Provides the shared event definitions and the EventBus that replaces
//! per-callback delegates between the controller, the session and whatever
//! drives the display.

mod playback_types;

pub use playback_types::{DisplaySurface, PlaybackState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Attract event types
///
/// Events are broadcast via EventBus and can be serialized for an external
/// display process (one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Debounced occupancy flipped
    PresenceChanged {
        /// True when at least one person is in range
        occupied: bool,
        /// Raw in-range count on the frame that flipped the status
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Controller moved between phases
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media engine was told to play
    ///
    /// Fires once per start, after any start delay has elapsed.
    PlaybackStarted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Fade-to-silence completed and the media engine was stopped
    PlaybackStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed during a fade
    VolumeChanged {
        volume: f64,
    },

    /// Presence persisted without playback and a start was forced
    StallRecovered {
        /// How long presence had been seen without playback
        waited_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Display should reset the video area opacity to full
    OpacityReset,

    /// Display should switch its visible surface
    SurfaceChanged {
        surface: DisplaySurface,
    },

    /// Human-readable debug text (current raw count)
    DebugInfo {
        text: String,
    },

    /// Debug overlay shown or hidden
    DebugVisibilityChanged {
        visible: bool,
    },

    /// Demo mode toggled
    DemoModeChanged {
        enabled: bool,
    },

    /// Debounce window length changed
    BufferLengthChanged {
        buffer_len: usize,
    },

    /// Start delay changed
    PlayDelayChanged {
        delay_secs: u64,
    },

    /// Media source opened
    MediaOpened {
        path: String,
    },

    /// Media reached its end
    MediaEnded,
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use attract_common::events::{EventBus, PlayerEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(PlayerEvent::MediaEnded).ok();
/// assert_eq!(rx.try_recv().unwrap(), PlayerEvent::MediaEnded);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
