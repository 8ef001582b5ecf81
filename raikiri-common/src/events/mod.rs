//! Event types for the Raikiri event system
//!
//! Provides the shared `PlayerEvent` definitions and the `EventBus` used to fan
//! them out to SSE clients, the now-playing integration and tests.

mod playback_types;

pub use playback_types::{PlaybackStatus, QueueChangeTrigger, SinkDirective, SinkEvent, SinkKind};

use crate::media::{MediaKind, QueueContext, QueueItem};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Controller status changed
    ///
    /// Triggers:
    /// - SSE: Update transport controls
    /// - Now playing: Mirror transport state
    PlaybackStateChanged {
        old_state: PlaybackStatus,
        new_state: PlaybackStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue item became current and started loading
    ///
    /// Triggers:
    /// - SSE: Update now-playing panel
    /// - Now playing: Publish metadata
    ItemStarted {
        index: usize,
        item: QueueItem,
        context: QueueContext,
        /// Resolved thumbnail URL, if the item has one
        artwork_url: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Position update for time-based media
    ///
    /// Emitted on every element `timeupdate` and once on play/pause/seek.
    PlaybackProgress {
        path: String,
        kind: MediaKind,
        position_secs: f64,
        /// Authoritative duration, when known
        duration_secs: Option<f64>,
        /// Effective rate (0.0 while paused)
        rate: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents or position changed
    QueueChanged {
        paths: Vec<String>,
        current_index: Option<usize>,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current item could not be loaded
    ///
    /// The controller stays on the item in `Idle`; the UI marks it failed.
    PlaybackLoadError {
        index: usize,
        path: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stream session became live for the current video
    SessionOpened {
        session_id: String,
        path: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stream session was released (live or superseded)
    SessionClosed {
        session_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Mute state changed
    MutedChanged {
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Instruction for a remote media element
    ///
    /// `attachment` must be echoed back on element event reports so stale
    /// events from a previous item can be discarded.
    SinkCommand {
        sink: SinkKind,
        attachment: u64,
        directive: SinkDirective,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Stable event name (SSE `event:` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::ItemStarted { .. } => "ItemStarted",
            PlayerEvent::PlaybackProgress { .. } => "PlaybackProgress",
            PlayerEvent::QueueChanged { .. } => "QueueChanged",
            PlayerEvent::PlaybackLoadError { .. } => "PlaybackLoadError",
            PlayerEvent::SessionOpened { .. } => "SessionOpened",
            PlayerEvent::SessionClosed { .. } => "SessionClosed",
            PlayerEvent::MutedChanged { .. } => "MutedChanged",
            PlayerEvent::SinkCommand { .. } => "SinkCommand",
        }
    }
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
/// use raikiri_common::events::{EventBus, PlayerEvent, PlaybackStatus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlayerEvent::PlaybackStateChanged {
///     old_state: PlaybackStatus::Idle,
///     new_state: PlaybackStatus::Loading,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(PlayerEvent::PlaybackStateChanged { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }
}
