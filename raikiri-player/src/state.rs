//! Shared playback state
//!
//! Snapshots published by the playback controller for readers that must not
//! wait on it (HTTP handlers, the SSE stream). Only the controller writes.

use raikiri_common::api::QueueResponse;
use raikiri_common::events::{EventBus, PlaybackStatus, PlayerEvent, SinkKind};
use raikiri_common::{MediaKind, QueueContext, QueueItem};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// Controller state as seen from outside
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    /// Kind of the current item
    pub kind: Option<MediaKind>,
    /// Position in seconds (0 for images)
    pub current_time: f64,
    /// Authoritative duration, when known
    pub duration: Option<f64>,
    pub is_muted: bool,
    pub current_index: Option<usize>,
    pub queue_len: usize,
    pub current_item: Option<QueueItem>,
    /// Why the current item failed to load
    pub last_error: Option<String>,
    pub audio_sink: SinkView,
    pub video_sink: SinkView,
}

impl PlaybackState {
    pub fn sink(&self, kind: SinkKind) -> &SinkView {
        match kind {
            SinkKind::Audio => &self.audio_sink,
            SinkKind::Video => &self.video_sink,
        }
    }
}

/// What an element should currently hold
///
/// A page that missed `SinkCommand`s compares this with its element and
/// re-attaches when the attachment differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkView {
    pub attachment: Option<u64>,
    pub url: Option<String>,
    /// Last play/pause directive was play
    pub playing: bool,
}

/// Shared state accessible by all components
pub struct SharedState {
    playback: RwLock<PlaybackState>,
    queue: RwLock<QueueResponse>,
    events: EventBus,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            playback: RwLock::new(PlaybackState::default()),
            queue: RwLock::new(QueueResponse {
                items: Vec::new(),
                current_index: None,
                context: QueueContext::default(),
            }),
            events: EventBus::new(event_capacity),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn get_playback_state(&self) -> PlaybackState {
        self.playback.read().await.clone()
    }

    pub async fn set_playback_state(&self, state: PlaybackState) {
        *self.playback.write().await = state;
    }

    pub async fn get_queue(&self) -> QueueResponse {
        self.queue.read().await.clone()
    }

    pub async fn set_queue(&self, queue: QueueResponse) {
        *self.queue.write().await = queue;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(1000)
    }
}
