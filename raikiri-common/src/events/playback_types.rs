//! Playback-related type definitions
//!
//! Supporting types for controller status, sink addressing and sink directives.

use serde::{Deserialize, Serialize};

/// Controller status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing loaded, or the current item failed to load
    #[default]
    Idle,
    /// Media backend for the current item is being prepared
    Loading,
    /// Current item is playing
    Playing,
    /// Current item is paused
    Paused,
    /// Queue ran past its last item
    Ended,
}

impl PlaybackStatus {
    /// Whether an item is loaded or being loaded
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Loading | PlaybackStatus::Playing | PlaybackStatus::Paused
        )
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "Idle"),
            PlaybackStatus::Loading => write!(f, "Loading"),
            PlaybackStatus::Playing => write!(f, "Playing"),
            PlaybackStatus::Paused => write!(f, "Paused"),
            PlaybackStatus::Ended => write!(f, "Ended"),
        }
    }
}

/// Which of the two shared media elements an event or directive addresses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Audio,
    Video,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Audio => write!(f, "audio"),
            SinkKind::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for SinkKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "audio" => Ok(SinkKind::Audio),
            "video" => Ok(SinkKind::Video),
            other => Err(crate::Error::InvalidInput(format!("unknown sink: {}", other))),
        }
    }
}

/// Instruction for a remote media element
///
/// Sent to the page that owns the native `<audio>`/`<video>` elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SinkDirective {
    Attach { url: String },
    Detach,
    Play,
    Pause,
    Seek { position_secs: f64 },
    SetRate { rate: f64 },
    SetMuted { muted: bool },
}

/// Why the queue changed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueChangeTrigger {
    /// Queue replaced wholesale
    Replaced,
    /// One item removed
    ItemRemoved,
    /// Current position moved
    PositionChanged,
    /// Queue cleared by stop
    Cleared,
}

/// Event reported by a media element
///
/// Mirrors the native element events the controller reacts to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    /// Metadata loaded and playback can start (`loadedmetadata`/`canplay`)
    Ready { duration_secs: Option<f64> },
    /// Position advanced (`timeupdate`)
    TimeUpdate {
        position_secs: f64,
        duration_secs: Option<f64>,
    },
    /// Element started or resumed playing
    Playing,
    /// Element paused on its own (e.g. buffering stall or OS interruption)
    Paused,
    /// Reached the end of the media
    Ended,
    /// Element rejected the source or failed mid-stream
    Error { message: String },
}
