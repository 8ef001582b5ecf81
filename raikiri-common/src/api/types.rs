//! Control API request/response types
//!
//! Bodies for the player's HTTP control surface. Index fields that clients send
//! as `-1` for "nothing" are signed here and validated by the player.

use crate::events::SinkEvent;
use crate::media::{LibraryMode, QueueContext, QueueItem};
use serde::{Deserialize, Serialize};

// ========================================
// Queue Requests
// ========================================

/// Replace the queue wholesale
///
/// # Examples
///
/// ```
/// use raikiri_common::api::SetQueueRequest;
///
/// let request: SetQueueRequest = serde_json::from_str(r#"{"items": [], "start_index": -1}"#).unwrap();
/// assert!(request.items.is_empty());
/// assert_eq!(request.start_index, -1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQueueRequest {
    pub items: Vec<QueueItem>,
    /// Index to start from; `-1` (or any value with an empty list) loads nothing
    #[serde(default)]
    pub start_index: i64,
    #[serde(default)]
    pub context: QueueContext,
}

/// Build the queue from a server directory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderQueueRequest {
    pub path: String,
    #[serde(default)]
    pub mode: Option<LibraryMode>,
    /// Include playable files from subfolders
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub shuffle: bool,
    /// Start at this item instead of the first one
    #[serde(default)]
    pub start_path: Option<String>,
}

/// Jump to an absolute queue position
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

// ========================================
// Transport Requests
// ========================================

/// Seek to a percentage of the current item's duration (clamped to 0..=100)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeekRequest {
    pub percent: f64,
}

/// Seek relative to the current position
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeekByRequest {
    pub seconds: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

/// Element event reported by the page that owns a media element
///
/// `attachment` is the id from the `SinkCommand` that attached the source.
///
/// # Examples
///
/// ```
/// use raikiri_common::api::SinkEventReport;
/// use raikiri_common::events::SinkEvent;
///
/// let json = r#"{"attachment": 3, "event": {"event": "ready", "duration_secs": 12.5}}"#;
/// let report: SinkEventReport = serde_json::from_str(json).unwrap();
/// assert_eq!(report.event, SinkEvent::Ready { duration_secs: Some(12.5) });
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkEventReport {
    pub attachment: u64,
    pub event: SinkEvent,
}

// ========================================
// Library Requests
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub mode: Option<LibraryMode>,
}

// ========================================
// Responses
// ========================================

/// Generic status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Queue contents and position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
    pub items: Vec<QueueItem>,
    pub current_index: Option<usize>,
    pub context: QueueContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_queue_request_defaults() {
        let json = r#"{"items": [{"path": "a.jpg", "name": "a.jpg", "media_kind": "image"}]}"#;
        let request: SetQueueRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.start_index, 0);
        assert!(request.context.album.is_none());
    }

    #[test]
    fn test_folder_request_parses_mode() {
        let json = r#"{"path": "/Albums/Live", "mode": "music", "shuffle": true}"#;
        let request: FolderQueueRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.mode, Some(LibraryMode::Music));
        assert!(request.shuffle);
        assert!(!request.recursive);
        assert!(request.start_path.is_none());
    }
}
