//! Test helper modules for raikiri-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockBackend: in-process media server with controllable stream opens
//! - RecordingSink: media element double that records directives
//! - TestPlayer: controller wired to both

#![allow(dead_code)]

pub mod mock_backend;
pub mod recording_sink;
pub mod test_player;

pub use mock_backend::MockBackend;
pub use recording_sink::{RecordingSink, SinkCall, SinkRemote};
pub use test_player::{audio, image, video, TestPlayer, ELEMENT_DURATION};

use raikiri_common::media::{EntryType, ListEntry};

/// Listing row for `path` under the mock server
pub fn entry(path: &str, entry_type: EntryType) -> ListEntry {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    ListEntry {
        name,
        path: path.to_string(),
        entry_type,
        size: "1 MB".to_string(),
        thumb: None,
        modified: None,
    }
}
