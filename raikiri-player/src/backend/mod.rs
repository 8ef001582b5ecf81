//! Media server collaborators
//!
//! The player never touches files or transcoders itself; listings, stream
//! sessions, uploads and re-index requests all go through [`MediaBackend`].
//! The production implementation is [`HttpBackend`]; tests substitute
//! in-process mocks.

mod http;

pub use http::HttpBackend;

use crate::error::Result;
use async_trait::async_trait;
use raikiri_common::media::{BrowseListing, ListEntry};
use raikiri_common::LibraryMode;
use serde::{Deserialize, Serialize};

/// An open remote transcode for one video item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub session_id: String,
    /// Playable stream locator, already resolved against the server base URL
    pub media_url: String,
    /// Server-reported duration; authoritative over the element's own value
    pub duration_hint: Option<f64>,
}

/// File to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Raw directory listing in server order
    async fn list(&self, path: &str, mode: LibraryMode, recursive: bool) -> Result<Vec<ListEntry>>;

    /// Ask the server to start a stream session for `path`
    async fn open_stream(&self, path: &str, mode: LibraryMode) -> Result<PlaybackSession>;

    /// Release a stream session; the server tolerates unknown ids
    async fn close_stream(&self, session_id: &str) -> Result<()>;

    /// Upload files into `path`; `false` when the server rejected them
    async fn upload(&self, files: Vec<UploadFile>, path: &str, mode: LibraryMode) -> Result<bool>;

    /// Trigger a library re-index
    async fn sync(&self) -> Result<()>;

    /// Absolute URL of a file's raw content
    fn content_url(&self, path: &str, mode: LibraryMode) -> String;

    /// Absolute form of a server-relative URL (stream locators, thumbnails)
    fn resolve_url(&self, url: &str) -> String;

    /// Directory listing grouped for display
    async fn browse(&self, path: &str, mode: LibraryMode) -> Result<BrowseListing> {
        let entries = self.list(path, mode, false).await?;
        Ok(BrowseListing::from_entries(path, entries))
    }

    /// Recursive listing filtered by case-insensitive name match
    async fn search(&self, query: &str, mode: LibraryMode) -> Result<Vec<ListEntry>> {
        let needle = query.trim().to_lowercase();
        let entries = self.list("/", mode, true).await?;
        if needle.is_empty() {
            return Ok(entries);
        }
        Ok(entries
            .into_iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .collect())
    }
}
