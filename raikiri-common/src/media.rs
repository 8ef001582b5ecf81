//! Media and library types
//!
//! Wire types for directory listings plus the queue item model used by the
//! playback controller. Listing entries come from the media server; queue items
//! are derived from them and never patched in place.

use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "avif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi", "m4v", "ts"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus", "wma"];

/// Kind of a queue item
///
/// Closed set; every component dispatches on this enum instead of comparing
/// type strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Other,
}

impl MediaKind {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Self {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return MediaKind::Other,
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Other
        }
    }

    /// Whether the player can render this kind at all
    pub fn is_playable(self) -> bool {
        !matches!(self, MediaKind::Other)
    }

    /// Whether playback position and duration are meaningful
    pub fn is_time_based(self) -> bool {
        matches!(self, MediaKind::Audio | MediaKind::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// Library root the server serves content from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryMode {
    #[default]
    Files,
    Music,
}

impl LibraryMode {
    /// Query parameter value understood by the server
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryMode::Files => "files",
            LibraryMode::Music => "music",
        }
    }

    /// Artist label shown by the now-playing integration
    pub fn artist_label(self) -> &'static str {
        match self {
            LibraryMode::Files => "Media",
            LibraryMode::Music => "Raikiri Music",
        }
    }
}

impl std::str::FromStr for LibraryMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "files" => Ok(LibraryMode::Files),
            "music" => Ok(LibraryMode::Music),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown library mode: {}",
                other
            ))),
        }
    }
}

/// Entry type as reported by the listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Folder,
    Image,
    Video,
    Audio,
    Other,
}

impl EntryType {
    /// Media kind for files; `None` for folders
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            EntryType::Folder => None,
            EntryType::Image => Some(MediaKind::Image),
            EntryType::Video => Some(MediaKind::Video),
            EntryType::Audio => Some(MediaKind::Audio),
            EntryType::Other => Some(MediaKind::Other),
        }
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    /// Path relative to the library root
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

impl ListEntry {
    /// Queue item for a playable file entry
    pub fn to_queue_item(&self) -> Option<QueueItem> {
        let kind = self.entry_type.media_kind()?;
        if !kind.is_playable() {
            return None;
        }
        Some(QueueItem {
            path: self.path.clone(),
            name: self.name.clone(),
            media_kind: kind,
            thumbnail_path: self.thumb.clone(),
        })
    }
}

/// Navigation crumb for a listing path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

impl Breadcrumb {
    /// Cumulative crumbs for `path`, root first
    ///
    /// `"/a/b"` yields `/`, `/a`, `/a/b`.
    pub fn trail(path: &str) -> Vec<Breadcrumb> {
        let mut crumbs = vec![Breadcrumb {
            name: "/".to_string(),
            path: "/".to_string(),
        }];

        let mut built = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            built.push('/');
            built.push_str(part);
            crumbs.push(Breadcrumb {
                name: part.to_string(),
                path: built.clone(),
            });
        }
        crumbs
    }
}

/// Directory listing grouped by entry type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowseListing {
    pub folders: Vec<ListEntry>,
    pub images: Vec<ListEntry>,
    pub videos: Vec<ListEntry>,
    pub audios: Vec<ListEntry>,
    pub others: Vec<ListEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Playable entries in listing order, for queue building
    #[serde(default)]
    pub playable: Vec<QueueItem>,
}

impl BrowseListing {
    /// Group raw listing entries, preserving the server's ordering
    pub fn from_entries(path: &str, entries: Vec<ListEntry>) -> Self {
        let mut listing = BrowseListing {
            breadcrumbs: Breadcrumb::trail(path),
            ..Default::default()
        };

        for entry in entries {
            if let Some(item) = entry.to_queue_item() {
                listing.playable.push(item);
            }
            match entry.entry_type {
                EntryType::Folder => listing.folders.push(entry),
                EntryType::Image => listing.images.push(entry),
                EntryType::Video => listing.videos.push(entry),
                EntryType::Audio => listing.audios.push(entry),
                EntryType::Other => listing.others.push(entry),
            }
        }
        listing
    }
}

/// One playable entry in a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Opaque server-relative identifier, unique within a queue
    pub path: String,
    /// Display label
    pub name: String,
    pub media_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
}

impl QueueItem {
    pub fn new(path: impl Into<String>, name: impl Into<String>, media_kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            media_kind,
            thumbnail_path: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_path: impl Into<String>) -> Self {
        self.thumbnail_path = Some(thumbnail_path.into());
        self
    }
}

/// Display context a queue was built from
///
/// Surfaces as the logical "album" and "artist" in now-playing metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueContext {
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

impl QueueContext {
    /// Context for a queue built from a directory of `mode`
    pub fn for_directory(path: &str, mode: LibraryMode) -> Self {
        Self {
            album: Some(path.to_string()),
            artist: Some(mode.artist_label().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_file_name() {
        assert_eq!(MediaKind::from_file_name("holiday.JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_file_name("movie.mkv"), MediaKind::Video);
        assert_eq!(MediaKind::from_file_name("song.flac"), MediaKind::Audio);
        assert_eq!(MediaKind::from_file_name("notes.txt"), MediaKind::Other);
        assert_eq!(MediaKind::from_file_name("README"), MediaKind::Other);
    }

    #[test]
    fn test_breadcrumb_trail() {
        let crumbs = Breadcrumb::trail("/Movies/2024/");
        let paths: Vec<&str> = crumbs.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/Movies", "/Movies/2024"]);
        assert_eq!(crumbs[2].name, "2024");

        assert_eq!(Breadcrumb::trail("/").len(), 1);
    }

    #[test]
    fn test_listing_entry_deserializes_server_shape() {
        let json = r#"{"name":"a.mp4","path":"dir/a.mp4","type":"video","size":"1.2 GB","thumb":"dir/.thumbs/a.jpg"}"#;
        let entry: ListEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.entry_type, EntryType::Video);
        assert_eq!(entry.thumb.as_deref(), Some("dir/.thumbs/a.jpg"));
        assert!(entry.modified.is_none());
    }

    #[test]
    fn test_browse_listing_groups_and_keeps_playable_order() {
        let entry = |name: &str, entry_type: EntryType| ListEntry {
            name: name.to_string(),
            path: format!("x/{}", name),
            entry_type,
            size: String::new(),
            thumb: None,
            modified: None,
        };

        let listing = BrowseListing::from_entries(
            "/x",
            vec![
                entry("sub", EntryType::Folder),
                entry("b.png", EntryType::Image),
                entry("a.mp4", EntryType::Video),
                entry("c.txt", EntryType::Other),
                entry("d.mp3", EntryType::Audio),
            ],
        );

        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.others.len(), 1);
        let names: Vec<&str> = listing.playable.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "a.mp4", "d.mp3"]);
        assert_eq!(listing.breadcrumbs.len(), 2);
    }

    #[test]
    fn test_library_mode_labels() {
        assert_eq!("music".parse::<LibraryMode>().unwrap(), LibraryMode::Music);
        assert!("podcasts".parse::<LibraryMode>().is_err());
        assert_eq!(LibraryMode::Files.artist_label(), "Media");
        assert_eq!(LibraryMode::Music.artist_label(), "Raikiri Music");
    }
}
