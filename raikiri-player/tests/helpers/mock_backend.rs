//! In-process media server for controller tests
//!
//! Stream opens can be held open per path with [`MockBackend::hold`] and
//! released later, so tests decide exactly when a session resolves.

use async_trait::async_trait;
use raikiri_common::media::{EntryType, ListEntry};
use raikiri_common::LibraryMode;
use raikiri_player::backend::{MediaBackend, PlaybackSession, UploadFile};
use raikiri_player::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct MockState {
    gates: HashMap<String, Arc<Notify>>,
    failing: HashSet<String>,
    listings: HashMap<String, Vec<ListEntry>>,
    open_requests: Vec<String>,
    opened: Vec<(String, String)>,
    closed: Vec<String>,
    syncs: usize,
    next_session: u64,
}

#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<MockState>,
    duration_hint: Option<f64>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(MockState::default()),
            duration_hint: Some(120.0),
        })
    }

    /// Block `open_stream(path)` until [`release`](Self::release)
    pub fn hold(&self, path: &str) {
        self.inner
            .lock()
            .unwrap()
            .gates
            .insert(path.to_string(), Arc::new(Notify::new()));
    }

    /// Let one held open for `path` complete
    pub fn release(&self, path: &str) {
        if let Some(gate) = self.inner.lock().unwrap().gates.get(path) {
            gate.notify_one();
        }
    }

    /// Make `open_stream(path)` fail
    pub fn fail_open(&self, path: &str) {
        self.inner.lock().unwrap().failing.insert(path.to_string());
    }

    pub fn recover(&self, path: &str) {
        self.inner.lock().unwrap().failing.remove(path);
    }

    pub fn set_listing(&self, path: &str, entries: Vec<ListEntry>) {
        self.inner
            .lock()
            .unwrap()
            .listings
            .insert(path.to_string(), entries);
    }

    /// Paths `open_stream` was called with, in call order
    pub fn open_requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().open_requests.clone()
    }

    /// `(path, session_id)` for every successful open
    pub fn opened(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.inner.lock().unwrap().closed.clone()
    }

    pub fn syncs(&self) -> usize {
        self.inner.lock().unwrap().syncs
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn list(&self, path: &str, _mode: LibraryMode, recursive: bool) -> Result<Vec<ListEntry>> {
        let state = self.inner.lock().unwrap();
        if !recursive {
            return Ok(state.listings.get(path).cloned().unwrap_or_default());
        }
        let prefix = path.trim_end_matches('/');
        let mut entries: Vec<ListEntry> = state
            .listings
            .iter()
            .filter(|(dir, _)| dir.starts_with(prefix))
            .flat_map(|(_, entries)| entries.iter().cloned())
            .filter(|entry| entry.entry_type != EntryType::Folder)
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn open_stream(&self, path: &str, _mode: LibraryMode) -> Result<PlaybackSession> {
        let gate = {
            let mut state = self.inner.lock().unwrap();
            state.open_requests.push(path.to_string());
            state.gates.get(path).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.inner.lock().unwrap();
        if state.failing.contains(path) {
            return Err(Error::SessionOpen(format!("transcoder unavailable for {}", path)));
        }
        state.next_session += 1;
        let session_id = format!("sess-{}", state.next_session);
        state.opened.push((path.to_string(), session_id.clone()));
        Ok(PlaybackSession {
            media_url: format!("http://mock/stream/{}/index.m3u8", session_id),
            session_id,
            duration_hint: self.duration_hint,
        })
    }

    async fn close_stream(&self, session_id: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .closed
            .push(session_id.to_string());
        Ok(())
    }

    async fn upload(&self, files: Vec<UploadFile>, _path: &str, _mode: LibraryMode) -> Result<bool> {
        Ok(!files.is_empty())
    }

    async fn sync(&self) -> Result<()> {
        self.inner.lock().unwrap().syncs += 1;
        Ok(())
    }

    fn content_url(&self, path: &str, mode: LibraryMode) -> String {
        format!(
            "http://mock/content/{}?mode={}",
            path.trim_start_matches('/'),
            mode.as_str()
        )
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            format!("http://mock/{}", url.trim_start_matches('/'))
        }
    }
}
