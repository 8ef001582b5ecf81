//! Media element double that records every directive
//!
//! By default the sink reports `Ready` as soon as a source is attached, like an
//! element whose metadata loads instantly.

use raikiri_common::events::{SinkEvent, SinkKind};
use raikiri_player::playback::{AttachmentId, MediaSink, SinkEventSender};
use raikiri_player::Result;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Attach(AttachmentId, String),
    Detach,
    Play,
    Pause,
    Seek(f64),
    Rate(f64),
    Muted(bool),
}

#[derive(Default)]
struct Shared {
    calls: Vec<SinkCall>,
    attachment: Option<AttachmentId>,
    events: Option<SinkEventSender>,
}

/// Test-side view of a [`RecordingSink`]
#[derive(Clone)]
pub struct SinkRemote {
    kind: SinkKind,
    shared: Arc<Mutex<Shared>>,
}

impl SinkRemote {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.shared.lock().unwrap().calls.clear();
    }

    /// Attachment of the source currently loaded
    pub fn attachment(&self) -> Option<AttachmentId> {
        self.shared.lock().unwrap().attachment
    }

    pub fn attach_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SinkCall::Attach(..)))
            .count()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// Report an element event for the current source
    pub fn emit(&self, event: SinkEvent) {
        let shared = self.shared.lock().unwrap();
        let attachment = shared.attachment.expect("no source attached");
        self.emit_for(&shared, attachment, event);
    }

    /// Report an element event for an arbitrary attachment
    pub fn emit_stale(&self, attachment: AttachmentId, event: SinkEvent) {
        let shared = self.shared.lock().unwrap();
        self.emit_for(&shared, attachment, event);
    }

    fn emit_for(&self, shared: &Shared, attachment: AttachmentId, event: SinkEvent) {
        let events = shared.events.as_ref().expect("sink not bound");
        assert!(events.send(self.kind, attachment, event));
    }
}

pub struct RecordingSink {
    kind: SinkKind,
    shared: Arc<Mutex<Shared>>,
    /// `Some(duration)` reports `Ready` on attach
    auto_ready: Option<Option<f64>>,
}

impl RecordingSink {
    pub fn new(kind: SinkKind, ready_duration: Option<f64>) -> (Self, SinkRemote) {
        Self::build(kind, Some(ready_duration))
    }

    /// Sink that waits for the test to emit `Ready`
    pub fn manual(kind: SinkKind) -> (Self, SinkRemote) {
        Self::build(kind, None)
    }

    fn build(kind: SinkKind, auto_ready: Option<Option<f64>>) -> (Self, SinkRemote) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let remote = SinkRemote {
            kind,
            shared: Arc::clone(&shared),
        };
        (
            Self {
                kind,
                shared,
                auto_ready,
            },
            remote,
        )
    }

    fn record(&self, call: SinkCall) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

impl MediaSink for RecordingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn bind(&mut self, events: SinkEventSender) {
        self.shared.lock().unwrap().events = Some(events);
    }

    fn attach(&mut self, attachment: AttachmentId, url: &str) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(SinkCall::Attach(attachment, url.to_string()));
        shared.attachment = Some(attachment);
        if let (Some(duration_secs), Some(events)) = (self.auto_ready, shared.events.as_ref()) {
            events.send(self.kind, attachment, SinkEvent::Ready { duration_secs });
        }
        Ok(())
    }

    fn detach(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(SinkCall::Detach);
        shared.attachment = None;
    }

    fn play(&mut self) {
        self.record(SinkCall::Play);
    }

    fn pause(&mut self) {
        self.record(SinkCall::Pause);
    }

    fn seek(&mut self, position_secs: f64) {
        self.record(SinkCall::Seek(position_secs));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.record(SinkCall::Rate(rate));
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(SinkCall::Muted(muted));
    }
}
