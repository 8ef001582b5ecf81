//! Media sinks
//!
//! A sink is one playback element (the shared audio or video element). Only
//! the controller drives sinks. Every `attach` carries a fresh
//! [`AttachmentId`]; the sink tags the events it reports with that id so the
//! controller can drop events produced for a previous item.

use crate::error::Result;
use raikiri_common::events::{EventBus, PlayerEvent, SinkDirective, SinkEvent, SinkKind};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

pub type AttachmentId = u64;

/// Element event tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct SinkMessage {
    pub kind: SinkKind,
    pub attachment: AttachmentId,
    pub event: SinkEvent,
}

/// Channel into the controller for element events
#[derive(Debug, Clone)]
pub struct SinkEventSender {
    tx: UnboundedSender<SinkMessage>,
}

impl SinkEventSender {
    pub(crate) fn new(tx: UnboundedSender<SinkMessage>) -> Self {
        Self { tx }
    }

    /// Report an event; `false` once the controller has stopped
    pub fn send(&self, kind: SinkKind, attachment: AttachmentId, event: SinkEvent) -> bool {
        self.tx
            .send(SinkMessage {
                kind,
                attachment,
                event,
            })
            .is_ok()
    }
}

/// One playback element
///
/// Commands are fire-and-forget; outcomes arrive later as [`SinkEvent`]s.
/// `attach` may fail synchronously when the source is rejected outright.
pub trait MediaSink: Send {
    fn kind(&self) -> SinkKind;

    /// Called once when the controller takes ownership of the sink
    fn bind(&mut self, _events: SinkEventSender) {}

    /// Load `url`; events for this source must carry `attachment`
    fn attach(&mut self, attachment: AttachmentId, url: &str) -> Result<()>;

    /// Stop and unload the current source; idempotent
    fn detach(&mut self);

    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_secs: f64);
    fn set_playback_rate(&mut self, rate: f64);
    fn set_muted(&mut self, muted: bool);
}

/// Sink backed by a page that owns the native element
///
/// Directives go out as `SinkCommand` events (delivered over SSE); the page
/// reports element events to `POST /media/{sink}/events`.
pub struct RemoteSink {
    kind: SinkKind,
    bus: EventBus,
    attachment: Option<AttachmentId>,
}

impl RemoteSink {
    pub fn new(kind: SinkKind, bus: EventBus) -> Self {
        Self {
            kind,
            bus,
            attachment: None,
        }
    }

    fn send(&self, attachment: AttachmentId, directive: SinkDirective) {
        trace!("{} sink <- {:?}", self.kind, directive);
        self.bus.emit_lossy(PlayerEvent::SinkCommand {
            sink: self.kind,
            attachment,
            directive,
            timestamp: chrono::Utc::now(),
        });
    }

    fn send_current(&self, directive: SinkDirective) {
        if let Some(attachment) = self.attachment {
            self.send(attachment, directive);
        }
    }
}

impl MediaSink for RemoteSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn attach(&mut self, attachment: AttachmentId, url: &str) -> Result<()> {
        self.attachment = Some(attachment);
        self.send(
            attachment,
            SinkDirective::Attach {
                url: url.to_string(),
            },
        );
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            self.send(attachment, SinkDirective::Detach);
        }
    }

    fn play(&mut self) {
        self.send_current(SinkDirective::Play);
    }

    fn pause(&mut self) {
        self.send_current(SinkDirective::Pause);
    }

    fn seek(&mut self, position_secs: f64) {
        self.send_current(SinkDirective::Seek { position_secs });
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.send_current(SinkDirective::SetRate { rate });
    }

    fn set_muted(&mut self, muted: bool) {
        // Mute applies to the element, not the source
        self.send(self.attachment.unwrap_or_default(), SinkDirective::SetMuted { muted });
    }
}
