//! Loading items: per-kind dispatch, readiness, failure, auto-advance

use super::core::{ActiveBackend, ActiveItem, PlaybackController, SinkStatus, Transport};
use super::core::Internal;
use crate::error::Error;
use crate::playback::queue_store::Advance;
use crate::playback::scheduler::TimerTicket;
use crate::playback::sessions::SessionResolution;
use crate::playback::sink::SinkMessage;
use raikiri_common::events::{PlaybackStatus, PlayerEvent, QueueChangeTrigger, SinkEvent};
use raikiri_common::MediaKind;
use tracing::{debug, info, warn};

/// How an item of a given kind is brought to `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Ready immediately; a dwell timer advances
    Image,
    /// Attach the audio element to the content URL
    Audio,
    /// Open a stream session, then attach the video element to it
    Video,
    /// Cannot be played
    Unsupported,
}

impl LoadStrategy {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => LoadStrategy::Image,
            MediaKind::Audio => LoadStrategy::Audio,
            MediaKind::Video => LoadStrategy::Video,
            MediaKind::Other => LoadStrategy::Unsupported,
        }
    }
}

impl PlaybackController {
    /// Enter `Loading` for the queue's current item
    ///
    /// The previous item is torn down first.
    pub(super) fn begin_load(&mut self) {
        self.teardown();
        self.last_error = None;

        let Some(index) = self.queue.current_index() else {
            self.active = None;
            self.set_status(PlaybackStatus::Idle);
            return;
        };
        let Some(item) = self.queue.current().cloned() else {
            return;
        };

        let token = self.next_load_token();
        let strategy = LoadStrategy::for_kind(item.media_kind);
        info!("Loading [{}] {} ({:?})", index, item.path, strategy);

        self.active = Some(ActiveItem {
            item: item.clone(),
            token,
            backend: ActiveBackend::Failed,
        });
        self.set_status(PlaybackStatus::Loading);

        let artwork_url = item
            .thumbnail_path
            .as_deref()
            .map(|thumb| self.backend.resolve_url(thumb));
        self.state.broadcast_event(PlayerEvent::ItemStarted {
            index,
            item: item.clone(),
            context: self.queue.context().clone(),
            artwork_url,
            timestamp: chrono::Utc::now(),
        });

        match strategy {
            LoadStrategy::Image => {
                self.set_active_backend(ActiveBackend::Image);
                self.enter_ready();
            }
            LoadStrategy::Audio => {
                let attachment = self.next_attachment_id();
                let url = self.backend.content_url(&item.path, self.config.library_mode);
                match self.audio.attach(attachment, &url) {
                    Ok(()) => {
                        self.audio.set_muted(self.muted);
                        self.audio_status = SinkStatus::attached(attachment, &url);
                        self.set_active_backend(ActiveBackend::Audio(attachment));
                    }
                    Err(e) => self.fail_load(Error::MediaAttach(e.to_string())),
                }
            }
            LoadStrategy::Video => {
                self.set_active_backend(ActiveBackend::Video(None));
                self.sessions.request(
                    &item.path,
                    token,
                    &self.internal_tx,
                    Internal::SessionResolved,
                );
            }
            LoadStrategy::Unsupported => {
                self.fail_load(Error::UnsupportedKind(item.path.clone()));
            }
        }
    }

    fn set_active_backend(&mut self, backend: ActiveBackend) {
        if let Some(active) = self.active.as_mut() {
            active.backend = backend;
        }
    }

    /// The current item can play: start it, or hold it if a pause is pending
    fn enter_ready(&mut self) {
        if self.pause_requested {
            self.pause_requested = false;
            if self.active_backend() == Some(ActiveBackend::Image) {
                self.dwell_remaining = Some(self.config.dwell());
            } else {
                // The element may have started on its own (autoplay)
                self.direct_element(Transport::Pause);
            }
            self.set_status(PlaybackStatus::Paused);
            return;
        }

        if self.active_backend() == Some(ActiveBackend::Image) {
            self.dwell
                .arm(self.config.dwell(), &self.internal_tx, Internal::DwellElapsed);
        } else {
            self.direct_element(Transport::Play);
        }
        self.set_status(PlaybackStatus::Playing);
        self.emit_progress();
    }

    /// Surface a load failure and stay `Idle` on the item
    pub(super) fn fail_load(&mut self, error: Error) {
        self.teardown();
        let index = self.queue.current_index().unwrap_or_default();
        let path = self
            .active
            .as_ref()
            .map(|active| active.item.path.clone())
            .unwrap_or_default();
        warn!("Failed to load [{}] {}: {}", index, path, error);

        self.set_active_backend(ActiveBackend::Failed);
        self.pause_requested = false;
        self.last_error = Some(error.to_string());
        self.set_status(PlaybackStatus::Idle);
        self.state.broadcast_event(PlayerEvent::PlaybackLoadError {
            index,
            path,
            error: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn on_session_resolved(&mut self, resolution: SessionResolution) {
        let token = resolution.token;
        let Some(result) = self.sessions.resolve(resolution) else {
            return;
        };

        // Interest is only ever registered for the active video load
        let Some(active) = self.active.as_ref().filter(|active| active.token == token) else {
            warn!("Stream session resolved for inactive load {}", token);
            self.sessions.release();
            return;
        };
        let path = active.item.path.clone();

        match result {
            Ok(session) => {
                let attachment = self.next_attachment_id();
                debug!("Attaching video {} to {}", path, session.media_url);
                match self.video.attach(attachment, &session.media_url) {
                    Ok(()) => {
                        self.video.set_muted(self.muted);
                        self.video_status = SinkStatus::attached(attachment, &session.media_url);
                        self.video_status.duration = session.duration_hint;
                        self.set_active_backend(ActiveBackend::Video(Some(attachment)));
                    }
                    Err(e) => self.fail_load(Error::MediaAttach(e.to_string())),
                }
            }
            Err(e) => self.fail_load(e),
        }
    }

    pub(super) fn handle_sink_event(&mut self, message: SinkMessage) {
        if !self.is_current_attachment(&message) {
            return;
        }

        match message.event {
            SinkEvent::Ready { duration_secs } => {
                let status = self.sink_status_mut(message.kind);
                status.ready = true;
                if duration_secs.is_some() {
                    status.duration = duration_secs;
                }
                if self.status == PlaybackStatus::Loading {
                    self.enter_ready();
                }
            }
            SinkEvent::TimeUpdate {
                position_secs,
                duration_secs,
            } => {
                let status = self.sink_status_mut(message.kind);
                status.position = position_secs.max(0.0);
                if duration_secs.is_some() {
                    status.duration = duration_secs;
                }
                self.emit_progress();
            }
            SinkEvent::Playing => {
                if !self.confirm_transport(message.kind, Transport::Play) {
                    debug!("Ignoring {} playing report: pause outstanding", message.kind);
                    return;
                }
                match self.status {
                    PlaybackStatus::Loading => {
                        self.sink_status_mut(message.kind).ready = true;
                        self.enter_ready();
                        // Already playing; the play directive needs no answer
                        let status = self.sink_status_mut(message.kind);
                        if status.pending == Some(Transport::Play) {
                            status.pending = None;
                        }
                    }
                    PlaybackStatus::Paused => {
                        debug!("{} element resumed on its own", message.kind);
                        self.set_status(PlaybackStatus::Playing);
                        self.emit_progress();
                    }
                    _ => {}
                }
            }
            SinkEvent::Paused => {
                if !self.confirm_transport(message.kind, Transport::Pause) {
                    debug!("Ignoring {} paused report: play outstanding", message.kind);
                    return;
                }
                if self.status == PlaybackStatus::Playing {
                    debug!("{} element paused on its own", message.kind);
                    self.set_status(PlaybackStatus::Paused);
                    self.emit_progress();
                }
            }
            SinkEvent::Ended => {
                if matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
                    self.advance();
                }
            }
            SinkEvent::Error { message: reason } => {
                self.fail_load(Error::MediaAttach(reason));
            }
        }
    }

    pub(super) fn on_dwell_elapsed(&mut self, ticket: TimerTicket) {
        if !self.dwell.accept(ticket) {
            return;
        }
        if self.status == PlaybackStatus::Playing
            && self.active_backend() == Some(ActiveBackend::Image)
        {
            self.advance();
        }
    }

    /// Natural end of the current item: next item, or `Ended` after the last
    pub(super) fn advance(&mut self) {
        match self.queue.next() {
            Advance::Moved(index) => {
                debug!("Auto-advancing to [{}]", index);
                self.emit_queue_changed(QueueChangeTrigger::PositionChanged);
                self.begin_load();
            }
            Advance::EndOfQueue => self.enter_ended(),
        }
    }

    /// Queue ran out: keep the queue and position, drop the loaded item
    pub(super) fn enter_ended(&mut self) {
        info!("Reached end of queue");
        self.teardown();
        self.active = None;
        self.pause_requested = false;
        self.set_status(PlaybackStatus::Ended);
    }

    pub(super) fn emit_queue_changed(&self, trigger: QueueChangeTrigger) {
        self.state.broadcast_event(PlayerEvent::QueueChanged {
            paths: self.queue.paths(),
            current_index: self.queue.current_index(),
            trigger,
            timestamp: chrono::Utc::now(),
        });
    }
}
