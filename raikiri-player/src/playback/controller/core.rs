//! Controller task: lifecycle, message loop, status transitions

use super::{ControllerHandle, Request};
use crate::backend::MediaBackend;
use crate::config::PlayerConfig;
use crate::playback::drift::{DriftAction, DriftConditions, DriftCorrector};
use crate::playback::queue_store::QueueStore;
use crate::playback::scheduler::{TimerSlot, TimerTicket};
use crate::playback::sessions::{LoadToken, SessionResolution, StreamSessionManager};
use crate::playback::sink::{AttachmentId, MediaSink, SinkEventSender, SinkMessage};
use crate::state::{PlaybackState, SharedState, SinkView};
use raikiri_common::api::QueueResponse;
use raikiri_common::events::{PlaybackStatus, PlayerEvent, SinkKind};
use raikiri_common::QueueItem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Messages the controller posts to itself
pub(crate) enum Internal {
    SessionResolved(SessionResolution),
    DwellElapsed(TimerTicket),
    DriftTick(TimerTicket),
    DriftRevert(TimerTicket),
}

/// Which media backend the current item is driven by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ActiveBackend {
    Image,
    Audio(AttachmentId),
    /// `None` until the stream session resolves
    Video(Option<AttachmentId>),
    /// Load failed; `play` retries
    Failed,
}

/// The item currently loaded (or loading)
#[derive(Debug, Clone)]
pub(super) struct ActiveItem {
    pub(super) item: QueueItem,
    pub(super) token: LoadToken,
    pub(super) backend: ActiveBackend,
}

/// Play/pause directive sent to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Transport {
    Play,
    Pause,
}

/// Controller's mirror of one element
#[derive(Debug, Clone)]
pub(super) struct SinkStatus {
    pub(super) attachment: Option<AttachmentId>,
    pub(super) ready: bool,
    pub(super) position: f64,
    pub(super) duration: Option<f64>,
    pub(super) rate: f64,
    /// Last directive the element has not yet confirmed
    pub(super) pending: Option<Transport>,
    pub(super) url: Option<String>,
    /// Element is meant to be playing
    pub(super) playing: bool,
}

impl SinkStatus {
    fn idle() -> Self {
        Self {
            attachment: None,
            ready: false,
            position: 0.0,
            duration: None,
            rate: 1.0,
            pending: None,
            url: None,
            playing: false,
        }
    }

    pub(super) fn attached(attachment: AttachmentId, url: &str) -> Self {
        Self {
            attachment: Some(attachment),
            url: Some(url.to_string()),
            ..Self::idle()
        }
    }

    fn view(&self) -> SinkView {
        SinkView {
            attachment: self.attachment,
            url: self.url.clone(),
            playing: self.playing,
        }
    }
}

struct Inbox {
    requests: mpsc::UnboundedReceiver<Request>,
    internal: mpsc::UnboundedReceiver<Internal>,
    sink_events: mpsc::UnboundedReceiver<SinkMessage>,
}

pub struct PlaybackController {
    pub(super) config: PlayerConfig,
    pub(super) backend: Arc<dyn MediaBackend>,
    pub(super) state: Arc<SharedState>,
    pub(super) queue: QueueStore,
    pub(super) sessions: StreamSessionManager,
    pub(super) drift: DriftCorrector<Internal>,
    pub(super) dwell: TimerSlot,
    /// Dwell left when an image was paused
    pub(super) dwell_remaining: Option<Duration>,
    pub(super) audio: Box<dyn MediaSink>,
    pub(super) video: Box<dyn MediaSink>,
    pub(super) audio_status: SinkStatus,
    pub(super) video_status: SinkStatus,
    pub(super) status: PlaybackStatus,
    pub(super) active: Option<ActiveItem>,
    /// Pause arrived while loading; applied when the item becomes ready
    pub(super) pause_requested: bool,
    pub(super) muted: bool,
    pub(super) last_error: Option<String>,
    pub(super) internal_tx: mpsc::UnboundedSender<Internal>,
    load_token: LoadToken,
    next_attachment: AttachmentId,
}

impl PlaybackController {
    /// Start the controller task
    ///
    /// The sinks are bound to the controller's element-event channel before the
    /// task starts.
    pub fn spawn(
        config: PlayerConfig,
        backend: Arc<dyn MediaBackend>,
        state: Arc<SharedState>,
        mut audio: Box<dyn MediaSink>,
        mut video: Box<dyn MediaSink>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (internal_tx, internal) = mpsc::unbounded_channel();
        let (sink_tx, sink_events) = mpsc::unbounded_channel();

        audio.bind(SinkEventSender::new(sink_tx.clone()));
        video.bind(SinkEventSender::new(sink_tx.clone()));

        let sessions = StreamSessionManager::new(
            Arc::clone(&backend),
            config.library_mode,
            state.event_bus().clone(),
        );
        let drift = DriftCorrector::new(
            config.drift.clone(),
            internal_tx.clone(),
            Internal::DriftTick,
            Internal::DriftRevert,
        );

        let controller = Self {
            config,
            backend,
            state,
            queue: QueueStore::new(),
            sessions,
            drift,
            dwell: TimerSlot::new("dwell"),
            dwell_remaining: None,
            audio,
            video,
            audio_status: SinkStatus::idle(),
            video_status: SinkStatus::idle(),
            status: PlaybackStatus::Idle,
            active: None,
            pause_requested: false,
            muted: false,
            last_error: None,
            internal_tx,
            load_token: 0,
            next_attachment: 0,
        };

        let inbox = Inbox {
            requests,
            internal,
            sink_events,
        };
        let handle = ControllerHandle::new(request_tx, sink_tx);
        let task = tokio::spawn(controller.run(inbox));
        (handle, task)
    }

    async fn run(mut self, mut inbox: Inbox) {
        info!("Playback controller started");

        loop {
            // Internal messages first: a resolution or element event that is
            // already queued is applied before the next user command.
            tokio::select! {
                biased;

                Some(message) = inbox.internal.recv() => self.handle_internal(message),
                Some(message) = inbox.sink_events.recv() => self.handle_sink_event(message),
                request = inbox.requests.recv() => match request {
                    Some(Request::Command { command, reply }) => {
                        let result = self.handle_command(command);
                        if let Err(e) = &result {
                            debug!("Command rejected: {}", e);
                        }
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                    }
                    Some(Request::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Request::Queue(reply)) => {
                        let _ = reply.send(self.queue_view());
                    }
                    Some(Request::Shutdown(reply)) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        debug!("All controller handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
            }

            self.publish().await;
        }

        info!("Playback controller stopped");
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::SessionResolved(resolution) => self.on_session_resolved(resolution),
            Internal::DwellElapsed(ticket) => self.on_dwell_elapsed(ticket),
            Internal::DriftTick(ticket) => {
                let conditions = DriftConditions {
                    playing: self.status == PlaybackStatus::Playing
                        && matches!(self.active_backend(), Some(ActiveBackend::Video(Some(_)))),
                    ready: self.video_status.ready,
                    duration: self.authoritative_duration(),
                    position: self.video_status.position,
                };
                if let Some(action) = self.drift.on_tick(ticket, conditions) {
                    self.apply_drift(action);
                }
            }
            Internal::DriftRevert(ticket) => {
                if let Some(action) = self.drift.on_revert(ticket) {
                    self.apply_drift(action);
                }
            }
        }
    }

    fn apply_drift(&mut self, action: DriftAction) {
        if self.video_status.attachment.is_none() {
            return;
        }
        match action {
            DriftAction::Seek(target) => {
                trace!("Drift seek to {:.3}s", target);
                self.video.seek(target);
                self.video_status.position = target;
            }
            DriftAction::SetRate(rate) => {
                self.video.set_playback_rate(rate);
                self.video_status.rate = rate;
            }
        }
    }

    /// Move to `new_status`, keeping drift correction tied to `Playing`
    pub(super) fn set_status(&mut self, new_status: PlaybackStatus) {
        let old_status = self.status;
        self.status = new_status;

        if new_status == PlaybackStatus::Playing {
            if let Some(ActiveBackend::Video(Some(attachment))) = self.active_backend() {
                self.drift.start(attachment);
            }
        } else if let Some(rate) = self.drift.stop() {
            if self.video_status.attachment.is_some() {
                self.video.set_playback_rate(rate);
                self.video_status.rate = rate;
            }
        }

        if old_status != new_status {
            debug!("Playback status {} -> {}", old_status, new_status);
            self.state.broadcast_event(PlayerEvent::PlaybackStateChanged {
                old_state: old_status,
                new_state: new_status,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub(super) fn next_load_token(&mut self) -> LoadToken {
        self.load_token += 1;
        self.load_token
    }

    pub(super) fn next_attachment_id(&mut self) -> AttachmentId {
        self.next_attachment += 1;
        self.next_attachment
    }

    pub(super) fn active_backend(&self) -> Option<ActiveBackend> {
        self.active.as_ref().map(|active| active.backend)
    }

    pub(super) fn sink_status(&self, kind: SinkKind) -> &SinkStatus {
        match kind {
            SinkKind::Audio => &self.audio_status,
            SinkKind::Video => &self.video_status,
        }
    }

    pub(super) fn sink_status_mut(&mut self, kind: SinkKind) -> &mut SinkStatus {
        match kind {
            SinkKind::Audio => &mut self.audio_status,
            SinkKind::Video => &mut self.video_status,
        }
    }

    /// Element driving the current item, if it is attached
    fn active_sink_kind(&self) -> Option<SinkKind> {
        match self.active_backend()? {
            ActiveBackend::Audio(_) => Some(SinkKind::Audio),
            ActiveBackend::Video(Some(_)) => Some(SinkKind::Video),
            _ => None,
        }
    }

    /// Tell the active element to play or pause
    ///
    /// The directive stays pending until the element reports the matching
    /// state; see [`confirm_transport`](Self::confirm_transport).
    pub(super) fn direct_element(&mut self, transport: Transport) {
        let Some(kind) = self.active_sink_kind() else {
            return;
        };
        let sink = match kind {
            SinkKind::Audio => &mut self.audio,
            SinkKind::Video => &mut self.video,
        };
        match transport {
            Transport::Play => sink.play(),
            Transport::Pause => sink.pause(),
        }
        let status = self.sink_status_mut(kind);
        status.pending = Some(transport);
        status.playing = transport == Transport::Play;
    }

    /// Match an element's playing/paused report against the pending directive
    ///
    /// Returns `false` for a report that contradicts it: the element is still
    /// answering an older directive and the newer one has not landed yet.
    pub(super) fn confirm_transport(&mut self, kind: SinkKind, observed: Transport) -> bool {
        let status = self.sink_status_mut(kind);
        match status.pending {
            Some(pending) if pending != observed => false,
            Some(_) | None => {
                status.pending = None;
                status.playing = observed == Transport::Play;
                true
            }
        }
    }

    /// Duration of the current time-based item, session hint first
    pub(super) fn authoritative_duration(&self) -> Option<f64> {
        match self.active_backend()? {
            ActiveBackend::Audio(_) => self.audio_status.duration,
            ActiveBackend::Video(Some(_)) => self
                .sessions
                .live()
                .and_then(|session| session.duration_hint)
                .or(self.video_status.duration),
            _ => None,
        }
        .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Position of the current time-based item
    pub(super) fn current_position(&self) -> f64 {
        match self.active_backend() {
            Some(ActiveBackend::Audio(_)) => self.audio_status.position,
            Some(ActiveBackend::Video(Some(_))) => self.video_status.position,
            _ => 0.0,
        }
    }

    /// Effective playback rate (0 unless playing)
    pub(super) fn effective_rate(&self) -> f64 {
        if self.status != PlaybackStatus::Playing {
            return 0.0;
        }
        match self.active_backend() {
            Some(ActiveBackend::Audio(_)) => self.audio_status.rate,
            Some(ActiveBackend::Video(Some(_))) => self.video_status.rate,
            _ => 1.0,
        }
    }

    /// Report position for time-based media
    pub(super) fn emit_progress(&self) {
        let Some(active) = &self.active else {
            return;
        };
        if !active.item.media_kind.is_time_based() {
            return;
        }
        self.state.broadcast_event(PlayerEvent::PlaybackProgress {
            path: active.item.path.clone(),
            kind: active.item.media_kind,
            position_secs: self.current_position(),
            duration_secs: self.authoritative_duration(),
            rate: self.effective_rate(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn snapshot(&self) -> PlaybackState {
        let current_item = self.queue.current().cloned();
        PlaybackState {
            status: self.status,
            kind: current_item.as_ref().map(|item| item.media_kind),
            current_time: self.current_position(),
            duration: self.authoritative_duration(),
            is_muted: self.muted,
            current_index: self.queue.current_index(),
            queue_len: self.queue.len(),
            current_item,
            last_error: self.last_error.clone(),
            audio_sink: self.audio_status.view(),
            video_sink: self.video_status.view(),
        }
    }

    pub(super) fn queue_view(&self) -> QueueResponse {
        QueueResponse {
            items: self.queue.items().to_vec(),
            current_index: self.queue.current_index(),
            context: self.queue.context().clone(),
        }
    }

    /// Copy the snapshot and queue into the shared state
    ///
    /// Everything is cloned out first: the controller holds non-`Sync` sinks,
    /// so no borrow of it may live across the awaits.
    async fn publish(&mut self) {
        let state = Arc::clone(&self.state);
        let snapshot = self.snapshot();
        let queue = self.queue_view();
        publish_to(state, snapshot, queue).await;
    }

    async fn shutdown(&mut self) {
        info!("Shutting down playback controller");
        self.teardown();
        self.active = None;
        self.set_status(PlaybackStatus::Idle);
        self.sessions.shutdown().await;
        self.publish().await;
    }

    /// Release whatever drives the current item
    ///
    /// Cancels timers, detaches the sink in use and releases any stream
    /// session (live or pending). The previous item is fully detached before
    /// anything new is attached.
    pub(super) fn teardown(&mut self) {
        self.dwell.cancel();
        self.dwell_remaining = None;
        self.drift.stop();

        match self.active_backend() {
            Some(ActiveBackend::Audio(_)) => {
                self.audio.detach();
                self.audio_status = SinkStatus::idle();
            }
            Some(ActiveBackend::Video(attachment)) => {
                if attachment.is_some() {
                    self.video.detach();
                }
                self.video_status = SinkStatus::idle();
                self.sessions.release();
            }
            Some(ActiveBackend::Image) | Some(ActiveBackend::Failed) | None => {}
        }
    }

    /// Drop an event if it was produced for a previous attachment
    pub(super) fn is_current_attachment(&self, message: &SinkMessage) -> bool {
        let current = self.sink_status(message.kind).attachment;
        if current != Some(message.attachment) {
            trace!(
                "Dropping stale {} event {:?} (attachment {} != {:?})",
                message.kind,
                message.event,
                message.attachment,
                current
            );
            return false;
        }
        true
    }
}

async fn publish_to(state: Arc<SharedState>, snapshot: PlaybackState, queue: QueueResponse) {
    state.set_playback_state(snapshot).await;
    state.set_queue(queue).await;
}
