//! OS now-playing integration
//!
//! [`MediaSessionAdapter`] is a read-only observer of the controller: it
//! follows `PlayerEvent`s on the event bus and mirrors them into a
//! [`NowPlaying`] backend (metadata, transport state, position). Transport
//! controls pressed in the OS are mapped to controller commands.
//!
//! Platform integrations are often not `Send`, so the adapter runs on its own
//! thread and builds the backend there.

#[cfg(feature = "media-controls")]
mod platform;

#[cfg(feature = "media-controls")]
pub use self::platform::SouvlakiNowPlaying;

use crate::error::{Error, Result};
use crate::playback::{Command, ControllerHandle};
use raikiri_common::events::{PlaybackStatus, PlayerEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Seek step for OS "seek forward/backward" buttons
pub const SEEK_STEP_SECS: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlayingMetadata {
    pub title: String,
    pub artist: Option<String>,
    /// Logical album: the folder or search the queue came from
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Paused,
    Playing,
}

/// Transport control pressed in the OS
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportControl {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Stop,
    /// Absolute position in seconds
    SeekTo(f64),
    /// Relative seek in seconds (negative is backward)
    SeekBy(f64),
}

/// Called from the platform's event thread, possibly more than once at a time
pub type ControlCallback = Box<dyn Fn(TransportControl) + Send + 'static>;

/// Platform now-playing backend
pub trait NowPlaying {
    /// Register the callback for OS transport controls
    fn attach(&mut self, on_control: ControlCallback) -> Result<()>;
    fn set_metadata(&mut self, metadata: &NowPlayingMetadata) -> Result<()>;
    fn set_playback(&mut self, state: TransportState, position: Option<Duration>) -> Result<()>;
    /// Remove metadata and position
    fn clear(&mut self) -> Result<()>;
}

/// Backend for platforms without an integration
pub struct Unsupported;

impl NowPlaying for Unsupported {
    fn attach(&mut self, _on_control: ControlCallback) -> Result<()> {
        Err(Error::OsIntegrationUnsupported(
            "built without media-controls".to_string(),
        ))
    }

    fn set_metadata(&mut self, _metadata: &NowPlayingMetadata) -> Result<()> {
        Err(Error::OsIntegrationUnsupported("no backend".to_string()))
    }

    fn set_playback(&mut self, _state: TransportState, _position: Option<Duration>) -> Result<()> {
        Err(Error::OsIntegrationUnsupported("no backend".to_string()))
    }

    fn clear(&mut self) -> Result<()> {
        Err(Error::OsIntegrationUnsupported("no backend".to_string()))
    }
}

/// Platform backend, or [`Unsupported`]
pub fn platform_now_playing() -> Result<Box<dyn NowPlaying>> {
    #[cfg(feature = "media-controls")]
    {
        Ok(Box::new(SouvlakiNowPlaying::new()?))
    }
    #[cfg(not(feature = "media-controls"))]
    {
        Ok(Box::new(Unsupported))
    }
}

/// Playback facts the control callback needs
#[derive(Debug, Clone, Copy, Default)]
struct ControlState {
    is_playing: bool,
    position_secs: f64,
    duration_secs: Option<f64>,
}

pub struct MediaSessionAdapter {
    now_playing: Box<dyn NowPlaying>,
    control_state: Arc<Mutex<ControlState>>,
    metadata: Option<NowPlayingMetadata>,
    last_published: Option<TransportState>,
}

impl MediaSessionAdapter {
    pub fn new(now_playing: Box<dyn NowPlaying>) -> Self {
        Self {
            now_playing,
            control_state: Arc::new(Mutex::new(ControlState::default())),
            metadata: None,
            last_published: None,
        }
    }

    /// Run the adapter on a dedicated thread
    ///
    /// `factory` builds the backend on that thread. When the integration is
    /// unavailable the thread exits quietly.
    pub fn spawn<F>(
        factory: F,
        events: broadcast::Receiver<PlayerEvent>,
        handle: ControllerHandle,
    ) -> std::io::Result<std::thread::JoinHandle<()>>
    where
        F: FnOnce() -> Result<Box<dyn NowPlaying>> + Send + 'static,
    {
        std::thread::Builder::new()
            .name("media-session".to_string())
            .spawn(move || {
                let now_playing = match factory() {
                    Ok(now_playing) => now_playing,
                    Err(e) => {
                        debug!("Now-playing integration unavailable: {}", e);
                        return;
                    }
                };
                let mut adapter = MediaSessionAdapter::new(now_playing);
                if let Err(e) = adapter.attach(handle) {
                    debug!("Now-playing integration unavailable: {}", e);
                    return;
                }
                adapter.run(events);
            })
    }

    /// Route OS transport controls to the controller
    pub fn attach(&mut self, handle: ControllerHandle) -> Result<()> {
        let control_state = Arc::clone(&self.control_state);
        self.now_playing.attach(Box::new(move |control| {
            let state = match control_state.lock() {
                Ok(state) => *state,
                Err(poisoned) => *poisoned.into_inner(),
            };
            if let Some(command) = map_control(control, state) {
                if handle.dispatch(command).is_err() {
                    debug!("Transport control {:?} dropped: controller stopped", control);
                }
            }
        }))
    }

    /// Blocking event loop; returns when the event bus closes
    pub fn run(&mut self, mut events: broadcast::Receiver<PlayerEvent>) {
        info!("Now-playing integration started");
        loop {
            match events.blocking_recv() {
                Ok(event) => self.handle_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Now-playing integration lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    pub fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::ItemStarted {
                item,
                context,
                artwork_url,
                ..
            } => {
                self.update_control_state(|state| {
                    state.position_secs = 0.0;
                    state.duration_secs = None;
                });
                let metadata = NowPlayingMetadata {
                    title: item.name.clone(),
                    artist: context.artist.clone(),
                    album: context.album.clone(),
                    artwork_url: artwork_url.clone(),
                    duration: None,
                };
                self.publish_metadata(metadata);
            }
            PlayerEvent::PlaybackStateChanged { new_state, .. } => match new_state {
                PlaybackStatus::Playing => {
                    self.update_control_state(|state| state.is_playing = true);
                    self.publish_playback(TransportState::Playing);
                }
                PlaybackStatus::Paused => {
                    self.update_control_state(|state| state.is_playing = false);
                    self.publish_playback(TransportState::Paused);
                }
                PlaybackStatus::Idle | PlaybackStatus::Ended => {
                    self.update_control_state(|state| *state = ControlState::default());
                    self.metadata = None;
                    Self::report(self.now_playing.clear());
                    self.publish_playback(TransportState::Stopped);
                }
                PlaybackStatus::Loading => {}
            },
            PlayerEvent::PlaybackProgress {
                position_secs,
                duration_secs,
                ..
            } => {
                let previous = self.control_state_snapshot();
                self.update_control_state(|state| {
                    state.position_secs = *position_secs;
                    state.duration_secs = *duration_secs;
                });

                if previous.duration_secs != *duration_secs {
                    if let Some(mut metadata) = self.metadata.clone() {
                        metadata.duration = duration_secs
                            .filter(|d| d.is_finite() && *d > 0.0)
                            .map(Duration::from_secs_f64);
                        self.publish_metadata(metadata);
                    }
                }
                if let Some(state) = self.last_published {
                    let position = Duration::from_secs_f64(position_secs.max(0.0));
                    Self::report(self.now_playing.set_playback(state, Some(position)));
                }
            }
            _ => {}
        }
    }

    fn publish_metadata(&mut self, metadata: NowPlayingMetadata) {
        if self.metadata.as_ref() == Some(&metadata) {
            return;
        }
        Self::report(self.now_playing.set_metadata(&metadata));
        self.metadata = Some(metadata);
    }

    fn publish_playback(&mut self, state: TransportState) {
        if self.last_published == Some(state) {
            return;
        }
        let position = match state {
            TransportState::Stopped => None,
            _ => Some(Duration::from_secs_f64(
                self.control_state_snapshot().position_secs.max(0.0),
            )),
        };
        Self::report(self.now_playing.set_playback(state, position));
        self.last_published = Some(state);
    }

    fn report(result: Result<()>) {
        match result {
            Ok(()) | Err(Error::OsIntegrationUnsupported(_)) => {}
            Err(e) => warn!("Now-playing update failed: {}", e),
        }
    }

    fn update_control_state<F>(&self, update: F)
    where
        F: FnOnce(&mut ControlState),
    {
        match self.control_state.lock() {
            Ok(mut state) => update(&mut state),
            Err(poisoned) => update(&mut poisoned.into_inner()),
        }
    }

    fn control_state_snapshot(&self) -> ControlState {
        match self.control_state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Controller command for an OS transport control
fn map_control(control: TransportControl, state: ControlState) -> Option<Command> {
    match control {
        TransportControl::Play => Some(Command::Play),
        TransportControl::Pause => Some(Command::Pause),
        TransportControl::Toggle => Some(if state.is_playing {
            Command::Pause
        } else {
            Command::Play
        }),
        TransportControl::Next => Some(Command::Next),
        TransportControl::Previous => Some(Command::Previous),
        TransportControl::Stop => Some(Command::Stop),
        TransportControl::SeekTo(target) => {
            let duration = state.duration_secs.filter(|d| *d > 0.0)?;
            Some(Command::Seek(target / duration * 100.0))
        }
        TransportControl::SeekBy(delta) => Some(Command::SeekBy(delta)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raikiri_common::{MediaKind, QueueContext, QueueItem};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Metadata(NowPlayingMetadata),
        Playback(TransportState, Option<Duration>),
        Clear,
    }

    struct Recording(Arc<Mutex<Vec<Call>>>);

    impl NowPlaying for Recording {
        fn attach(&mut self, _on_control: ControlCallback) -> Result<()> {
            Ok(())
        }

        fn set_metadata(&mut self, metadata: &NowPlayingMetadata) -> Result<()> {
            self.0.lock().unwrap().push(Call::Metadata(metadata.clone()));
            Ok(())
        }

        fn set_playback(&mut self, state: TransportState, position: Option<Duration>) -> Result<()> {
            self.0.lock().unwrap().push(Call::Playback(state, position));
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.0.lock().unwrap().push(Call::Clear);
            Ok(())
        }
    }

    /// Keeps the registered control callback so a test can press buttons
    struct Buttons(Arc<Mutex<Option<ControlCallback>>>);

    impl NowPlaying for Buttons {
        fn attach(&mut self, on_control: ControlCallback) -> Result<()> {
            *self.0.lock().unwrap() = Some(on_control);
            Ok(())
        }

        fn set_metadata(&mut self, _metadata: &NowPlayingMetadata) -> Result<()> {
            Ok(())
        }

        fn set_playback(&mut self, _state: TransportState, _position: Option<Duration>) -> Result<()> {
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn state_changed(new_state: PlaybackStatus) -> PlayerEvent {
        PlayerEvent::PlaybackStateChanged {
            old_state: PlaybackStatus::Loading,
            new_state,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_item_started_publishes_queue_context() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut adapter = MediaSessionAdapter::new(Box::new(Recording(Arc::clone(&calls))));

        adapter.handle_event(&PlayerEvent::ItemStarted {
            index: 0,
            item: QueueItem::new("Live/01.flac", "01.flac", MediaKind::Audio),
            context: QueueContext {
                album: Some("/Live".to_string()),
                artist: Some("Raikiri Music".to_string()),
            },
            artwork_url: Some("http://nas.local/thumb.jpg".to_string()),
            timestamp: chrono::Utc::now(),
        });
        adapter.handle_event(&state_changed(PlaybackStatus::Playing));

        let calls = calls.lock().unwrap();
        match &calls[0] {
            Call::Metadata(metadata) => {
                assert_eq!(metadata.title, "01.flac");
                assert_eq!(metadata.album.as_deref(), Some("/Live"));
                assert_eq!(metadata.artist.as_deref(), Some("Raikiri Music"));
            }
            other => panic!("unexpected call: {:?}", other),
        }
        assert_eq!(calls[1], Call::Playback(TransportState::Playing, Some(Duration::ZERO)));
    }

    #[test]
    fn test_progress_updates_duration_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut adapter = MediaSessionAdapter::new(Box::new(Recording(Arc::clone(&calls))));

        adapter.handle_event(&PlayerEvent::ItemStarted {
            index: 0,
            item: QueueItem::new("a.mp3", "a.mp3", MediaKind::Audio),
            context: QueueContext::default(),
            artwork_url: None,
            timestamp: chrono::Utc::now(),
        });
        adapter.handle_event(&state_changed(PlaybackStatus::Playing));
        for position in [1.0, 2.0] {
            adapter.handle_event(&PlayerEvent::PlaybackProgress {
                path: "a.mp3".to_string(),
                kind: MediaKind::Audio,
                position_secs: position,
                duration_secs: Some(180.0),
                rate: 1.0,
                timestamp: chrono::Utc::now(),
            });
        }

        let calls = calls.lock().unwrap();
        let with_duration = calls
            .iter()
            .filter(|c| matches!(c, Call::Metadata(m) if m.duration == Some(Duration::from_secs(180))))
            .count();
        assert_eq!(with_duration, 1);
        assert_eq!(
            calls.last(),
            Some(&Call::Playback(TransportState::Playing, Some(Duration::from_secs(2))))
        );
    }

    #[test]
    fn test_idle_and_ended_clear() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut adapter = MediaSessionAdapter::new(Box::new(Recording(Arc::clone(&calls))));

        adapter.handle_event(&state_changed(PlaybackStatus::Playing));
        adapter.handle_event(&state_changed(PlaybackStatus::Ended));

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&Call::Clear));
        assert_eq!(calls.last(), Some(&Call::Playback(TransportState::Stopped, None)));
    }

    #[test]
    fn test_unsupported_backend_is_quiet() {
        let mut adapter = MediaSessionAdapter::new(Box::new(Unsupported));
        adapter.handle_event(&state_changed(PlaybackStatus::Playing));
        adapter.handle_event(&state_changed(PlaybackStatus::Idle));
        assert!(matches!(
            Unsupported.clear(),
            Err(Error::OsIntegrationUnsupported(_))
        ));
    }

    #[test]
    fn test_toggle_maps_from_playing_state() {
        let playing = ControlState {
            is_playing: true,
            ..Default::default()
        };
        assert_eq!(map_control(TransportControl::Toggle, playing), Some(Command::Pause));
        assert_eq!(
            map_control(TransportControl::Toggle, ControlState::default()),
            Some(Command::Play)
        );
    }

    #[test]
    fn test_seek_to_maps_to_percent() {
        let state = ControlState {
            is_playing: true,
            position_secs: 0.0,
            duration_secs: Some(200.0),
        };
        assert_eq!(
            map_control(TransportControl::SeekTo(50.0), state),
            Some(Command::Seek(25.0))
        );
        assert_eq!(
            map_control(TransportControl::SeekTo(50.0), ControlState::default()),
            None
        );
        assert_eq!(
            map_control(TransportControl::SeekBy(-10.0), state),
            Some(Command::SeekBy(-10.0))
        );
    }

    #[test]
    fn test_os_buttons_dispatch_commands() {
        let (request_tx, mut requests) = tokio::sync::mpsc::unbounded_channel();
        let (sink_tx, _sink_events) = tokio::sync::mpsc::unbounded_channel();
        let handle = ControllerHandle::new(request_tx, sink_tx);

        let slot = Arc::new(Mutex::new(None));
        let mut adapter = MediaSessionAdapter::new(Box::new(Buttons(Arc::clone(&slot))));
        adapter.attach(handle).unwrap();
        adapter.handle_event(&state_changed(PlaybackStatus::Playing));

        // The platform only holds a shared reference to the callback
        let guard = slot.lock().unwrap();
        let press: &(dyn Fn(TransportControl) + Send) = guard.as_deref().unwrap();
        press(TransportControl::Toggle);
        press(TransportControl::Next);
        drop(guard);

        let mut commands = Vec::new();
        while let Ok(request) = requests.try_recv() {
            if let crate::playback::controller::Request::Command { command, reply } = request {
                assert!(reply.is_none());
                commands.push(command);
            }
        }
        assert_eq!(commands, vec![Command::Pause, Command::Next]);
    }
}
