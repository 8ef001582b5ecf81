//! Controller wired to a mock backend and recording sinks

use super::mock_backend::MockBackend;
use super::recording_sink::{RecordingSink, SinkRemote};
use raikiri_common::events::{PlaybackStatus, PlayerEvent, SinkKind};
use raikiri_common::{MediaKind, QueueItem};
use raikiri_player::backend::MediaBackend;
use raikiri_player::config::PlayerConfig;
use raikiri_player::playback::{ControllerHandle, PlaybackController};
use raikiri_player::state::{PlaybackState, SharedState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Element duration reported by the recording sinks on `Ready`
pub const ELEMENT_DURATION: f64 = 200.0;

pub struct TestPlayer {
    pub handle: ControllerHandle,
    pub backend: Arc<MockBackend>,
    pub state: Arc<SharedState>,
    pub audio: SinkRemote,
    pub video: SinkRemote,
    pub events: broadcast::Receiver<PlayerEvent>,
    task: JoinHandle<()>,
}

impl TestPlayer {
    pub fn start() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let audio = RecordingSink::new(SinkKind::Audio, Some(ELEMENT_DURATION));
        let video = RecordingSink::new(SinkKind::Video, Some(ELEMENT_DURATION));
        Self::with_sinks(config, audio, video)
    }

    pub fn with_sinks(
        config: PlayerConfig,
        audio: (RecordingSink, SinkRemote),
        video: (RecordingSink, SinkRemote),
    ) -> Self {
        let backend = MockBackend::new();
        let state = Arc::new(SharedState::new(config.event_capacity));
        let events = state.subscribe_events();
        let (handle, task) = PlaybackController::spawn(
            config,
            Arc::clone(&backend) as Arc<dyn MediaBackend>,
            Arc::clone(&state),
            Box::new(audio.0),
            Box::new(video.0),
        );
        Self {
            handle,
            backend,
            state,
            audio: audio.1,
            video: video.1,
            events,
            task,
        }
    }

    pub async fn snapshot(&self) -> PlaybackState {
        self.handle.snapshot().await.expect("controller running")
    }

    /// Let spawned tasks and the controller drain their queues
    pub async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    /// Advance the paused clock and let timers fire
    pub async fn advance(&self, duration: Duration) {
        tokio::time::advance(duration).await;
        self.settle().await;
    }

    pub async fn wait_until<F>(&self, what: &str, condition: F) -> PlaybackState
    where
        F: Fn(&PlaybackState) -> bool,
    {
        for _ in 0..100 {
            let state = self.snapshot().await;
            if condition(&state) {
                return state;
            }
            self.settle().await;
        }
        panic!("timed out waiting for {}: {:?}", what, self.snapshot().await);
    }

    pub async fn wait_for_status(&self, status: PlaybackStatus) -> PlaybackState {
        self.wait_until(&format!("status {}", status), |state| state.status == status)
            .await
    }

    /// Wait until the backend has seen `count` session closes
    pub async fn wait_for_closes(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let closed = self.backend.closed();
            if closed.len() >= count {
                return closed;
            }
            self.settle().await;
        }
        panic!(
            "expected {} closes, got {:?}",
            count,
            self.backend.closed()
        );
    }

    /// Events received since the last call
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await.expect("controller running");
        self.task.await.expect("controller task");
    }
}

pub fn image(path: &str) -> QueueItem {
    QueueItem::new(path, path, MediaKind::Image)
}

pub fn video(path: &str) -> QueueItem {
    QueueItem::new(path, path, MediaKind::Video)
}

pub fn audio(path: &str) -> QueueItem {
    QueueItem::new(path, path, MediaKind::Audio)
}
