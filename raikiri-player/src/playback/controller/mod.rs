//! Playback controller
//!
//! **Module Structure:**
//! - `mod.rs`: commands and the [`ControllerHandle`] used to drive the controller
//! - `core.rs`: controller task, message loop, status transitions, snapshots
//! - `loading.rs`: per-kind load dispatch, session resolutions, element events
//! - `commands.rs`: transport and queue commands
//!
//! The controller is a single task that owns the queue, the sinks, the session
//! manager and every timer. Handles send it commands over a channel; timers,
//! stream-session opens and element events post back on internal channels.
//! Nothing else mutates playback state.

mod commands;
mod core;
mod loading;

pub use self::core::PlaybackController;
pub use self::loading::LoadStrategy;

use super::sink::{SinkEventSender, SinkMessage};
use crate::error::{Error, Result};
use crate::state::PlaybackState;
use raikiri_common::api::QueueResponse;
use raikiri_common::{QueueContext, QueueItem};
use tokio::sync::{mpsc, oneshot};

/// Public controller commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the queue; `start_index` must be in bounds unless `items` is empty
    SetQueue {
        items: Vec<QueueItem>,
        start_index: i64,
        context: QueueContext,
    },
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// Tear everything down and clear the queue
    Stop,
    JumpTo(usize),
    /// Seek to a percentage of the duration (clamped to 0..=100)
    Seek(f64),
    /// Seek relative to the current position, in seconds
    SeekBy(f64),
    RemoveAt(usize),
    SetMuted(bool),
}

pub(crate) enum Request {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Snapshot(oneshot::Sender<PlaybackState>),
    Queue(oneshot::Sender<QueueResponse>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Request>,
    sink_events: SinkEventSender,
}

impl ControllerHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Request>,
        sink_tx: mpsc::UnboundedSender<SinkMessage>,
    ) -> Self {
        Self {
            tx,
            sink_events: SinkEventSender::new(sink_tx),
        }
    }

    /// Run a command and wait for it to take effect
    pub async fn execute(&self, command: Command) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Command {
                command,
                reply: Some(reply),
            })
            .map_err(|_| Error::ControllerGone)?;
        rx.await.map_err(|_| Error::ControllerGone)?
    }

    /// Queue a command without waiting; errors are logged by the controller
    pub fn dispatch(&self, command: Command) -> Result<()> {
        self.tx
            .send(Request::Command {
                command,
                reply: None,
            })
            .map_err(|_| Error::ControllerGone)
    }

    pub async fn set_queue(
        &self,
        items: Vec<QueueItem>,
        start_index: i64,
        context: QueueContext,
    ) -> Result<()> {
        self.execute(Command::SetQueue {
            items,
            start_index,
            context,
        })
        .await
    }

    pub async fn play(&self) -> Result<()> {
        self.execute(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.execute(Command::Pause).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.execute(Command::Toggle).await
    }

    pub async fn next(&self) -> Result<()> {
        self.execute(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.execute(Command::Previous).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.execute(Command::Stop).await
    }

    pub async fn jump_to(&self, index: usize) -> Result<()> {
        self.execute(Command::JumpTo(index)).await
    }

    pub async fn seek(&self, percent: f64) -> Result<()> {
        self.execute(Command::Seek(percent)).await
    }

    pub async fn seek_by(&self, seconds: f64) -> Result<()> {
        self.execute(Command::SeekBy(seconds)).await
    }

    pub async fn remove_at(&self, index: usize) -> Result<()> {
        self.execute(Command::RemoveAt(index)).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.execute(Command::SetMuted(muted)).await
    }

    /// State after every previously sent command has been applied
    pub async fn snapshot(&self) -> Result<PlaybackState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot(reply))
            .map_err(|_| Error::ControllerGone)?;
        rx.await.map_err(|_| Error::ControllerGone)
    }

    pub async fn queue(&self) -> Result<QueueResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Queue(reply))
            .map_err(|_| Error::ControllerGone)?;
        rx.await.map_err(|_| Error::ControllerGone)
    }

    /// Element event channel, for sinks whose events arrive out of process
    pub fn sink_events(&self) -> &SinkEventSender {
        &self.sink_events
    }

    /// Stop playback, release every session and wait for the task to finish
    ///
    /// Returns once in-flight session opens and closes have completed.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Shutdown(reply))
            .map_err(|_| Error::ControllerGone)?;
        rx.await.map_err(|_| Error::ControllerGone)
    }
}
