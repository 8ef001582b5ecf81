//! Playback: queue, controller, stream sessions, drift correction

pub mod controller;
pub mod drift;
pub mod queue_store;
pub mod scheduler;
pub mod sessions;
pub mod sink;

pub use controller::{Command, ControllerHandle, LoadStrategy, PlaybackController};
pub use drift::{DriftAction, DriftCorrector};
pub use queue_store::{Advance, QueueStore, Removal};
pub use scheduler::{TimerSlot, TimerTicket};
pub use sessions::{LoadToken, SessionResolution, StreamSessionManager};
pub use sink::{AttachmentId, MediaSink, RemoteSink, SinkEventSender, SinkMessage};
