//! # Raikiri Player Library (raikiri-player)
//!
//! Playback controller for a Raikiri media server.
//!
//! **Purpose:** Own an ordered queue of mixed media (images, audio, video),
//! drive at most one item at a time through an audio or video element,
//! manage server-side stream sessions, and expose control over HTTP/SSE.
//!
//! **Architecture:** A single controller task owns all playback state;
//! handles, timers, session opens and element events talk to it over channels.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod media_session;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use playback::{Command, ControllerHandle, PlaybackController};
pub use state::{PlaybackState, SharedState};
