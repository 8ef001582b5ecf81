//! Error types for raikiri-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Which variants are surfaced, swallowed or fatal is decided by the caller:
//! session-close and OS-integration failures are logged and dropped, load
//! failures become `PlaybackLoadError` events, index errors fail the command.

use thiserror::Error;

/// Main error type for raikiri-player
#[derive(Error, Debug)]
pub enum Error {
    /// Queue position out of range
    #[error("Invalid index {index} for queue of length {len}")]
    InvalidIndex { index: i64, len: usize },

    /// The streaming backend refused or failed to open a session
    #[error("Failed to open stream session: {0}")]
    SessionOpen(String),

    /// Releasing a stream session failed (best-effort, never surfaced)
    #[error("Failed to close stream session {session_id}: {reason}")]
    SessionClose { session_id: String, reason: String },

    /// A media element rejected its source
    #[error("Media attach failed: {0}")]
    MediaAttach(String),

    /// Item kind the player cannot render
    #[error("Unsupported media kind for {0}")]
    UnsupportedKind(String),

    /// OS now-playing integration absent or failed
    #[error("OS media integration unsupported: {0}")]
    OsIntegrationUnsupported(String),

    /// HTTP request to the media server failed
    #[error("Backend error: {0}")]
    Backend(#[from] reqwest::Error),

    /// Media server answered with an unexpected status
    #[error("Backend returned {status}: {message}")]
    BackendStatus { status: u16, message: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request the control API cannot act on (missing or empty input)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The controller task has stopped
    #[error("Playback controller is no longer running")]
    ControllerGone,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared-crate errors (config files, parsing)
    #[error(transparent)]
    Common(#[from] raikiri_common::Error),
}

/// Convenience Result type using raikiri-player Error
pub type Result<T> = std::result::Result<T, Error>;
