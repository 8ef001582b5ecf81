//! Control API types shared between the player service and its clients
//!
//! Framework-free request/response bodies; the player wraps them in axum
//! handlers.

pub mod types;

pub use types::{
    FolderQueueRequest, JumpRequest, MuteRequest, QueueResponse, SearchQuery, SeekByRequest,
    SeekRequest, SetQueueRequest, SinkEventReport, StatusResponse,
};
