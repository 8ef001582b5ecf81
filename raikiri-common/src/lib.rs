//! # Raikiri Common Library
//!
//! Shared code for the Raikiri player crates:
//! - Media and library wire types
//! - Event types (PlayerEvent enum) and the EventBus
//! - Control API request/response types
//! - Configuration file resolution

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod media;

pub use error::{Error, Result};
pub use media::{LibraryMode, MediaKind, QueueContext, QueueItem};
