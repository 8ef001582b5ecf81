//! Control API
//!
//! REST endpoints for transport and queue commands, element event reports
//! from remote sinks, library pass-through and the SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
