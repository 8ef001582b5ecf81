//! HTTP server setup and routing
//!
//! Sets up the axum router for the control API, element event reports and SSE.

use crate::backend::MediaBackend;
use crate::error::{Error, Result};
use crate::playback::ControllerHandle;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use raikiri_common::LibraryMode;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub controller: ControllerHandle,
    pub backend: Arc<dyn MediaBackend>,
    /// Library used when a request does not name one
    pub library_mode: LibraryMode,
}

/// Build the control API router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        // Playback state and queue
        .route("/playback/state", get(super::handlers::get_playback_state))
        .route(
            "/playback/queue",
            get(super::handlers::get_queue).post(super::handlers::set_queue),
        )
        .route("/playback/queue/folder", post(super::handlers::queue_folder))
        .route("/playback/queue/:index", delete(super::handlers::remove_from_queue))
        // Transport
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/toggle", post(super::handlers::toggle))
        .route("/playback/next", post(super::handlers::skip_next))
        .route("/playback/previous", post(super::handlers::skip_previous))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/jump", post(super::handlers::jump))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/seek-by", post(super::handlers::seek_by))
        .route("/playback/mute", post(super::handlers::set_muted))
        // Element event reports from remote sinks
        .route("/media/:sink", get(super::handlers::get_sink))
        .route("/media/:sink/events", post(super::handlers::report_sink_event))
        // Library pass-through
        .route("/library/browse", get(super::handlers::browse))
        .route("/library/search", get(super::handlers::search))
        .route("/library/sync", post(super::handlers::sync_library))
        .route("/library/upload", post(super::handlers::upload_file))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        // Remote sinks run in a browser on another origin
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Serve the control API until `shutdown` resolves
pub async fn run<F>(ctx: AppContext, bind_addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| Error::Config(format!("invalid bind address {}: {}", bind_addr, e)))?;

    let app = build_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
