//! HTTP request handlers
//!
//! Thin wrappers over the controller handle and the media backend. Every
//! command goes through the controller; nothing here touches playback state
//! directly.

use crate::api::server::AppContext;
use crate::backend::UploadFile;
use crate::error::Error;
use crate::playback::Command;
use crate::state::{PlaybackState, SinkView};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use raikiri_common::api::{
    FolderQueueRequest, JumpRequest, MuteRequest, QueueResponse, SearchQuery, SeekByRequest,
    SeekRequest, SetQueueRequest, SinkEventReport, StatusResponse,
};
use raikiri_common::events::SinkKind;
use raikiri_common::media::{BrowseListing, ListEntry};
use raikiri_common::{LibraryMode, QueueContext, QueueItem};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub type ApiError = (StatusCode, Json<StatusResponse>);
pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    #[serde(default = "root_path")]
    pub path: String,
    pub mode: Option<LibraryMode>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "root_path")]
    pub path: String,
    pub mode: Option<LibraryMode>,
    pub file_name: String,
}

fn root_path() -> String {
    "/".to_string()
}

fn api_error(error: Error) -> ApiError {
    let status = match &error {
        Error::InvalidIndex { .. } | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Common(raikiri_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        Error::ControllerGone => StatusCode::SERVICE_UNAVAILABLE,
        Error::Backend(_) | Error::BackendStatus { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (status, Json(StatusResponse::new(format!("error: {}", error))))
}

async fn run_command(ctx: &AppContext, command: Command) -> ApiResult<StatusResponse> {
    ctx.controller.execute(command).await.map_err(api_error)?;
    Ok(Json(StatusResponse::new("ok")))
}

// ============================================================================
// Health / state
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "raikiri-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/state
///
/// Falls back to the last published snapshot once the controller has stopped.
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackState> {
    match ctx.controller.snapshot().await {
        Ok(state) => Json(state),
        Err(_) => Json(ctx.state.get_playback_state().await),
    }
}

// ============================================================================
// Queue
// ============================================================================

/// GET /playback/queue
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    match ctx.controller.queue().await {
        Ok(queue) => Json(queue),
        Err(_) => Json(ctx.state.get_queue().await),
    }
}

/// POST /playback/queue
pub async fn set_queue(
    State(ctx): State<AppContext>,
    Json(req): Json<SetQueueRequest>,
) -> ApiResult<QueueResponse> {
    info!("Set queue: {} items, start {}", req.items.len(), req.start_index);
    ctx.controller
        .set_queue(req.items, req.start_index, req.context)
        .await
        .map_err(api_error)?;
    ctx.controller.queue().await.map(Json).map_err(api_error)
}

/// POST /playback/queue/folder
///
/// Builds a queue from a folder's playable entries (optionally recursive and
/// shuffled) and starts at `start_path`, or the first item.
pub async fn queue_folder(
    State(ctx): State<AppContext>,
    Json(req): Json<FolderQueueRequest>,
) -> ApiResult<QueueResponse> {
    let mode = req.mode.unwrap_or(ctx.library_mode);

    let mut items: Vec<QueueItem> = if req.recursive {
        ctx.backend
            .list(&req.path, mode, true)
            .await
            .map_err(api_error)?
            .iter()
            .filter_map(ListEntry::to_queue_item)
            .collect()
    } else {
        ctx.backend
            .browse(&req.path, mode)
            .await
            .map_err(api_error)?
            .playable
    };

    if req.shuffle {
        items.shuffle(&mut rand::thread_rng());
    }

    let start_index = match &req.start_path {
        _ if items.is_empty() => -1,
        Some(start) => items
            .iter()
            .position(|item| &item.path == start)
            .unwrap_or(0) as i64,
        None => 0,
    };

    info!(
        "Queue folder {} ({} items, recursive={}, shuffle={})",
        req.path,
        items.len(),
        req.recursive,
        req.shuffle
    );
    let context = QueueContext::for_directory(&req.path, mode);
    ctx.controller
        .set_queue(items, start_index, context)
        .await
        .map_err(api_error)?;
    ctx.controller.queue().await.map(Json).map_err(api_error)
}

/// DELETE /playback/queue/:index
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::RemoveAt(index)).await
}

// ============================================================================
// Transport
// ============================================================================

/// POST /playback/play
pub async fn play(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Play).await
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Pause).await
}

/// POST /playback/toggle
pub async fn toggle(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Toggle).await
}

/// POST /playback/next
pub async fn skip_next(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Next).await
}

/// POST /playback/previous
pub async fn skip_previous(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Previous).await
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Stop).await
}

/// POST /playback/jump
pub async fn jump(
    State(ctx): State<AppContext>,
    Json(req): Json<JumpRequest>,
) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::JumpTo(req.index)).await
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::Seek(req.percent)).await
}

/// POST /playback/seek-by
pub async fn seek_by(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekByRequest>,
) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::SeekBy(req.seconds)).await
}

/// POST /playback/mute
pub async fn set_muted(
    State(ctx): State<AppContext>,
    Json(req): Json<MuteRequest>,
) -> ApiResult<StatusResponse> {
    run_command(&ctx, Command::SetMuted(req.muted)).await
}

// ============================================================================
// Element events
// ============================================================================

/// GET /media/:sink
///
/// What the element should hold right now; a page that missed directives
/// re-attaches from this.
pub async fn get_sink(
    State(ctx): State<AppContext>,
    Path(sink): Path<String>,
) -> ApiResult<SinkView> {
    let kind = parse_sink(&sink)?;
    let state = match ctx.controller.snapshot().await {
        Ok(state) => state,
        Err(_) => ctx.state.get_playback_state().await,
    };
    Ok(Json(state.sink(kind).clone()))
}

/// POST /media/:sink/events
///
/// Element events from a remote sink. Reports for an old attachment are
/// accepted and dropped by the controller.
pub async fn report_sink_event(
    State(ctx): State<AppContext>,
    Path(sink): Path<String>,
    Json(report): Json<SinkEventReport>,
) -> ApiResult<StatusResponse> {
    let kind = parse_sink(&sink)?;

    if !ctx
        .controller
        .sink_events()
        .send(kind, report.attachment, report.event)
    {
        return Err(api_error(Error::ControllerGone));
    }
    Ok(Json(StatusResponse::new("ok")))
}

fn parse_sink(sink: &str) -> Result<SinkKind, ApiError> {
    sink.parse()
        .map_err(|e: raikiri_common::Error| api_error(e.into()))
}

// ============================================================================
// Library
// ============================================================================

/// GET /library/browse?path=&mode=
pub async fn browse(
    State(ctx): State<AppContext>,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<BrowseListing> {
    let mode = query.mode.unwrap_or(ctx.library_mode);
    ctx.backend
        .browse(&query.path, mode)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /library/search?q=&mode=
pub async fn search(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ListEntry>> {
    let mode = query.mode.unwrap_or(ctx.library_mode);
    ctx.backend
        .search(&query.q, mode)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /library/sync
pub async fn sync_library(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    ctx.backend.sync().await.map_err(api_error)?;
    info!("Library sync requested");
    Ok(Json(StatusResponse::new("ok")))
}

/// POST /library/upload?path=&mode=&file_name=
///
/// Relays one file (the raw request body) to the media server.
pub async fn upload_file(
    State(ctx): State<AppContext>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<StatusResponse> {
    if query.file_name.trim().is_empty() || body.is_empty() {
        return Err(api_error(Error::BadRequest(
            "upload needs a file name and content".to_string(),
        )));
    }
    let mode = query.mode.unwrap_or(ctx.library_mode);
    let file = UploadFile {
        file_name: query.file_name,
        bytes: body.to_vec(),
    };

    let accepted = ctx
        .backend
        .upload(vec![file], &query.path, mode)
        .await
        .map_err(api_error)?;
    if !accepted {
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(StatusResponse::new("error: upload rejected by server")),
        ));
    }
    info!("Uploaded file into {}", query.path);
    Ok(Json(StatusResponse::new("ok")))
}
