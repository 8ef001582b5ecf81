//! Server-Sent Events (SSE) broadcaster
//!
//! Streams `PlayerEvent`s to connected clients. Remote sinks follow
//! `SinkCommand` events on this stream. A client that falls behind the event
//! bus gets a `Resync` event carrying the last published state, including what
//! each element should hold.

use crate::api::server::AppContext;
use crate::state::{PlaybackState, SharedState};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

pub const RESYNC_EVENT: &str = "Resync";

/// Sent in place of the events a lagging client missed
#[derive(Debug, Serialize)]
pub struct Resync {
    pub skipped: u64,
    pub state: PlaybackState,
}

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let rx = ctx.state.subscribe_events();
    let state = Arc::clone(&ctx.state);

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let state = Arc::clone(&state);
        async move {
            match result {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                    Err(e) => {
                        warn!("Failed to serialize event: {}", e);
                        None
                    }
                },
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("SSE client lagged by {} events, sending resync", skipped);
                    resync_event(&state, skipped).await.map(Ok)
                }
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn resync_event(state: &SharedState, skipped: u64) -> Option<Event> {
    let resync = Resync {
        skipped,
        state: state.get_playback_state().await,
    };
    match Event::default().event(RESYNC_EVENT).json_data(&resync) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Failed to serialize resync: {}", e);
            None
        }
    }
}
