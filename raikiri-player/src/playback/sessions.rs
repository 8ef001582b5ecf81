//! Stream Session Manager
//!
//! Opens and releases remote transcode sessions for video items. At most one
//! session is live. Opens run as spawned tasks that report back to the
//! controller; an open that resolves for a superseded load is closed, never
//! adopted.
//!
//! Every successful open is matched by exactly one close. Exactly one of these
//! paths closes a session:
//! - the open task, when interest moved on before the open resolved
//! - the open task, when the controller is gone
//! - [`StreamSessionManager::resolve`], when interest moved on while the
//!   resolution was queued
//! - [`StreamSessionManager::release`], for the live session

use crate::backend::{MediaBackend, PlaybackSession};
use crate::error::Result;
use raikiri_common::events::{EventBus, PlayerEvent};
use raikiri_common::LibraryMode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Identifies one entry into `Loading`
pub type LoadToken = u64;

/// No load is interested in a session
const NO_INTEREST: LoadToken = 0;

/// Outcome of an open, delivered to the controller
#[derive(Debug)]
pub struct SessionResolution {
    pub token: LoadToken,
    pub path: String,
    pub result: Result<PlaybackSession>,
}

pub struct StreamSessionManager {
    backend: Arc<dyn MediaBackend>,
    mode: LibraryMode,
    bus: EventBus,
    /// Load token the open tasks compare against
    interest: Arc<AtomicU64>,
    pending: Option<LoadToken>,
    live: Option<PlaybackSession>,
    tasks: JoinSet<()>,
}

impl StreamSessionManager {
    pub fn new(backend: Arc<dyn MediaBackend>, mode: LibraryMode, bus: EventBus) -> Self {
        Self {
            backend,
            mode,
            bus,
            interest: Arc::new(AtomicU64::new(NO_INTEREST)),
            pending: None,
            live: None,
            tasks: JoinSet::new(),
        }
    }

    /// Start opening a session for `path` on behalf of load `token`
    ///
    /// Any live session must have been released first. The resolution is
    /// posted through `tx` as `make(resolution)`.
    pub fn request<M, F>(&mut self, path: &str, token: LoadToken, tx: &UnboundedSender<M>, make: F)
    where
        M: Send + 'static,
        F: FnOnce(SessionResolution) -> M + Send + 'static,
    {
        self.reap();
        if self.live.is_some() {
            self.release();
        }
        self.interest.store(token, Ordering::SeqCst);
        self.pending = Some(token);

        let backend = Arc::clone(&self.backend);
        let interest = Arc::clone(&self.interest);
        let bus = self.bus.clone();
        let tx = tx.clone();
        let mode = self.mode;
        let path = path.to_string();
        debug!("Requesting stream session for {} (load {})", path, token);

        self.tasks.spawn(async move {
            let result = backend.open_stream(&path, mode).await;

            // Controller gone or interest moved on: nobody else will see this session
            if interest.load(Ordering::SeqCst) != token || tx.is_closed() {
                if let Ok(session) = result {
                    debug!(
                        "Stream session {} for {} resolved after load {} was superseded",
                        session.session_id, path, token
                    );
                    close_session(backend.as_ref(), &bus, &session.session_id).await;
                }
                return;
            }

            let _ = tx.send(make(SessionResolution {
                token,
                path,
                result,
            }));
        });
    }

    /// Accept or discard a resolution posted by [`request`](Self::request)
    ///
    /// Returns `None` for a stale resolution (its session, if any, is closed).
    pub fn resolve(&mut self, resolution: SessionResolution) -> Option<Result<PlaybackSession>> {
        let SessionResolution {
            token,
            path,
            result,
        } = resolution;

        if self.pending != Some(token) {
            if let Ok(session) = result {
                debug!(
                    "Discarding stream session {} for superseded load {}",
                    session.session_id, token
                );
                self.spawn_close(session.session_id);
            }
            return None;
        }

        self.pending = None;
        match result {
            Ok(session) => {
                info!("Stream session {} live for {}", session.session_id, path);
                self.bus.emit_lossy(PlayerEvent::SessionOpened {
                    session_id: session.session_id.clone(),
                    path,
                    timestamp: chrono::Utc::now(),
                });
                self.live = Some(session.clone());
                Some(Ok(session))
            }
            Err(e) => {
                self.interest.store(NO_INTEREST, Ordering::SeqCst);
                Some(Err(e))
            }
        }
    }

    /// Close the live session and abandon any pending open; idempotent
    pub fn release(&mut self) {
        self.interest.store(NO_INTEREST, Ordering::SeqCst);
        if let Some(token) = self.pending.take() {
            debug!("Abandoning stream session request for load {}", token);
        }
        if let Some(session) = self.live.take() {
            self.spawn_close(session.session_id);
        }
        self.reap();
    }

    pub fn live(&self) -> Option<&PlaybackSession> {
        self.live.as_ref()
    }

    /// Release everything and wait for in-flight opens and closes
    pub async fn shutdown(&mut self) {
        self.release();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Stream session task failed: {}", e);
            }
        }
    }

    fn spawn_close(&mut self, session_id: String) {
        let backend = Arc::clone(&self.backend);
        let bus = self.bus.clone();
        self.tasks.spawn(async move {
            close_session(backend.as_ref(), &bus, &session_id).await;
        });
    }

    /// Drop finished tasks
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                warn!("Stream session task failed: {}", e);
            }
        }
    }
}

async fn close_session(backend: &dyn MediaBackend, bus: &EventBus, session_id: &str) {
    match backend.close_stream(session_id).await {
        Ok(()) => debug!("Stream session {} closed", session_id),
        Err(e) => warn!("{}", e),
    }
    bus.emit_lossy(PlayerEvent::SessionClosed {
        session_id: session_id.to_string(),
        timestamp: chrono::Utc::now(),
    });
}
