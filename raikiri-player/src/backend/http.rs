//! HTTP client for the media server

use super::{MediaBackend, PlaybackSession, UploadFile};
use crate::error::{Error, Result};
use async_trait::async_trait;
use raikiri_common::media::ListEntry;
use raikiri_common::LibraryMode;
use reqwest::{Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Stream start can wait for the first transcoded segment
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamStartResponse {
    session_id: String,
    url: String,
    #[serde(default)]
    duration: Option<f64>,
}

pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self> {
        let mut base = Url::parse(server_url)
            .map_err(|e| Error::Config(format!("Invalid server_url {}: {}", server_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("raikiri-player/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, relative: &str) -> Result<Url> {
        self.base
            .join(relative)
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", relative, e)))
    }
}

/// Map non-2xx answers to `BackendStatus`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::BackendStatus {
        status: status.as_u16(),
        message: message.trim().to_string(),
    })
}

#[async_trait]
impl MediaBackend for HttpBackend {
    async fn list(&self, path: &str, mode: LibraryMode, recursive: bool) -> Result<Vec<ListEntry>> {
        let url = self.endpoint("api/list")?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("path", path),
                ("mode", mode.as_str()),
                ("recursive", if recursive { "true" } else { "false" }),
            ])
            .send()
            .await?;

        let entries: Vec<ListEntry> = check_status(response).await?.json().await?;
        debug!("Listed {} entries under {} ({})", entries.len(), path, mode.as_str());
        Ok(entries)
    }

    async fn open_stream(&self, path: &str, mode: LibraryMode) -> Result<PlaybackSession> {
        let url = self.endpoint("api/stream")?;
        let response = self
            .client
            .get(url)
            .query(&[("file", path), ("mode", mode.as_str())])
            .send()
            .await
            .map_err(|e| Error::SessionOpen(e.to_string()))?;

        let response = check_status(response)
            .await
            .map_err(|e| Error::SessionOpen(e.to_string()))?;
        let body: StreamStartResponse = response
            .json()
            .await
            .map_err(|e| Error::SessionOpen(format!("Malformed stream response: {}", e)))?;

        debug!("Stream session {} opened for {}", body.session_id, path);
        Ok(PlaybackSession {
            media_url: self.resolve_url(&body.url),
            session_id: body.session_id,
            duration_hint: body.duration.filter(|d| d.is_finite() && *d > 0.0),
        })
    }

    async fn close_stream(&self, session_id: &str) -> Result<()> {
        let url = self.endpoint("api/stop-stream")?;
        let response = self
            .client
            .get(url)
            .query(&[("session", session_id)])
            .send()
            .await
            .map_err(|e| Error::SessionClose {
                session_id: session_id.to_string(),
                reason: e.to_string(),
            })?;

        check_status(response)
            .await
            .map_err(|e| Error::SessionClose {
                session_id: session_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn upload(&self, files: Vec<UploadFile>, path: &str, mode: LibraryMode) -> Result<bool> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
            form = form.part("files", part);
        }
        form = form
            .text("path", path.to_string())
            .text("mode", mode.as_str().to_string());

        let url = self.endpoint("api/upload")?;
        let response = self.client.post(url).multipart(form).send().await?;
        Ok(response.status().is_success())
    }

    async fn sync(&self) -> Result<()> {
        let url = self.endpoint("api/sync")?;
        let response = self.client.post(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn content_url(&self, path: &str, mode: LibraryMode) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("content")
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.query_pairs_mut().append_pair("mode", mode.as_str());
        url.to_string()
    }

    fn resolve_url(&self, url: &str) -> String {
        if Url::parse(url).is_ok() {
            return url.to_string();
        }
        // Keep any path prefix the base URL carries
        self.base
            .join(url.trim_start_matches('/'))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }
}
