//! Attachment download and materialization.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use {
    async_trait::async_trait,
    pushmill_config::EnrichConfig,
    tokio::{fs, io::AsyncWriteExt},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
    url::Url,
    uuid::Uuid,
};

use crate::error::{Error, Result};

/// A downloaded media file ready for display.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub path: PathBuf,
}

/// Source of display attachments.
///
/// The production implementation downloads over HTTP; coordinator tests
/// substitute scripted fetchers.
#[async_trait]
pub trait AttachmentFetch: Send + Sync {
    /// Fetch `url` into local storage.
    ///
    /// Resolves to `None` on failure or cancellation; enrichment continues
    /// without an attachment either way. Cancellation removes any partially
    /// written file.
    async fn fetch(&self, url: Url, cancel: CancellationToken) -> Option<Attachment>;
}

/// Streaming HTTP downloader writing into a media directory.
pub struct HttpAttachmentFetcher {
    client: reqwest::Client,
    media_dir: PathBuf,
}

impl HttpAttachmentFetcher {
    pub fn new(media_dir: PathBuf) -> Self {
        Self::with_client(reqwest::Client::new(), media_dir)
    }

    /// Use an existing client (shared pool, custom timeout).
    pub fn with_client(client: reqwest::Client, media_dir: PathBuf) -> Self {
        Self { client, media_dir }
    }

    /// Build from SDK config: per-download timeout and media directory.
    pub fn from_config(config: &EnrichConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .unwrap_or_default();
        Self::with_client(client, config.resolved_media_dir())
    }

    async fn download(&self, url: &Url, cancel: &CancellationToken) -> Result<Option<Attachment>> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch("request failed", e))?;

        if !response.status().is_success() {
            return Err(Error::FetchStatus {
                status: response.status(),
            });
        }

        let id = Uuid::new_v4();
        let file_name = format!("{id}-{}", suggested_name(&response, url));
        fs::create_dir_all(&self.media_dir).await?;
        let path = self.media_dir.join(&file_name);
        let file = fs::File::create(&path).await?;

        match stream_body(&mut response, file, cancel).await {
            Ok(true) => {
                debug!(file = %path.display(), "attachment downloaded");
                Ok(Some(Attachment {
                    id,
                    file_name,
                    path,
                }))
            },
            Ok(false) => {
                debug!(%url, "attachment download cancelled");
                remove_partial(&path).await;
                Ok(None)
            },
            Err(e) => {
                remove_partial(&path).await;
                Err(e)
            },
        }
    }
}

#[async_trait]
impl AttachmentFetch for HttpAttachmentFetcher {
    async fn fetch(&self, url: Url, cancel: CancellationToken) -> Option<Attachment> {
        match self.download(&url, &cancel).await {
            Ok(attachment) => attachment,
            Err(e) => {
                warn!(%url, error = %e, "attachment download failed, continuing without it");
                None
            },
        }
    }
}

/// Stream the response body to `file`, checking for cancellation between
/// chunks. Returns false when cancelled.
async fn stream_body(
    response: &mut reqwest::Response,
    mut file: fs::File,
    cancel: &CancellationToken,
) -> Result<bool> {
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            chunk = response.chunk() => {
                chunk.map_err(|e| Error::fetch("body read failed", e))?
            },
        };
        match chunk {
            Some(bytes) => file.write_all(&bytes).await?,
            None => break,
        }
    }
    file.flush().await?;
    Ok(true)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        debug!(file = %path.display(), error = %e, "could not remove partial attachment");
    }
}

/// Server-suggested filename, falling back to the URL's last path segment.
fn suggested_name(response: &reqwest::Response, url: &Url) -> String {
    if let Some(name) = content_disposition_filename(response) {
        return name;
    }
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| "attachment".to_owned())
}

fn content_disposition_filename(response: &reqwest::Response) -> Option<String> {
    let header = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    let raw = header
        .split(';')
        .find_map(|part| part.trim().strip_prefix("filename="))?;
    let name = raw.trim().trim_matches('"');
    (!name.is_empty()).then(|| name.to_owned())
}
