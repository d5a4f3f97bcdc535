//! Outbound client for the pushmill backend API.
//!
//! Thin request plumbing: delivery/interaction event reporting and device
//! token registration. Callers treat failures as non-fatal telemetry loss.

use {
    anyhow::{Context, Result, anyhow},
    reqwest::{Client, Method},
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::debug,
};

/// Default backend endpoint.
const DEFAULT_BASE_URL: &str = "https://api.pushmill.io";

/// Backend API client.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    key: Option<Secret<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl ApiClient {
    /// Create a client against the production backend.
    #[must_use]
    pub fn new(key: Option<Secret<String>>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, key)
    }

    /// Create a client against a custom backend (staging, tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, key: Option<Secret<String>>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            key,
        }
    }

    /// Build from SDK config.
    #[must_use]
    pub fn from_config(config: &pushmill_config::ApiConfig) -> Self {
        Self::with_base_url(config.base_url.clone(), config.key.clone().map(Secret::new))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.key {
            request = request.bearer_auth(key.expose_secret());
        }
        request
    }

    /// Report a delivered notification back to the backend.
    pub async fn track_delivered(&self, message_id: &str) -> Result<()> {
        self.track_event("delivered", message_id).await
    }

    /// Report that the user interacted with a notification.
    pub async fn track_clicked(&self, message_id: &str) -> Result<()> {
        self.track_event("clicked", message_id).await
    }

    async fn track_event(&self, event: &str, message_id: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "/v1/events")
            .json(&TrackEventRequest { event, message_id })
            .send()
            .await
            .context("failed to send event request")?;
        check_status(response, "event tracking").await?;
        debug!(event, message_id, "event tracked");
        Ok(())
    }

    /// Register (or refresh) a device push token for a user.
    pub async fn register_token(&self, user_id: &str, token: &str, platform: &str) -> Result<()> {
        let path = format!("/v1/users/{user_id}/tokens");
        let response = self
            .request(Method::PUT, &path)
            .json(&RegisterTokenRequest { token, platform })
            .send()
            .await
            .context("failed to send token registration request")?;
        check_status(response, "token registration").await?;
        debug!(user_id, platform, "device token registered");
        Ok(())
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("{what} request failed: {status} - {body}"))
}

// ── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackEventRequest<'a> {
    event: &'a str,
    message_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterTokenRequest<'a> {
    token: &'a str,
    platform: &'a str,
}
