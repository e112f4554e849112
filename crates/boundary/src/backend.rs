// ABOUTME: The backend relay: acknowledges page data, POSTs it to the backend, and forwards injections.
// ABOUTME: Delivery is fire-and-forget; failures are logged and never retried.

//! Backend relay.
//!
//! [`BackendRelay`] is the privileged side of the relay boundary. Receiving a
//! `pageData` message it acknowledges immediately, then, on a background task:
//!
//! 1. reads the backend URL (fixed, or from the settings store on every send),
//! 2. POSTs the record as JSON,
//! 3. if the JSON reply carries a non-empty `injectHtml` string, sends an
//!    `injectHtml` message back to the page over the page channel.
//!
//! Missing backend URL, network errors, non-success statuses and malformed
//! replies are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagerelay_collector::{Ack, Message, PageData, PageRelayError, Relay};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::settings::SettingsStore;

/// Where the backend URL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    Fixed(String),
    /// Read before every delivery, so edits take effect without a restart.
    Stored(SettingsStore),
}

/// Extracts the markup to inject from a backend reply.
pub fn injection_from_reply(reply: &Value) -> Option<String> {
    match reply.get("injectHtml") {
        Some(Value::String(html)) if !html.is_empty() => Some(html.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => {
            warn!(value = %other, "ignoring non-string injectHtml in backend reply");
            None
        }
    }
}

/// Relay that forwards page data to the user's backend.
#[derive(Debug, Clone)]
pub struct BackendRelay {
    http: reqwest::Client,
    target: Option<Arc<BackendTarget>>,
    page: UnboundedSender<Message>,
}

impl BackendRelay {
    /// Create a new BackendRelayBuilder.
    pub fn builder() -> BackendRelayBuilder {
        BackendRelayBuilder::new()
    }

    /// The backend URL for the next delivery, if one is configured.
    pub async fn backend_url(&self) -> Option<String> {
        match self.target.as_deref()? {
            BackendTarget::Fixed(url) => Some(url.clone()).filter(|u| !u.trim().is_empty()),
            BackendTarget::Stored(store) => match store.backend_url().await {
                Ok(url) => url,
                Err(e) => {
                    error!(error = %e, "failed to read settings");
                    None
                }
            },
        }
    }

    /// POSTs `data` to the backend and returns the markup to inject, if any.
    ///
    /// `Ok(None)` covers both "no backend configured" and "reply without
    /// `injectHtml`".
    pub async fn deliver(&self, data: &PageData) -> Result<Option<String>, PageRelayError> {
        let Some(url) = self.backend_url().await else {
            warn!("no backend URL set, page data not sent");
            return Ok(None);
        };

        let endpoint = url::Url::parse(&url).map_err(|e| {
            PageRelayError::relay(url.as_str(), "Deliver", Some(anyhow::anyhow!("invalid backend URL: {}", e)))
        })?;
        let response = self.http.post(endpoint).json(data).send().await.map_err(|e| {
            PageRelayError::relay(url.as_str(), "Deliver", Some(anyhow::anyhow!("request failed: {}", e)))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageRelayError::relay(
                url.as_str(),
                "Deliver",
                Some(anyhow::anyhow!(
                    "backend request failed: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )),
            ));
        }

        let reply: Value = response.json().await.map_err(|e| {
            PageRelayError::relay(
                url.as_str(),
                "Deliver",
                Some(anyhow::anyhow!("malformed backend reply: {}", e)),
            )
        })?;
        debug!(url = %url, "backend accepted page data");
        Ok(injection_from_reply(&reply))
    }

    async fn forward(&self, data: PageData) {
        match self.deliver(&data).await {
            Ok(Some(html)) => {
                info!(bytes = html.len(), "backend returned HTML to inject");
                if self.page.send(Message::InjectHtml { html }).is_err() {
                    error!("failed to send injectHtml message: page channel closed");
                }
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "error handling page data"),
        }
    }
}

#[async_trait]
impl Relay for BackendRelay {
    async fn send(&self, message: Message) -> Result<Ack, PageRelayError> {
        match message {
            Message::PageData { data } => {
                let relay = self.clone();
                tokio::spawn(async move { relay.forward(data).await });
                Ok(Ack::ok())
            }
            Message::InjectHtml { .. } => Err(PageRelayError::relay(
                "backend",
                "Send",
                Some(anyhow::anyhow!("injectHtml is sent to pages, not received from them")),
            )),
        }
    }
}

/// Builder for [`BackendRelay`].
#[derive(Debug, Clone)]
pub struct BackendRelayBuilder {
    timeout: Duration,
    user_agent: String,
    http_client: Option<reqwest::Client>,
    target: Option<BackendTarget>,
}

impl BackendRelayBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("PageRelay/{}", env!("CARGO_PKG_VERSION")),
            http_client: None,
            target: None,
        }
    }

    /// Set the request timeout for backend calls.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Always deliver to `url`.
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.target = Some(BackendTarget::Fixed(url.into()));
        self
    }

    /// Read the backend URL from `store` before each delivery.
    pub fn settings(mut self, store: SettingsStore) -> Self {
        self.target = Some(BackendTarget::Stored(store));
        self
    }

    /// Build the relay; injection messages are sent to `page`.
    pub fn build(self, page: UnboundedSender<Message>) -> BackendRelay {
        let target = self
            .target
            .or_else(|| SettingsStore::default_location().map(|p| BackendTarget::Stored(SettingsStore::open(p))));
        let http = self.http_client.unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()
                .unwrap_or_else(|e| {
                    warn!(error = %e, "failed to build HTTP client, using defaults");
                    reqwest::Client::new()
                })
        });
        BackendRelay {
            http,
            target: target.map(Arc::new),
            page,
        }
    }
}

impl Default for BackendRelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
