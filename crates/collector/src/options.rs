// ABOUTME: Configuration options for the collector and the CollectorBuilder fluent API.
// ABOUTME: Controls where configuration is read from, the fetch timeout, and the HTTP client.

use std::time::Duration;

use tracing::warn;

use crate::collector::PageCollector;
use crate::config::loader::ConfigSource;

/// Options for a [`PageCollector`].
#[derive(Debug, Clone)]
pub struct Options {
    pub config_source: ConfigSource,
    /// Upper bound on reading the configuration; `None` waits indefinitely.
    pub config_timeout: Option<Duration>,
    pub user_agent: String,
    pub http_client: Option<reqwest::Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_source: ConfigSource::default(),
            config_timeout: Some(Duration::from_secs(10)),
            user_agent: format!("PageRelay/{}", env!("CARGO_PKG_VERSION")),
            http_client: None,
        }
    }
}

impl Options {
    /// The configured client, or a new one carrying the user agent.
    pub fn http_client(&self) -> reqwest::Client {
        if let Some(client) = &self.http_client {
            return client.clone();
        }
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client, using defaults");
                reqwest::Client::new()
            })
    }
}

/// Builder for [`PageCollector`] instances.
#[derive(Debug, Clone, Default)]
pub struct CollectorBuilder {
    opts: Options,
}

impl CollectorBuilder {
    /// Create a new CollectorBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set where the configuration is read from.
    pub fn config_source(mut self, source: ConfigSource) -> Self {
        self.opts.config_source = source;
        self
    }

    /// Set (or clear) the configuration read timeout.
    pub fn config_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.opts.config_timeout = timeout;
        self
    }

    /// Set the User-Agent header used for configuration fetches.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Build the collector.
    pub fn build(self) -> PageCollector {
        PageCollector::new(self.opts)
    }
}
