// ABOUTME: Configuration loading with a once-per-instance cache and a builtin fallback.
// ABOUTME: Reads config from a file or URL; any failure resolves to the embedded default configuration.

//! Configuration loading.
//!
//! A [`ConfigResolver`] belongs to one collector instance (one page load). The
//! first call to [`ConfigResolver::load`] reads the configured source; every
//! later call returns the same cached configuration. Loading never fails: a
//! missing file, a non-success HTTP status, malformed JSON, or a timeout all
//! resolve to [`builtin_config`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::config::model::Configuration;
use crate::error::PageRelayError;

/// Well-known configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Embedded default configuration.
const BUILTIN_CONFIG_JSON: &str = include_str!("../../data/default_config.json");

/// Where the configuration is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Url(String),
    Builtin,
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::File(PathBuf::from(CONFIG_FILE_NAME))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Url(url) => write!(f, "{}", url),
            ConfigSource::Builtin => write!(f, "builtin"),
        }
    }
}

impl From<&str> for ConfigSource {
    /// `http(s)://` locations are fetched, `file://` URLs and plain strings are
    /// read from disk, and `builtin` selects the embedded default.
    fn from(s: &str) -> Self {
        if s == "builtin" {
            return ConfigSource::Builtin;
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return ConfigSource::Url(s.to_string());
        }
        if s.starts_with("file://") {
            if let Some(path) = url::Url::parse(s).ok().and_then(|u| u.to_file_path().ok()) {
                return ConfigSource::File(path);
            }
        }
        ConfigSource::File(PathBuf::from(s))
    }
}

/// Returns the embedded default configuration.
///
/// The embedded JSON is covered by tests; if it were ever malformed the
/// result is an empty configuration that matches nothing.
pub fn builtin_config() -> Configuration {
    match serde_json::from_str(BUILTIN_CONFIG_JSON) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "embedded default configuration is malformed");
            Configuration::default()
        }
    }
}

/// Loads a configuration once and caches it for the lifetime of the resolver.
#[derive(Debug)]
pub struct ConfigResolver {
    source: ConfigSource,
    http: reqwest::Client,
    timeout: Option<Duration>,
    cache: OnceCell<Arc<Configuration>>,
}

impl ConfigResolver {
    /// Creates a resolver; nothing is read until [`load`](Self::load).
    pub fn new(source: ConfigSource, http: reqwest::Client, timeout: Option<Duration>) -> Self {
        Self {
            source,
            http,
            timeout,
            cache: OnceCell::new(),
        }
    }

    /// The configured source.
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Returns true once a configuration (loaded or fallback) is cached.
    pub fn is_loaded(&self) -> bool {
        self.cache.initialized()
    }

    /// Returns the cached configuration, loading it on first use.
    pub async fn load(&self) -> Arc<Configuration> {
        self.cache
            .get_or_init(|| async { Arc::new(self.load_or_fallback().await) })
            .await
            .clone()
    }

    async fn load_or_fallback(&self) -> Configuration {
        let config = match self.try_load().await {
            Ok(config) => {
                info!(
                    source = %self.source,
                    websites = config.websites.len(),
                    "loaded configuration"
                );
                config
            }
            Err(e) => {
                warn!(error = %e, "using builtin default configuration");
                builtin_config()
            }
        };
        for issue in config.issues() {
            warn!(source = %self.source, "configuration issue: {}", issue);
        }
        config
    }

    /// Reads and parses the source without falling back.
    pub async fn try_load(&self) -> Result<Configuration, PageRelayError> {
        let read = self.read_source();
        let text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                PageRelayError::config_load(
                    self.source.to_string(),
                    "Load",
                    Some(anyhow::anyhow!("timed out after {:?}", limit)),
                )
            })??,
            None => read.await?,
        };

        serde_json::from_str(&text).map_err(|e| {
            PageRelayError::config_load(
                self.source.to_string(),
                "Parse",
                Some(anyhow::anyhow!("invalid configuration JSON: {}", e)),
            )
        })
    }

    async fn read_source(&self) -> Result<String, PageRelayError> {
        match &self.source {
            ConfigSource::Builtin => Ok(BUILTIN_CONFIG_JSON.to_string()),
            ConfigSource::File(path) => {
                debug!(path = %path.display(), "reading configuration file");
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    PageRelayError::config_load(
                        path.display().to_string(),
                        "Read",
                        Some(anyhow::anyhow!("read failed: {}", e)),
                    )
                })
            }
            ConfigSource::Url(url) => {
                debug!(url = %url, "fetching configuration");
                let response = self.http.get(url).send().await.map_err(|e| {
                    PageRelayError::config_load(
                        url.as_str(),
                        "Fetch",
                        Some(anyhow::anyhow!("request failed: {}", e)),
                    )
                })?;
                let status = response.status();
                if !status.is_success() {
                    return Err(PageRelayError::config_load(
                        url.as_str(),
                        "Fetch",
                        Some(anyhow::anyhow!("HTTP status {}", status.as_u16())),
                    ));
                }
                response.text().await.map_err(|e| {
                    PageRelayError::config_load(
                        url.as_str(),
                        "Fetch",
                        Some(anyhow::anyhow!("reading body failed: {}", e)),
                    )
                })
            }
        }
    }
}
