// ABOUTME: The page collector: one collection cycle per page load (Idle -> Collecting -> Done).
// ABOUTME: Loads configuration, matches rules, extracts fields into PageData and relays it once.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::loader::ConfigResolver;
use crate::config::model::{Configuration, FieldSelector};
use crate::config::resolve::find_matching_config;
use crate::dom::page::Page;
use crate::dom::selectors::precompile_selectors;
use crate::extract::extract_field;
use crate::message::{Ack, Message, PageData};
use crate::options::{CollectorBuilder, Options};
use crate::relay::Relay;

/// Lifecycle of one page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Collecting,
    Done,
}

/// Result of [`PageCollector::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    /// No rule matched, or the matched rule has nothing to collect.
    Skipped,
    /// The record was handed to the relay and acknowledged.
    Relayed { data: PageData, ack: Ack },
    /// The relay rejected the record; it is not retried.
    RelayFailed { data: PageData },
    /// This collector already ran for its page load.
    AlreadyCollected,
}

impl CollectOutcome {
    /// The collected record, if one was built.
    pub fn data(&self) -> Option<&PageData> {
        match self {
            CollectOutcome::Relayed { data, .. } | CollectOutcome::RelayFailed { data } => Some(data),
            _ => None,
        }
    }
}

/// Builds the record for `page` from an already loaded configuration.
///
/// Returns `None` when no website matches, the matched website has no page
/// rules, no page rule matches, or the page rule declares no fields. Fields
/// are extracted in declaration order; a repeated name keeps the last value.
pub fn build_page_data(page: &Page, config: &Configuration, at: DateTime<Utc>) -> Option<PageData> {
    let Some(matched) = find_matching_config(page.url(), config) else {
        info!(url = %page.url(), "no matching configuration, nothing collected");
        return None;
    };
    let Some(rule) = matched.page else {
        info!(url = %page.url(), website = %matched.website.url_pattern, "matched website has no page rules");
        return None;
    };
    if rule.fields.is_empty() {
        info!(url = %page.url(), page = %rule.path_pattern, "matched page rule has no fields");
        return None;
    }

    precompile_selectors(rule.fields.iter().filter_map(|f| match &f.selector {
        FieldSelector::Css(css) => Some(css.as_str()),
        FieldSelector::Selection => None,
    }));

    let mut data = PageData::new(page.url(), at);
    for field in &rule.fields {
        let value = extract_field(page, field);
        debug!(field = %field.name, kind = %field.kind.tag(), "extracted field");
        data.insert(field.name.clone(), value);
    }
    Some(data)
}

/// Collects one page load.
///
/// A collector corresponds to one page context: it owns the configuration
/// cache for that context and runs its collection cycle at most once.
#[derive(Debug)]
pub struct PageCollector {
    resolver: ConfigResolver,
    state: Mutex<CollectorState>,
}

impl PageCollector {
    /// Create a collector from options; configuration is read lazily.
    pub fn new(opts: Options) -> Self {
        let http = opts.http_client();
        Self {
            resolver: ConfigResolver::new(opts.config_source, http, opts.config_timeout),
            state: Mutex::new(CollectorState::Idle),
        }
    }

    /// Create a new CollectorBuilder.
    pub fn builder() -> CollectorBuilder {
        CollectorBuilder::new()
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn state(&self) -> CollectorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, from: CollectorState, to: CollectorState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    /// Builds the record for `page` without relaying it or changing state.
    pub async fn collect(&self, page: &Page) -> Option<PageData> {
        let config = self.resolver.load().await;
        build_page_data(page, &config, Utc::now())
    }

    /// Runs the collection cycle and hands the record to `relay` exactly once.
    pub async fn run(&self, page: &Page, relay: &dyn Relay) -> CollectOutcome {
        if !self.transition(CollectorState::Idle, CollectorState::Collecting) {
            debug!(url = %page.url(), "collection already ran for this page load");
            return CollectOutcome::AlreadyCollected;
        }

        let outcome = match self.collect(page).await {
            None => CollectOutcome::Skipped,
            Some(data) => {
                let message = Message::PageData { data: data.clone() };
                match relay.send(message).await {
                    Ok(ack) => {
                        if !ack.success {
                            warn!(url = %page.url(), "relay did not acknowledge page data");
                        }
                        CollectOutcome::Relayed { data, ack }
                    }
                    Err(e) => {
                        warn!(url = %page.url(), error = %e, "failed to relay page data");
                        CollectOutcome::RelayFailed { data }
                    }
                }
            }
        };

        self.transition(CollectorState::Collecting, CollectorState::Done);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ConfigSource;
    use crate::error::PageRelayError;
    use crate::relay::RecordingRelay;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct FailingRelay;

    #[async_trait]
    impl Relay for FailingRelay {
        async fn send(&self, _message: Message) -> Result<Ack, PageRelayError> {
            Err(PageRelayError::relay("test", "Send", Some(anyhow::anyhow!("channel closed"))))
        }
    }

    fn config(value: serde_json::Value) -> Configuration {
        serde_json::from_value(value).unwrap()
    }

    fn scenario_a() -> serde_json::Value {
        json!({"websites": [{
            "urlPattern": "file:///*",
            "pages": [{
                "pathPattern": "*test.html",
                "fields": [{"name": "title", "selector": "title", "type": "text"}]
            }]
        }]})
    }

    fn collector_with(dir: &TempDir, value: serde_json::Value) -> PageCollector {
        let path = dir.path().join("config.json");
        fs::write(&path, value.to_string()).unwrap();
        PageCollector::builder()
            .config_source(ConfigSource::File(path))
            .build()
    }

    #[test]
    fn test_builds_scenario_a_record() {
        let page = Page::new("file:///tmp/test.html", "<title>Hi</title>");
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let data = build_page_data(&page, &config(scenario_a()), at).unwrap();
        assert_eq!(data.timestamp(), Some("2024-01-02T03:04:05.000Z"));
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "url": "file:///tmp/test.html",
                "timestamp": "2024-01-02T03:04:05.000Z",
                "title": "Hi"
            })
        );
    }

    #[test]
    fn test_skips_pages_without_rules_or_fields() {
        let at = Utc::now();
        let page = Page::new("https://example.com/x", "<title>Hi</title>");

        assert!(build_page_data(&page, &config(scenario_a()), at).is_none());
        assert!(build_page_data(
            &page,
            &config(json!({"websites": [{"urlPattern": "*://example.com/*"}]})),
            at
        )
        .is_none());
        assert!(build_page_data(
            &page,
            &config(json!({"websites": [{"urlPattern": "*://example.com/*", "pages": [{"pathPattern": "/x"}]}]})),
            at
        )
        .is_none());
    }

    #[test]
    fn test_duplicate_field_names_keep_last_value() {
        let page = Page::new("https://example.com/", "<h1>one</h1><h2>two</h2>");
        let cfg = config(json!({"websites": [{"urlPattern": "*://example.com/*", "pages": [{
            "pathPattern": "/",
            "fields": [
                {"name": "heading", "selector": "h1"},
                {"name": "heading", "selector": "h2"}
            ]
        }]}]}));
        let data = build_page_data(&page, &cfg, Utc::now()).unwrap();
        assert_eq!(data.get("heading"), Some(&json!("two")));
    }

    #[tokio::test]
    async fn test_collecting_twice_is_identical_except_timestamp() {
        let dir = TempDir::new().unwrap();
        let collector = collector_with(&dir, scenario_a());
        let page = Page::new("file:///tmp/test.html", "<title>Hi</title>").with_selection("x");

        assert!(!collector.resolver().is_loaded());
        let first = collector.collect(&page).await.unwrap();
        assert!(collector.resolver().is_loaded());
        let second = collector.collect(&page).await.unwrap();
        assert_eq!(first.without_timestamp(), second.without_timestamp());
        assert_eq!(collector.state(), CollectorState::Idle);
    }

    #[tokio::test]
    async fn test_run_relays_exactly_once() {
        let dir = TempDir::new().unwrap();
        let collector = collector_with(&dir, scenario_a());
        let page = Page::new("file:///tmp/test.html", "<title>Hi</title>");
        let relay = RecordingRelay::new();

        let outcome = collector.run(&page, &relay).await;
        assert_eq!(collector.state(), CollectorState::Done);
        let data = outcome.data().cloned().unwrap();
        assert_eq!(data.get("title"), Some(&json!("Hi")));
        assert_eq!(outcome, CollectOutcome::Relayed { data: data.clone(), ack: Ack::ok() });

        let again = collector.run(&page, &relay).await;
        assert_eq!(again, CollectOutcome::AlreadyCollected);
        assert_eq!(relay.sent(), vec![Message::PageData { data }]);
    }

    #[tokio::test]
    async fn test_unmatched_page_is_skipped_and_not_relayed() {
        let dir = TempDir::new().unwrap();
        let collector = collector_with(&dir, scenario_a());
        let page = Page::new("https://example.com/", "<title>Hi</title>");
        let relay = RecordingRelay::new();

        assert_eq!(collector.run(&page, &relay).await, CollectOutcome::Skipped);
        assert_eq!(collector.state(), CollectorState::Done);
        assert!(relay.sent().is_empty());
    }

    #[tokio::test]
    async fn test_relay_failure_is_reported_not_retried() {
        let dir = TempDir::new().unwrap();
        let collector = collector_with(&dir, scenario_a());
        let page = Page::new("file:///tmp/test.html", "<title>Hi</title>");

        let outcome = collector.run(&page, &FailingRelay).await;
        assert!(matches!(outcome, CollectOutcome::RelayFailed { .. }));
        assert_eq!(collector.state(), CollectorState::Done);
    }

    #[tokio::test]
    async fn test_builtin_configuration_collects_test_pages() {
        let dir = TempDir::new().unwrap();
        let collector = PageCollector::builder()
            .config_source(ConfigSource::File(dir.path().join("missing.json")))
            .build();
        let page = Page::new(
            "file:///home/me/my-test.html",
            r#"<html><head><title>Local</title><meta name="description" content="Desc"></head><body>x</body></html>"#,
        )
        .with_selection("chosen");

        let data = collector.collect(&page).await.unwrap();
        assert_eq!(data.get("title"), Some(&json!("Local")));
        assert_eq!(data.get("metaDescription"), Some(&json!("Desc")));
        assert_eq!(data.get("selectedText"), Some(&json!("chosen")));
        assert!(data
            .get("htmlSnapshot")
            .and_then(|v| v.as_str())
            .unwrap()
            .starts_with("<html>"));
    }
}
