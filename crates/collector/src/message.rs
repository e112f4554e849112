// ABOUTME: Wire types exchanged between the page side and the relay boundary.
// ABOUTME: PageData (the collected record), Message (pageData / injectHtml) and Ack.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The record collected from one page load.
///
/// Serialized as a single flat JSON object: `url`, `timestamp`, then one key
/// per field. Field names share the key space with `url` and `timestamp`, and
/// a later write replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageData(Map<String, Value>);

impl PageData {
    /// Seeds a record with the page URL and the collection time.
    pub fn new(url: impl Into<String>, at: DateTime<Utc>) -> Self {
        let mut map = Map::new();
        map.insert("url".to_string(), Value::String(url.into()));
        map.insert(
            "timestamp".to_string(),
            Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self(map)
    }

    /// Sets a field value, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn url(&self) -> Option<&str> {
        self.0.get("url").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// All entries, including `url` and `timestamp`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The record without its timestamp, for comparing two collections.
    pub fn without_timestamp(&self) -> Map<String, Value> {
        let mut map = self.0.clone();
        map.remove("timestamp");
        map
    }
}

/// Messages crossing the relay boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Page side to boundary: a collected record.
    PageData { data: PageData },
    /// Boundary to page side: markup to insert at the top of the body.
    InjectHtml { html: String },
}

/// Acknowledgment returned for a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
