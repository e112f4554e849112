// ABOUTME: Main library entry point for the PageRelay collector (the content-side core).
// ABOUTME: Re-exports the public API: PageCollector, ConfigResolver, Page, PageData, Relay, and errors.

//! PageRelay collector - declarative page matching and field extraction.
//!
//! Given a page (URL, parsed HTML, optional text selection) and a JSON
//! configuration of website and page rules, the collector picks the first
//! matching rule, extracts every configured field, and hands the resulting
//! [`PageData`] to a [`Relay`].
//!
//! # Example
//!
//! ```no_run
//! use pagerelay_collector::{ConfigSource, Page, PageCollector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = PageCollector::builder()
//!         .config_source(ConfigSource::File("config.json".into()))
//!         .build();
//!     let page = Page::new("file:///tmp/test.html", "<title>Hi</title>");
//!     if let Some(data) = collector.collect(&page).await {
//!         println!("{}", serde_json::to_string_pretty(&data).unwrap());
//!     }
//! }
//! ```

pub mod collector;
pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod listener;
pub mod message;
pub mod options;
pub mod pattern;
pub mod relay;

pub use crate::collector::{CollectOutcome, CollectorState, PageCollector};
pub use crate::config::loader::{builtin_config, ConfigResolver, ConfigSource};
pub use crate::config::model::{
    Configuration, FieldDescriptor, FieldKind, FieldSelector, PageRule, WebsiteRule,
};
pub use crate::config::resolve::{find_matching_config, ConfigMatch};
pub use crate::dom::page::Page;
pub use crate::error::{ErrorCode, PageRelayError};
pub use crate::message::{Ack, Message, PageData};
pub use crate::options::{CollectorBuilder, Options};
pub use crate::relay::Relay;

/// Convenience alias for results carrying a [`PageRelayError`].
pub type Result<T> = std::result::Result<T, PageRelayError>;
