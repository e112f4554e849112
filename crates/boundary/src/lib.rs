// ABOUTME: The privileged side of PageRelay: persisted settings and the backend relay.
// ABOUTME: Receives page data from collectors, POSTs it to the backend, and returns injections.

//! PageRelay boundary.
//!
//! The collector never talks to the network directly; it hands
//! [`PageData`](pagerelay_collector::PageData) to a relay. [`BackendRelay`]
//! is that relay: it reads the backend URL from a [`SettingsStore`], posts the
//! record, and forwards any `injectHtml` reply back to the page.

pub mod backend;
pub mod settings;

pub use crate::backend::{injection_from_reply, BackendRelay, BackendRelayBuilder, BackendTarget};
pub use crate::settings::{Settings, SettingsStore, SETTINGS_FILE_NAME};
