// ABOUTME: Configuration module: data model, loading with fallback, and rule lookup.
// ABOUTME: Groups the pieces that turn a JSON configuration and a URL into the rules to apply.

//! Configuration handling.
//!
//! Submodules:
//! - `model`: website/page/field rule types and load-time validation.
//! - `loader`: once-per-instance loading with the builtin fallback.
//! - `resolve`: first-match lookup of the website and page rule for a URL.

pub mod loader;
pub mod model;
pub mod resolve;
