// ABOUTME: Pre-compiled CSS selector cache shared by every page.
// ABOUTME: Invalid selectors are cached too, so a bad configuration is reported once and then skipped.

//! Selector caching.
//!
//! Field descriptors name the same selectors on every page load. Parsing a
//! selector costs more than matching it against a small document, so compiled
//! selectors are kept in a process-wide cache.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use scraper::Selector;
use tracing::warn;

/// Compiled selectors keyed by their source text; `None` marks an invalid selector.
static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector.
///
/// Returns `None` for selectors that fail to parse. A poisoned lock only means
/// another thread panicked mid-insert; the map itself is still usable.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = %css, error = %e, "invalid CSS selector");
            None
        }
    };
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(|e| e.into_inner());
    cache
        .entry(css.to_string())
        .or_insert(compiled)
        .clone()
}

/// Compiles every selector of a configuration up front.
pub fn precompile_selectors<I, S>(selectors: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for css in selectors {
        get_or_compile(css.as_ref());
    }
}
