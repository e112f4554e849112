// ABOUTME: Rule lookup: finds the first website rule and page rule matching a page URL.
// ABOUTME: Normalizes file:// URLs (drive letters, backslashes) before path matching.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::model::{Configuration, PageRule, WebsiteRule};
use crate::pattern::match_page_pattern;

/// Windows drive-letter prefix such as `C:` at the start of a local path.
static DRIVE_LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]:").unwrap());

/// The rules selected for a page.
///
/// `page` is `None` when the matched website declares no page rules: the
/// website matches, but there is nothing page-specific to collect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigMatch<'a> {
    pub website: &'a WebsiteRule,
    pub page: Option<&'a PageRule>,
}

/// Computes the path that page patterns are matched against.
///
/// For `file://` URLs the scheme is stripped, backslashes become `/`, and a
/// drive-letter path gains a leading `/` (`C:\dir\a.html` -> `/C:/dir/a.html`).
/// Other URLs use their parsed path; an unparseable URL yields `/`.
pub fn normalized_path(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("file://") {
        let path = rest.replace('\\', "/");
        if DRIVE_LETTER_RE.is_match(&path) {
            return format!("/{}", path);
        }
        return path;
    }

    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(e) => {
            debug!(url = %url, error = %e, "unparseable page URL, matching against '/'");
            "/".to_string()
        }
    }
}

/// Finds the first website whose pattern matches `url`, then its first
/// matching page rule.
///
/// Returns `None` when no website matches, or when the first matching website
/// has page rules and none of them match. Later websites are never consulted
/// once one has matched.
pub fn find_matching_config<'a>(url: &str, config: &'a Configuration) -> Option<ConfigMatch<'a>> {
    let path = normalized_path(url);

    let website = config.websites.iter().find(|w| w.matches(url))?;
    if website.pages.is_empty() {
        debug!(url = %url, pattern = %website.url_pattern, "website matched without page rules");
        return Some(ConfigMatch {
            website,
            page: None,
        });
    }

    match website
        .pages
        .iter()
        .find(|p| match_page_pattern(&path, &p.path_pattern))
    {
        Some(page) => {
            debug!(
                url = %url,
                website = %website.url_pattern,
                page = %page.path_pattern,
                "page rule matched"
            );
            Some(ConfigMatch {
                website,
                page: Some(page),
            })
        }
        None => {
            debug!(url = %url, path = %path, "website matched but no page rule did");
            None
        }
    }
}
