// ABOUTME: The Page type: a parsed HTML document with its URL and the reader's text selection.
// ABOUTME: Provides selector queries, link resolution, full-document markup and HTML injection.

use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::dom::decode::decode_body;
use crate::dom::selectors::get_or_compile;

/// A loaded page as the collector sees it.
#[derive(Debug, Clone)]
pub struct Page {
    url: String,
    source: String,
    document: Html,
    selection: Option<String>,
}

impl Page {
    /// Parses `html` as the document loaded from `url`.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let source = html.into();
        Self {
            url: url.into(),
            document: Html::parse_document(&source),
            source,
            selection: None,
        }
    }

    /// Decodes raw bytes using the content-type charset, or detection when absent.
    pub fn from_bytes(url: impl Into<String>, body: &[u8], content_type: Option<&str>) -> Self {
        Self::new(url, decode_body(body, content_type))
    }

    /// Sets the reader's current text selection.
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The current selection; an empty selection counts as none.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref().filter(|s| !s.is_empty())
    }

    /// The markup the page was built from, including any injected HTML.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serialized markup of the whole document element.
    pub fn outer_html(&self) -> String {
        self.document.root_element().html()
    }

    /// First element matching `css`; `None` for no match or an invalid selector.
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = get_or_compile(css)?;
        self.document.select(&selector).next()
    }

    /// Every element matching `css`, in document order.
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match get_or_compile(css) {
            Some(selector) => self.document.select(&selector).collect(),
            None => Vec::new(),
        }
    }

    /// Resolves `href` against the page URL, the way a browser resolves a link.
    pub fn resolve_link(&self, href: &str) -> Option<String> {
        match Url::parse(&self.url) {
            Ok(base) => base.join(href).ok().map(String::from),
            Err(_) => Url::parse(href).ok().map(String::from),
        }
    }

    /// Resolves `href` against the page origin (scheme, host, port).
    ///
    /// Pages with an opaque origin, such as local files, resolve against the
    /// page URL instead.
    pub fn resolve_link_from_origin(&self, href: &str) -> Option<String> {
        let Ok(page_url) = Url::parse(&self.url) else {
            return Url::parse(href).ok().map(String::from);
        };
        let origin = page_url.origin();
        let base = if origin.is_tuple() {
            Url::parse(&origin.ascii_serialization()).unwrap_or(page_url)
        } else {
            page_url
        };
        base.join(href).ok().map(String::from)
    }

    /// Inserts `fragment`, wrapped in a `<div>`, as the first child of `<body>`.
    pub fn inject_html(&mut self, fragment: &str) {
        let doc = dom_query::Document::from(self.source.as_str());
        doc.select("body")
            .prepend_html(format!("<div>{}</div>", fragment));
        self.source = doc.html().to_string();
        self.document = Html::parse_document(&self.source);
        debug!(url = %self.url, bytes = fragment.len(), "injected HTML into page");
    }
}
