// ABOUTME: Configuration data model: website rules, page rules and typed field descriptors.
// ABOUTME: Field types are decided once at deserialization time; load-time issues are reported by `issues()`.

//! Configuration model.
//!
//! The JSON shape is the one configuration authors write:
//!
//! ```json
//! { "websites": [ { "urlPattern": "*://example.com/*",
//!                   "pages": [ { "pathPattern": "/docs/*",
//!                                "fields": [ { "name": "title", "selector": "h1", "type": "text" } ] } ] } ] }
//! ```
//!
//! Field descriptors are deserialized through a raw, stringly-typed form and
//! converted into [`FieldKind`] / [`FieldSelector`] so extraction never
//! dispatches on strings.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pattern::match_url_pattern;

/// Sentinel selector asking for the reader's current text selection.
pub const SELECTION_SELECTOR: &str = "special:getSelection";

/// Literal selector that, for `html` fields, means the whole document.
pub const DOCUMENT_SELECTOR: &str = "html";

/// Root configuration object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub websites: Vec<WebsiteRule>,
}

/// A website-level rule, matched against the full page URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteRule {
    pub url_pattern: String,
    #[serde(default)]
    pub pages: Vec<PageRule>,
}

impl WebsiteRule {
    /// Returns true if this website's pattern matches `url`.
    pub fn matches(&self, url: &str) -> bool {
        match_url_pattern(url, &self.url_pattern)
    }
}

/// A page-level rule, matched against the URL path or filename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRule {
    pub path_pattern: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// What a field descriptor extracts from the matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Value,
    Html,
    /// `name` is `None` when the configuration forgot the `attribute` key.
    Attribute { name: Option<String> },
    Href,
    /// Unrecognized type tag; extracted like `Text`.
    Other(String),
}

impl FieldKind {
    fn from_tag(tag: Option<&str>, attribute: Option<String>) -> Self {
        match tag.unwrap_or("text") {
            "text" => FieldKind::Text,
            "value" => FieldKind::Value,
            "html" => FieldKind::Html,
            "attribute" => FieldKind::Attribute {
                name: attribute.filter(|a| !a.is_empty()),
            },
            "href" => FieldKind::Href,
            other => FieldKind::Other(other.to_string()),
        }
    }

    /// The configuration tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Value => "value",
            FieldKind::Html => "html",
            FieldKind::Attribute { .. } => "attribute",
            FieldKind::Href => "href",
            FieldKind::Other(tag) => tag.as_str(),
        }
    }
}

/// Where a field's element comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// The reader's text selection; no element is queried.
    Selection,
    /// A CSS selector (the literal `html` included).
    Css(String),
}

impl FieldSelector {
    fn parse(raw: String) -> Self {
        if raw == SELECTION_SELECTOR {
            FieldSelector::Selection
        } else {
            FieldSelector::Css(raw)
        }
    }

    /// Returns true for the literal `html` selector.
    pub fn is_document(&self) -> bool {
        matches!(self, FieldSelector::Css(css) if css == DOCUMENT_SELECTOR)
    }

    /// The selector as written in the configuration.
    pub fn as_str(&self) -> &str {
        match self {
            FieldSelector::Selection => SELECTION_SELECTOR,
            FieldSelector::Css(css) => css,
        }
    }
}

/// One named value to extract from a matched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldDescriptor", into = "RawFieldDescriptor")]
pub struct FieldDescriptor {
    pub name: String,
    pub selector: FieldSelector,
    pub kind: FieldKind,
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// Builds a descriptor the way it would be deserialized from configuration.
    pub fn new(
        name: impl Into<String>,
        selector: impl Into<String>,
        kind: FieldKind,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            selector: FieldSelector::parse(selector.into()),
            kind,
            default,
        }
    }

    /// The value used whenever extraction yields nothing.
    pub fn default_value(&self) -> Value {
        match &self.default {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::String(String::new()),
        }
    }

    /// Multi-valued fields query every matching element instead of the first.
    pub fn wants_multiple(&self) -> bool {
        if self.name.contains("all") {
            return true;
        }
        match &self.selector {
            FieldSelector::Css(css) => css.contains("tbody") || css.contains("tr."),
            FieldSelector::Selection => false,
        }
    }
}

/// Wire form of a field descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldDescriptor {
    name: String,
    #[serde(default)]
    selector: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl From<RawFieldDescriptor> for FieldDescriptor {
    fn from(raw: RawFieldDescriptor) -> Self {
        FieldDescriptor {
            kind: FieldKind::from_tag(raw.kind.as_deref(), raw.attribute),
            selector: FieldSelector::parse(raw.selector),
            name: raw.name,
            default: raw.default,
        }
    }
}

impl From<FieldDescriptor> for RawFieldDescriptor {
    fn from(field: FieldDescriptor) -> Self {
        let attribute = match &field.kind {
            FieldKind::Attribute { name } => name.clone(),
            _ => None,
        };
        RawFieldDescriptor {
            kind: Some(field.kind.tag().to_string()),
            selector: field.selector.as_str().to_string(),
            name: field.name,
            attribute,
            default: field.default,
        }
    }
}

/// A configuration problem found at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingAttributeName { website: usize, page: usize, field: String },
    UnknownType { website: usize, page: usize, field: String, tag: String },
    EmptyFieldName { website: usize, page: usize },
    EmptySelector { website: usize, page: usize, field: String },
    DuplicateField { website: usize, page: usize, field: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MissingAttributeName { website, page, field } => write!(
                f,
                "websites[{website}].pages[{page}] field '{field}' has type attribute but no attribute name"
            ),
            ConfigIssue::UnknownType { website, page, field, tag } => write!(
                f,
                "websites[{website}].pages[{page}] field '{field}' has unknown type '{tag}', treating as text"
            ),
            ConfigIssue::EmptyFieldName { website, page } => {
                write!(f, "websites[{website}].pages[{page}] has a field with an empty name")
            }
            ConfigIssue::EmptySelector { website, page, field } => {
                write!(f, "websites[{website}].pages[{page}] field '{field}' has an empty selector")
            }
            ConfigIssue::DuplicateField { website, page, field } => write!(
                f,
                "websites[{website}].pages[{page}] declares field '{field}' more than once; the last one wins"
            ),
        }
    }
}

impl Configuration {
    /// Lists configuration problems. None of them make the configuration unusable.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (w, website) in self.websites.iter().enumerate() {
            for (p, page) in website.pages.iter().enumerate() {
                let mut seen = HashSet::new();
                for field in &page.fields {
                    if field.name.is_empty() {
                        issues.push(ConfigIssue::EmptyFieldName { website: w, page: p });
                    } else if !seen.insert(field.name.as_str()) {
                        issues.push(ConfigIssue::DuplicateField {
                            website: w,
                            page: p,
                            field: field.name.clone(),
                        });
                    }
                    if matches!(&field.selector, FieldSelector::Css(css) if css.trim().is_empty()) {
                        issues.push(ConfigIssue::EmptySelector {
                            website: w,
                            page: p,
                            field: field.name.clone(),
                        });
                    }
                    match &field.kind {
                        FieldKind::Attribute { name: None } => {
                            issues.push(ConfigIssue::MissingAttributeName {
                                website: w,
                                page: p,
                                field: field.name.clone(),
                            })
                        }
                        FieldKind::Other(tag) => issues.push(ConfigIssue::UnknownType {
                            website: w,
                            page: p,
                            field: field.name.clone(),
                            tag: tag.clone(),
                        }),
                        _ => {}
                    }
                }
            }
        }
        issues
    }
}
