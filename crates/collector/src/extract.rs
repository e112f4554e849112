// ABOUTME: Field extraction: turns a field descriptor and a page into a JSON value.
// ABOUTME: Handles single-element extraction per field kind and multi-element list extraction.

//! Field extraction.
//!
//! Key behaviors:
//! - A field always yields a value: the extracted value, the configured
//!   default, or `""` when no default is configured.
//! - An extracted empty string counts as nothing extracted.
//! - Fields whose name contains `all`, or whose selector mentions `tbody` or
//!   `tr.`, query every matching element and yield an array of non-empty
//!   strings. With no matching element they fall back to single extraction.
//! - Invalid selectors, unresolvable links and misconfigured attribute fields
//!   degrade to the default.

use scraper::ElementRef;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::model::{FieldDescriptor, FieldKind, FieldSelector};
use crate::dom::page::Page;
use crate::dom::selectors::get_or_compile;
use crate::error::PageRelayError;

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Trimmed text content of an element.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// The value a form control reports, or `None` for elements without one.
fn form_value(el: &ElementRef<'_>) -> Option<String> {
    match el.value().name() {
        "input" | "button" | "data" | "param" => {
            Some(el.value().attr("value").unwrap_or_default().to_string())
        }
        "option" => Some(match el.value().attr("value") {
            Some(v) => v.to_string(),
            None => el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "),
        }),
        "textarea" => Some(el.text().collect()),
        "select" => {
            let option_selector = get_or_compile("option")?;
            let options: Vec<ElementRef<'_>> = el.select(&option_selector).collect();
            let chosen = options
                .iter()
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| options.first())?;
            form_value(chosen)
        }
        _ => None,
    }
}

/// Extracts the raw string a field yields for one element.
///
/// No default is applied: `Ok(None)` means the element produced nothing
/// usable (an empty string included). A misconfigured field is an `Extract`
/// error.
pub fn extract_raw(
    page: &Page,
    el: &ElementRef<'_>,
    field: &FieldDescriptor,
) -> Result<Option<String>, PageRelayError> {
    let raw = match &field.kind {
        FieldKind::Text | FieldKind::Other(_) => non_empty(element_text(el)),
        FieldKind::Value => form_value(el).and_then(non_empty),
        FieldKind::Html => {
            if field.selector.is_document() {
                non_empty(page.outer_html())
            } else {
                // ElementRef::html always carries the element's own tags.
                non_empty(el.html())
            }
        }
        FieldKind::Attribute { name: Some(name) } => el
            .value()
            .attr(name)
            .map(str::to_string)
            .and_then(non_empty),
        FieldKind::Attribute { name: None } => {
            return Err(PageRelayError::extract(
                field.name.as_str(),
                "ExtractField",
                Some(anyhow::anyhow!("attribute field has no attribute name")),
            ))
        }
        FieldKind::Href => el.value().attr("href").and_then(|href| {
            let resolved = page.resolve_link(href);
            if resolved.is_none() {
                debug!(field = %field.name, href = %href, "could not resolve link");
            }
            resolved.and_then(non_empty)
        }),
    };
    Ok(raw)
}

/// Extracts one field from one element.
///
/// `element` is ignored for the selection sentinel. `None` means the selector
/// matched nothing and yields the default.
pub fn extract_field_value(
    page: &Page,
    element: Option<ElementRef<'_>>,
    field: &FieldDescriptor,
) -> Value {
    if field.selector == FieldSelector::Selection {
        return page
            .selection()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or_else(|| field.default_value());
    }

    let Some(el) = element else {
        return field.default_value();
    };

    match extract_raw(page, &el, field) {
        Ok(Some(value)) => Value::String(value),
        Ok(None) => field.default_value(),
        Err(e) => {
            error!(error = %e, "configuration error, using default");
            field.default_value()
        }
    }
}

/// Extracts one value per element, dropping elements that yield nothing.
///
/// Defaults never enter the list.
pub fn extract_many(page: &Page, elements: &[ElementRef<'_>], field: &FieldDescriptor) -> Vec<String> {
    elements
        .iter()
        .filter_map(|el| match &field.kind {
            FieldKind::Text => non_empty(element_text(el)),
            FieldKind::Href => el
                .value()
                .attr("href")
                .and_then(|href| page.resolve_link_from_origin(href))
                .and_then(non_empty),
            FieldKind::Attribute { name: None } => non_empty(element_text(el)),
            _ => extract_raw(page, el, field).ok().flatten(),
        })
        .collect()
}

/// Extracts a field from the page, choosing single or multi-element mode.
pub fn extract_field(page: &Page, field: &FieldDescriptor) -> Value {
    let css = match &field.selector {
        FieldSelector::Selection => return extract_field_value(page, None, field),
        FieldSelector::Css(css) => css,
    };

    if field.wants_multiple() {
        let elements = page.select_all(css);
        if !elements.is_empty() {
            let values = extract_many(page, &elements, field);
            return Value::Array(values.into_iter().map(Value::String).collect());
        }
        debug!(field = %field.name, selector = %css, "no elements for multi-valued field");
    }

    match page.select_first(css) {
        Some(el) => extract_field_value(page, Some(el), field),
        None => field.default_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>  Sample Page  </title>
  <meta name="description" content="A sample page">
</head>
<body>
  <h1 id="x">Heading</h1>
  <div id="empty">   </div>
  <input id="name" value="Ada">
  <input id="blank">
  <textarea id="notes">Some notes</textarea>
  <select id="color">
    <option value="r">Red</option>
    <option value="g" selected>Green</option>
  </select>
  <select id="size"><option>  Large  </option></select>
  <a id="home" href="/index.html">Home</a>
  <ul class="links">
    <li><a href="/one.html">One</a></li>
    <li><a href="two.html">Two</a></li>
    <li><a href="">Empty</a></li>
  </ul>
  <ul class="items">
    <li data-id="1">First</li>
    <li data-id="">   </li>
    <li data-id="3">Third</li>
  </ul>
  <table>
    <tbody>
      <tr class="row"><td>r1</td></tr>
      <tr class="row"><td>r2</td></tr>
    </tbody>
  </table>
</body>
</html>"#;

    fn page() -> Page {
        Page::new("https://example.com/docs/page.html", SAMPLE_HTML)
    }

    fn field(value: serde_json::Value) -> FieldDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_is_trimmed() {
        let f = field(json!({"name": "title", "selector": "title", "type": "text"}));
        assert_eq!(extract_field(&page(), &f), json!("Sample Page"));
    }

    #[test]
    fn test_whitespace_only_text_uses_default() {
        let f = field(json!({"name": "e", "selector": "#empty", "default": "n/a"}));
        assert_eq!(extract_field(&page(), &f), json!("n/a"));
    }

    #[test]
    fn test_missing_element_uses_default_or_empty() {
        let with_default = field(json!({"name": "m", "selector": "article", "default": "none"}));
        let without = field(json!({"name": "m", "selector": "article"}));
        assert_eq!(extract_field(&page(), &with_default), json!("none"));
        assert_eq!(extract_field(&page(), &without), json!(""));
    }

    #[test]
    fn test_attribute_without_name_degrades_to_default() {
        let f = field(json!({"name": "missingAttr", "selector": "#x", "type": "attribute", "default": "none"}));
        assert_eq!(extract_field(&page(), &f), json!("none"));
    }

    #[test]
    fn test_attribute_value_is_extracted() {
        let f = field(json!({
            "name": "metaDescription",
            "selector": "meta[name=\"description\"]",
            "type": "attribute",
            "attribute": "content"
        }));
        assert_eq!(extract_field(&page(), &f), json!("A sample page"));

        let absent = field(json!({"name": "a", "selector": "#x", "type": "attribute", "attribute": "title", "default": 0}));
        assert_eq!(extract_field(&page(), &absent), json!(0));
    }

    #[test]
    fn test_form_values() {
        let p = page();
        let value = |selector: &str| {
            extract_field(
                &p,
                &field(json!({"name": "v", "selector": selector, "type": "value", "default": "-"})),
            )
        };
        assert_eq!(value("#name"), json!("Ada"));
        assert_eq!(value("#blank"), json!("-"));
        assert_eq!(value("#notes"), json!("Some notes"));
        assert_eq!(value("#color"), json!("g"));
        assert_eq!(value("#size"), json!("Large"));
        assert_eq!(value("h1"), json!("-"));
    }

    #[test]
    fn test_html_of_document_and_element() {
        let p = page();
        let snapshot = extract_field(
            &p,
            &field(json!({"name": "htmlSnapshot", "selector": "html", "type": "html"})),
        );
        let snapshot = snapshot.as_str().unwrap();
        assert!(snapshot.starts_with("<html>"));
        assert!(snapshot.contains("<h1 id=\"x\">Heading</h1>"));

        let heading = extract_field(&p, &field(json!({"name": "h", "selector": "h1", "type": "html"})));
        assert_eq!(heading, json!("<h1 id=\"x\">Heading</h1>"));
    }

    #[test]
    fn test_href_resolves_against_page_url() {
        let f = field(json!({"name": "home", "selector": "#home", "type": "href"}));
        assert_eq!(extract_field(&page(), &f), json!("https://example.com/index.html"));

        let no_href = field(json!({"name": "h", "selector": "h1", "type": "href", "default": "none"}));
        assert_eq!(extract_field(&page(), &no_href), json!("none"));
    }

    #[test]
    fn test_selection_sentinel_reads_page_selection() {
        let f = field(json!({"name": "selectedText", "selector": "special:getSelection", "default": "nothing"}));
        assert_eq!(extract_field(&page(), &f), json!("nothing"));
        assert_eq!(
            extract_field(&page().with_selection("picked words"), &f),
            json!("picked words")
        );
    }

    #[test]
    fn test_unknown_type_behaves_like_text() {
        let f = field(json!({"name": "h", "selector": "h1", "type": "markdown"}));
        assert_eq!(extract_field(&page(), &f), json!("Heading"));
    }

    #[test]
    fn test_invalid_selector_uses_default() {
        let f = field(json!({"name": "bad", "selector": "[[[", "default": "fallback"}));
        assert_eq!(extract_field(&page(), &f), json!("fallback"));
    }

    #[test]
    fn test_multi_text_filters_empty_strings() {
        let f = field(json!({"name": "allItems", "selector": "ul.items li", "type": "text"}));
        assert_eq!(extract_field(&page(), &f), json!(["First", "Third"]));
    }

    #[test]
    fn test_multi_attribute_filters_empty_strings() {
        let f = field(json!({"name": "allIds", "selector": "ul.items li", "type": "attribute", "attribute": "data-id"}));
        assert_eq!(extract_field(&page(), &f), json!(["1", "3"]));

        let unnamed = field(json!({"name": "allIds", "selector": "ul.items li", "type": "attribute"}));
        assert_eq!(extract_field(&page(), &unnamed), json!(["First", "Third"]));
    }

    #[test]
    fn test_multi_href_resolves_against_origin() {
        let f = field(json!({"name": "allLinks", "selector": "ul.links a", "type": "href"}));
        assert_eq!(
            extract_field(&page(), &f),
            json!([
                "https://example.com/one.html",
                "https://example.com/two.html",
                "https://example.com/"
            ])
        );
    }

    #[test]
    fn test_multi_html_lists_outer_markup() {
        let f = field(json!({"name": "allHeadings", "selector": "h1", "type": "html"}));
        assert_eq!(extract_field(&page(), &f), json!(["<h1 id=\"x\">Heading</h1>"]));
    }

    #[test]
    fn test_multi_value_uses_single_extractor_per_element() {
        let f = field(json!({"name": "allInputs", "selector": "input", "type": "value"}));
        assert_eq!(extract_field(&page(), &f), json!(["Ada"]));
    }

    #[test]
    fn test_multi_value_never_lists_the_default() {
        let p = Page::new(
            "https://example.com/form",
            r#"<form><input value="Ada"><input><input value=""></form>"#,
        );
        let f = field(json!({"name": "allInputs", "selector": "input", "type": "value", "default": 0}));
        assert_eq!(extract_field(&p, &f), json!(["Ada"]));

        let other = field(json!({"name": "allCells", "selector": "input", "type": "markdown", "default": "n/a"}));
        assert_eq!(extract_field(&p, &other), json!([]));
    }

    #[test]
    fn test_attribute_without_name_is_extract_error() {
        let p = page();
        let el = p.select_first("#x").unwrap();
        let f = FieldDescriptor::new(
            "missingAttr",
            "#x",
            FieldKind::Attribute { name: None },
            Some(json!("none")),
        );

        let err = extract_raw(&p, &el, &f).unwrap_err();
        assert!(err.is_extract());
        assert_eq!(err.target, "missingAttr");
        assert_eq!(extract_field_value(&p, Some(el), &f), json!("none"));
    }

    #[test]
    fn test_raw_extraction_applies_no_default() {
        let p = page();
        let el = p.select_first("#blank").unwrap();
        let f = field(json!({"name": "v", "selector": "#blank", "type": "value", "default": "-"}));
        assert_eq!(extract_raw(&p, &el, &f).unwrap(), None);
    }

    #[test]
    fn test_table_row_selectors_are_multi_valued() {
        let f = field(json!({"name": "rows", "selector": "table tbody tr"}));
        assert_eq!(extract_field(&page(), &f), json!(["r1", "r2"]));

        let by_class = field(json!({"name": "rows", "selector": "tr.row td"}));
        assert_eq!(extract_field(&page(), &by_class), json!(["r1", "r2"]));
    }

    #[test]
    fn test_multi_with_no_elements_falls_back_to_default() {
        let f = field(json!({"name": "allMissing", "selector": "section p", "default": []}));
        assert_eq!(extract_field(&page(), &f), json!([]));

        let scalar = field(json!({"name": "allMissing", "selector": "section p"}));
        assert_eq!(extract_field(&page(), &scalar), json!(""));
    }

    #[test]
    fn test_every_kind_yields_a_value() {
        let p = page();
        for kind in ["text", "value", "html", "attribute", "href", "other"] {
            for selector in ["h1", "article", "special:getSelection", "[[["] {
                let f = field(json!({"name": "f", "selector": selector, "type": kind}));
                let v = extract_field(&p, &f);
                assert!(!v.is_null(), "{kind} / {selector} produced null");
            }
        }
    }
}
