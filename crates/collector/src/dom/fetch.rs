// ABOUTME: Loads a page over HTTP and turns the response into a Page.
// ABOUTME: Only http/https URLs are fetched; non-success statuses are Fetch errors.

use tracing::debug;

use crate::dom::page::Page;
use crate::error::PageRelayError;

/// Fetch `url` and build a [`Page`] from the decoded response body.
///
/// The page URL is the final URL after redirects, which is what pattern
/// matching and link resolution see in a browser.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<Page, PageRelayError> {
    let parsed = url::Url::parse(url).map_err(|e| {
        PageRelayError::fetch(url, "FetchPage", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(PageRelayError::fetch(
            url,
            "FetchPage",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let response = client.get(parsed).send().await.map_err(|e| {
        PageRelayError::fetch(url, "FetchPage", Some(anyhow::anyhow!("request failed: {}", e)))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PageRelayError::fetch(
            url,
            "FetchPage",
            Some(anyhow::anyhow!("HTTP status {}", status.as_u16())),
        ));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await.map_err(|e| {
        PageRelayError::fetch(url, "FetchPage", Some(anyhow::anyhow!("reading body failed: {}", e)))
    })?;

    debug!(url = %final_url, bytes = body.len(), "fetched page");
    Ok(Page::from_bytes(final_url, &body, content_type.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetches_and_parses_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><head><title>Fetched</title></head><body></body></html>");
        });

        let page = fetch_page(&reqwest::Client::new(), &server.url("/article"))
            .await
            .expect("fetch should succeed");
        mock.assert();

        assert_eq!(page.url(), server.url("/article"));
        assert_eq!(
            page.select_first("title").unwrap().text().collect::<String>(),
            "Fetched"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = fetch_page(&reqwest::Client::new(), &server.url("/missing"))
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let err = fetch_page(&reqwest::Client::new(), "file:///tmp/test.html")
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }
}
