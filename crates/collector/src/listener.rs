// ABOUTME: Page-side handler for messages arriving from the relay boundary.
// ABOUTME: Applies injectHtml messages to the page and acknowledges them.

use tracing::debug;

use crate::dom::page::Page;
use crate::message::{Ack, Message};

/// Handles one incoming message.
///
/// `injectHtml` is applied to the page and acknowledged; any other message is
/// not meant for the page side and gets no acknowledgment.
pub fn handle_message(page: &mut Page, message: &Message) -> Option<Ack> {
    match message {
        Message::InjectHtml { html } => {
            page.inject_html(html);
            Some(Ack::ok())
        }
        Message::PageData { .. } => {
            debug!(url = %page.url(), "ignoring pageData message on the page side");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PageData;
    use chrono::Utc;

    const HTML: &str = "<html><body><p>content</p></body></html>";

    #[test]
    fn test_inject_html_is_applied_and_acknowledged() {
        let mut page = Page::new("https://example.com/", HTML);
        let ack = handle_message(
            &mut page,
            &Message::InjectHtml {
                html: "<span class=\"note\">hello</span>".to_string(),
            },
        );

        assert_eq!(ack, Some(Ack::ok()));
        let note = page.select_first("body > div > span.note").unwrap();
        assert_eq!(note.text().collect::<String>(), "hello");
    }

    #[test]
    fn test_page_data_is_ignored() {
        let mut page = Page::new("https://example.com/", HTML);
        let before = page.source().to_string();
        let ack = handle_message(
            &mut page,
            &Message::PageData {
                data: PageData::new("https://example.com/", Utc::now()),
            },
        );

        assert_eq!(ack, None);
        assert_eq!(page.source(), before);
    }
}
