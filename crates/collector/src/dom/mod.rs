// ABOUTME: DOM module: the Page type, selector caching, byte decoding and page fetching.
// ABOUTME: Everything the extractor needs to query a loaded document.

pub mod decode;
pub mod fetch;
pub mod page;
pub mod selectors;

pub use fetch::fetch_page;
pub use page::Page;
