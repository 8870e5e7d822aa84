//! Core utilities shared by every source
//!
//! - `http`: the browser-like HTTP client with its page cache
//! - `html`: table extraction from scraped pages

pub mod html;
pub mod http;

pub use html::{element_text, first_table, parse_tables, selector, HtmlTable};
pub use http::Fetcher;
