//! Shared helpers used across the pipeline.
//!
//! - **URL normalization**: turning user-typed source strings into absolute
//!   http(s) URLs before anything touches the network
//! - **Text cleanup**: control-character scrubbing and whitespace collapsing
//!   applied to extracted document text
//!
//! # Examples
//!
//! ```
//! use refeed::util::{collapse_whitespace, normalize_source_url, scrub_text};
//!
//! let url = normalize_source_url("example.com/feed.xml").unwrap();
//! assert_eq!(url.as_str(), "https://example.com/feed.xml");
//!
//! assert_eq!(scrub_text("clean\u{7f}"), "clean");
//! assert_eq!(collapse_whitespace("  a \n b  "), "a b");
//! ```

mod text;
mod url;

pub use text::{collapse_whitespace, scrub_text};
pub use self::url::{normalize_source_url, UrlError};
