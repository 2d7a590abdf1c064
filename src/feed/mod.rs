//! Feed normalization: heterogeneous source documents in, canonical
//! deduplicated feed records out.
//!
//! The pipeline is leaf-first:
//!
//! - [`fingerprint`] - Content identity for items, derived from title text
//! - [`element`] - Per-field coercion (dates, guids, drop policy) and the
//!   shared normalization routine both adapters feed into
//! - [`xml`] - RSS-XML source adapter
//! - [`html`] - HTML/CSS-selector source adapter
//! - [`fetch`] - Bounded document retrieval and XML-vs-HTML classification
//! - [`model`] - The canonical [`Feed`]/[`Item`] records and the fixed
//!   field vocabularies

pub mod element;
pub mod fetch;
pub mod fingerprint;
pub mod html;
pub mod model;
pub mod xml;

pub use element::{normalize, Diagnostic, NormalizedFeed};
pub use fetch::{build_client, fetch_document, DocumentKind, FetchError, FetchOptions, FetchedDocument};
pub use fingerprint::fingerprint;
pub use html::{HtmlError, SelectorSet};
pub use model::{Feed, GuidValue, Item, Value, FEED_FIELDS, ITEM_FIELDS};
pub use xml::XmlError;
