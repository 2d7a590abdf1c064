//! Feed normalization pipeline.
//!
//! Heterogeneous sources are reduced to one canonical record shape,
//! deduplicated by title fingerprint, persisted to SQLite, and re-emitted
//! as RSS 2.0:
//!
//! ```text
//! RSS XML ──┐
//!           ├─ normalize ─> Feed/Item ─> storage ─> render ─> RSS 2.0
//! HTML    ──┘
//! ```
//!
//! - [`feed`] holds the source adapters, the shared normalization pass and
//!   document fetching
//! - [`storage`] persists canonical records to SQLite
//! - [`render`] turns stored records back into RSS XML
//! - [`config`] and [`util`] carry the surrounding plumbing

pub mod config;
pub mod feed;
pub mod render;
pub mod storage;
pub mod util;
