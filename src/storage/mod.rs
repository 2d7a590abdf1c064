//! Persistence boundary: canonical feeds in, flat rows out, and back.
//!
//! The row layout (`feeds`, `feed_fields`, `items`, `item_fields`) is an
//! implementation detail of this module; callers only see canonical
//! [`crate::feed::Feed`] records, [`WriteOutcome`] and [`FeedSummary`].

mod feeds;
mod schema;
mod types;

pub use schema::Database;
pub use types::{FeedSummary, StoreError, WriteOutcome};
