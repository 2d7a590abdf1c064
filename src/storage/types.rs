use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    /// No feed row with the requested id.
    #[error("feed {0} not found")]
    FeedNotFound(i64),

    /// Generic database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Write Outcomes
// ============================================================================

/// Result of persisting a canonical feed.
///
/// A duplicate source is a sentinel, not an error: ingesting the same
/// source twice is an idempotent no-op reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The feed and all of its items committed; carries the new feed id.
    Created(i64),
    /// A feed with the same source already exists; nothing was written.
    DuplicateSource,
}

// ============================================================================
// Summaries
// ============================================================================

/// A stored feed at a glance, for listing.
#[derive(Debug, Clone)]
pub struct FeedSummary {
    pub id: i64,
    pub source: String,
    /// The stored title element, when the feed has one.
    pub title: Option<String>,
    pub item_count: i64,
    /// Unix timestamp of the insert.
    pub created_at: i64,
}
