use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

// ============================================================================
// Field Vocabularies
// ============================================================================

/// Feed-level element names, in the order adapters consult them.
///
/// The vocabulary is fixed: adapters never store a name outside this list,
/// and the serializer only looks these names up.
pub const FEED_FIELDS: [&str; 20] = [
    "title",
    "link",
    "description",
    "language",
    "copyright",
    "managingEditor",
    "webMaster",
    "pubDate",
    "lastBuildDate",
    "categories",
    "generator",
    "docs",
    "cloud",
    "ttl",
    "image",
    "rating",
    "textInput",
    "skipHours",
    "skipDays",
    "extensions",
];

/// Item-level element names. `title` must stay first: normalization reads
/// it before any other field so the item's fingerprint exists before the
/// rest of the entry is filled in.
pub const ITEM_FIELDS: [&str; 12] = [
    "title",
    "link",
    "description",
    "author",
    "creator",
    "categories",
    "comments",
    "enclosure",
    "guid",
    "pubDate",
    "source",
    "extensions",
];

// ============================================================================
// Element Values
// ============================================================================

/// A processed element value.
///
/// Storage always holds the textual form (`as_stored_text`); interpretation
/// back into `Date`/`Guid` happens when a feed is read, not when written.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Date(DateTime<FixedOffset>),
    Guid(GuidValue),
}

/// RSS guid: an identifier string plus the isPermaLink flag.
///
/// The flag is always false today; detecting permalink-ness from the
/// source document is an open follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidValue {
    pub value: String,
    pub permalink: bool,
}

impl Value {
    /// Textual form persisted to storage and re-processed on read.
    pub fn as_stored_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Date(dt) => dt.to_rfc2822(),
            Value::Guid(g) => g.value.clone(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Date(dt) => Some(dt),
            _ => None,
        }
    }
}

// ============================================================================
// Canonical Records
// ============================================================================

/// Canonical in-memory feed record, independent of whether it came from an
/// RSS document, a scraped HTML page, or storage.
///
/// `items` preserves document order; deduplication by fingerprint replaces
/// an earlier item in place, so a repeated title keeps its original
/// position but carries the later item's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// URL or source key used for existence checks. Unique per store.
    pub source: String,
    pub elements: HashMap<String, Value>,
    pub items: Vec<Item>,
}

/// One entry within a feed, keyed by its content fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub fingerprint: String,
    pub elements: HashMap<String, Value>,
}

impl Feed {
    pub fn new(source: impl Into<String>) -> Self {
        Feed {
            source: source.into(),
            elements: HashMap::new(),
            items: Vec::new(),
        }
    }

    pub fn element(&self, name: &str) -> Option<&Value> {
        self.elements.get(name)
    }

    /// Feed title as plain text, when present.
    pub fn title(&self) -> Option<&str> {
        self.element("title").and_then(Value::as_text)
    }

    /// Insert an item, replacing any existing item with the same
    /// fingerprint in place (last write wins within one parse pass).
    pub fn upsert_item(&mut self, item: Item) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.fingerprint == item.fingerprint)
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }
}

impl Item {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Item {
            fingerprint: fingerprint.into(),
            elements: HashMap::new(),
        }
    }

    pub fn element(&self, name: &str) -> Option<&Value> {
        self.elements.get(name)
    }
}
