use std::collections::HashMap;
use std::fmt;

use chrono::DateTime;
use thiserror::Error;

use crate::feed::fingerprint::fingerprint;
use crate::feed::model::{Feed, GuidValue, Item, Value, FEED_FIELDS, ITEM_FIELDS};

// ============================================================================
// Element Processor
// ============================================================================

#[derive(Debug, Error)]
pub enum ElementError {
    #[error("malformed date in '{field}': {detail}")]
    MalformedDate { field: String, detail: String },
}

/// Outcome of processing one named field.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    Value(Value),
    /// Recognized but intentionally not carried through (see [`DROPPED_FIELDS`]).
    Dropped,
}

/// Fields the pipeline recognizes but does not carry through.
///
/// These are structured RSS elements (lists, nested objects) that the flat
/// name/value storage model cannot hold yet. Dropping them is deliberate,
/// logged policy rather than an error; full passthrough is an open product
/// decision. `textImage` is a legacy spelling of `textInput` seen in the
/// wild, kept so both forms land in the same policy.
pub const DROPPED_FIELDS: [&str; 10] = [
    "source",
    "categories",
    "extensions",
    "cloud",
    "image",
    "textInput",
    "textImage",
    "skipHours",
    "skipDays",
    "enclosure",
];

enum Policy {
    Date,
    Guid,
    Drop,
    Passthrough,
}

fn policy_for(field: &str) -> Policy {
    match field {
        "pubDate" | "lastBuildDate" => Policy::Date,
        "guid" => Policy::Guid,
        f if DROPPED_FIELDS.contains(&f) => Policy::Drop,
        _ => Policy::Passthrough,
    }
}

/// Coerce one named field's raw text into its semantic representation.
///
/// Dispatch is by field name: date fields parse as RFC 822, `guid` wraps
/// into a [`GuidValue`] with the permalink flag hardcoded false, dropped
/// fields yield [`Processed::Dropped`], and everything else passes through
/// unchanged. Pure; the caller decides how a `MalformedDate` degrades.
pub fn process(raw: &str, field: &str) -> Result<Processed, ElementError> {
    match policy_for(field) {
        Policy::Date => {
            let parsed =
                DateTime::parse_from_rfc2822(raw.trim()).map_err(|e| {
                    ElementError::MalformedDate {
                        field: field.to_string(),
                        detail: e.to_string(),
                    }
                })?;
            Ok(Processed::Value(Value::Date(parsed)))
        }
        Policy::Guid => Ok(Processed::Value(Value::Guid(GuidValue {
            value: raw.to_string(),
            permalink: false,
        }))),
        Policy::Drop => Ok(Processed::Dropped),
        Policy::Passthrough => Ok(Processed::Value(Value::Text(raw.to_string()))),
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Non-fatal observation recorded while normalizing a source document.
///
/// Per-field failures degrade to "field absent" plus one of these, so a
/// caller can tell a field that was never present from one that was present
/// but unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Field present in the source but excluded by the drop policy.
    DroppedField { field: String },
    /// Field present but its value failed processing; the field was omitted.
    MalformedField {
        field: String,
        value: String,
        detail: String,
    },
    /// Item container without a title; no fingerprint, so the item was skipped.
    UntitledItem { index: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DroppedField { field } => {
                write!(f, "field '{field}' not carried through (drop policy)")
            }
            Diagnostic::MalformedField { field, detail, .. } => {
                write!(f, "field '{field}' malformed and omitted: {detail}")
            }
            Diagnostic::UntitledItem { index } => {
                write!(f, "item #{index} has no title and was skipped")
            }
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// A canonical feed plus everything the normalizer had to drop or repair
/// along the way.
#[derive(Debug)]
pub struct NormalizedFeed {
    pub feed: Feed,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a canonical [`Feed`] from raw field text gathered by an adapter.
///
/// Both source adapters call this with the channel-level fields and one map
/// of raw text per item container, in document order. Vocabulary names are
/// consulted in declared order, `title` first for items: the fingerprint is
/// computed from the raw title before any other field lands, and an item
/// whose container yields no title is skipped with a diagnostic. A repeated
/// title replaces the earlier item in place.
pub fn normalize(
    source: &str,
    mut channel_fields: HashMap<String, String>,
    raw_items: Vec<HashMap<String, String>>,
) -> NormalizedFeed {
    let mut feed = Feed::new(source);
    let mut diagnostics = Vec::new();

    for &name in FEED_FIELDS.iter() {
        let Some(raw) = channel_fields.remove(name) else {
            continue;
        };
        apply(name, raw, &mut feed.elements, &mut diagnostics);
    }

    for (index, mut raw_item) in raw_items.into_iter().enumerate() {
        let Some(raw_title) = raw_item.remove("title") else {
            tracing::warn!(index, "item without title skipped");
            diagnostics.push(Diagnostic::UntitledItem { index });
            continue;
        };

        let mut item = Item::new(fingerprint(&raw_title));
        apply("title", raw_title, &mut item.elements, &mut diagnostics);
        for &name in ITEM_FIELDS[1..].iter() {
            let Some(raw) = raw_item.remove(name) else {
                continue;
            };
            apply(name, raw, &mut item.elements, &mut diagnostics);
        }
        feed.upsert_item(item);
    }

    NormalizedFeed { feed, diagnostics }
}

fn apply(
    name: &str,
    raw: String,
    elements: &mut HashMap<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match process(&raw, name) {
        Ok(Processed::Value(value)) => {
            elements.insert(name.to_string(), value);
        }
        Ok(Processed::Dropped) => {
            tracing::debug!(field = %name, "field not carried through (drop policy)");
            diagnostics.push(Diagnostic::DroppedField {
                field: name.to_string(),
            });
        }
        Err(ElementError::MalformedDate { detail, .. }) => {
            tracing::warn!(field = %name, error = %detail, "malformed field omitted");
            diagnostics.push(Diagnostic::MalformedField {
                field: name.to_string(),
                value: raw,
                detail,
            });
        }
    }
}
