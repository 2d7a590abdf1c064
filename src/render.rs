//! Feed serializer: canonical records back out as RSS 2.0 XML.
//!
//! The encoder only consults the fixed field vocabularies, so anything the
//! normalization pass dropped simply renders as the encoder's default
//! (`None`, or an empty sequence). Mandatory channel fields are enforced
//! here rather than at ingest: a scraped feed stored without a description
//! is a valid record, but it cannot be rendered until one is supplied.

use rss::extension::dublincore::DublinCoreExtension;
use rss::Channel;
use thiserror::Error;

use crate::feed::{Feed, Item, Value};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    /// RSS 2.0 requires `<title>`, `<link>` and `<description>` on the
    /// channel; rendering refuses to emit a document without them.
    #[error("feed is missing mandatory field '{0}'")]
    MissingMandatoryField(&'static str),
}

// ============================================================================
// Channel Construction
// ============================================================================

/// Build an [`rss::Channel`] from a canonical feed record.
pub fn to_channel(feed: &Feed) -> Result<Channel, RenderError> {
    let title = mandatory(feed, "title")?;
    let link = mandatory(feed, "link")?;
    let description = mandatory(feed, "description")?;

    let mut channel = Channel::default();
    channel.set_title(title);
    channel.set_link(link);
    channel.set_description(description);
    channel.set_language(stored_text(feed, "language"));
    channel.set_copyright(stored_text(feed, "copyright"));
    channel.set_managing_editor(stored_text(feed, "managingEditor"));
    channel.set_webmaster(stored_text(feed, "webMaster"));
    channel.set_pub_date(stored_text(feed, "pubDate"));
    channel.set_last_build_date(stored_text(feed, "lastBuildDate"));
    channel.set_generator(stored_text(feed, "generator"));
    channel.set_docs(stored_text(feed, "docs"));
    channel.set_ttl(stored_text(feed, "ttl"));
    channel.set_rating(stored_text(feed, "rating"));
    channel.set_items(feed.items.iter().map(to_item).collect::<Vec<_>>());
    Ok(channel)
}

/// Render a feed as an RSS 2.0 XML document.
pub fn to_xml(feed: &Feed) -> Result<String, RenderError> {
    let channel = to_channel(feed)?;
    // Channel's Display impl starts at <rss>; prepend the declaration so
    // the output is a standalone document.
    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>{channel}"
    ))
}

fn to_item(item: &Item) -> rss::Item {
    let mut out = rss::Item::default();
    out.set_title(item_text(item, "title"));
    out.set_link(item_text(item, "link"));
    out.set_description(item_text(item, "description"));
    out.set_author(item_text(item, "author"));
    out.set_comments(item_text(item, "comments"));
    out.set_pub_date(item_text(item, "pubDate"));

    if let Some(Value::Guid(guid)) = item.element("guid") {
        let mut out_guid = rss::Guid::default();
        out_guid.set_value(guid.value.clone());
        out_guid.set_permalink(guid.permalink);
        out.set_guid(out_guid);
    }

    // dc:creator lives in the Dublin Core extension; the writer declares
    // the namespace on <rss> when any item carries the extension.
    if let Some(creator) = item_text(item, "creator") {
        let mut dc = DublinCoreExtension::default();
        dc.set_creators(vec![creator]);
        out.set_dublin_core_ext(dc);
    }

    out
}

fn mandatory(feed: &Feed, name: &'static str) -> Result<String, RenderError> {
    feed.element(name)
        .map(Value::as_stored_text)
        .ok_or(RenderError::MissingMandatoryField(name))
}

fn stored_text(feed: &Feed, name: &str) -> Option<String> {
    feed.element(name).map(Value::as_stored_text)
}

fn item_text(item: &Item, name: &str) -> Option<String> {
    item.element(name).map(Value::as_stored_text)
}

// ============================================================================
// Tests
// ============================================================================
