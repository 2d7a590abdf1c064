//! RSS-XML source adapter: raw document text in, canonical feed out.
//!
//! Field extraction is positional, not schema-driven: the first text node
//! of each direct child of `<channel>` (and of each `<item>`) is collected
//! under the child's local tag name, then the shared normalizer applies the
//! fixed vocabulary and the element processor.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::feed::element::{normalize, NormalizedFeed};
use crate::util::scrub_text;

#[derive(Debug, Error)]
pub enum XmlError {
    /// The document contains no `<channel>` container.
    #[error("no feed container found in document")]
    SourceNotFound,

    #[error("invalid xml: {0}")]
    Parse(#[from] quick_xml::Error),
}

/// Parse an RSS document into a canonical feed keyed by `source`.
///
/// `<item>` containers are accepted anywhere under the channel, in document
/// order. Tags match the vocabulary by local name, so `dc:creator` lands
/// under `creator`. A self-closing element carries no text and therefore
/// never occupies a field slot (`<atom:link/>` cannot shadow `<link>`).
pub fn parse(document: &str, source: &str) -> Result<NormalizedFeed, XmlError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut found_channel = false;
    let mut in_channel = false;
    // Local names of open elements below <channel>, e.g. ["item", "title"].
    let mut channel_path: Vec<String> = Vec::new();
    let mut item_depth: Option<usize> = None;
    let mut channel_fields: HashMap<String, String> = HashMap::new();
    let mut current_item: Option<HashMap<String, String>> = None;
    let mut raw_items: Vec<HashMap<String, String>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if !in_channel {
                    if name == "channel" {
                        in_channel = true;
                        found_channel = true;
                    }
                } else {
                    let opens_item = name == "item" && item_depth.is_none();
                    channel_path.push(name);
                    if opens_item {
                        item_depth = Some(channel_path.len());
                        current_item = Some(HashMap::new());
                    }
                }
            }
            Event::Empty(e) => {
                // A childless <item/> is still an item container; it will be
                // reported as untitled by the normalizer.
                if in_channel && item_depth.is_none() && local_name(&e) == "item" {
                    raw_items.push(HashMap::new());
                }
            }
            Event::End(_) => {
                if in_channel {
                    if channel_path.is_empty() {
                        in_channel = false;
                    } else {
                        if item_depth == Some(channel_path.len()) {
                            if let Some(item) = current_item.take() {
                                raw_items.push(item);
                            }
                            item_depth = None;
                        }
                        channel_path.pop();
                    }
                }
            }
            Event::Text(e) => {
                if in_channel {
                    let text = match e.unescape() {
                        Ok(cow) => cow.into_owned(),
                        // Undefined entity references stay literal rather
                        // than blanking the whole node.
                        Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
                    };
                    receive_text(
                        text,
                        &channel_path,
                        item_depth,
                        &mut channel_fields,
                        &mut current_item,
                    );
                }
            }
            Event::CData(e) => {
                if in_channel {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    receive_text(
                        text,
                        &channel_path,
                        item_depth,
                        &mut channel_fields,
                        &mut current_item,
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !found_channel {
        return Err(XmlError::SourceNotFound);
    }

    Ok(normalize(source, channel_fields, raw_items))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

/// Route one text node to the field slot it belongs to: a direct child of
/// the open item, or a direct child of the channel. The first text node per
/// slot wins; deeper text (inside nested markup) is ignored.
fn receive_text(
    text: String,
    channel_path: &[String],
    item_depth: Option<usize>,
    channel_fields: &mut HashMap<String, String>,
    current_item: &mut Option<HashMap<String, String>>,
) {
    let text = match scrub_text(&text) {
        std::borrow::Cow::Borrowed(_) => text,
        std::borrow::Cow::Owned(cleaned) => cleaned,
    };
    if text.is_empty() {
        return;
    }

    match item_depth {
        Some(depth) => {
            if channel_path.len() == depth + 1 {
                if let (Some(item), Some(field)) = (current_item.as_mut(), channel_path.last()) {
                    item.entry(field.clone()).or_insert(text);
                }
            }
        }
        None => {
            if let [field] = channel_path {
                channel_fields.entry(field.clone()).or_insert(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::element::Diagnostic;
    use crate::feed::fingerprint::fingerprint;
    use crate::feed::model::{GuidValue, Value};
    use pretty_assertions::assert_eq;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
  <title>Example News</title>
  <atom:link href="https://example.com/feed" rel="self"/>
  <link>https://example.com</link>
  <description>All the example news</description>
  <language>en-us</language>
  <lastBuildDate>Mon, 29 Dec 2014 10:00:00 GMT</lastBuildDate>
  <item>
    <title>First &amp; foremost</title>
    <link>https://example.com/1</link>
    <dc:creator>Ann Author</dc:creator>
    <guid isPermaLink="false">tag:example.com,2014:1</guid>
    <pubDate>Mon, 29 Dec 2014 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title><![CDATA[Second story]]></title>
    <description>Plain <b>rich</b> tail</description>
  </item>
</channel>
</rss>"#;

    #[test]
    fn test_parses_channel_fields() {
        let normalized = parse(SAMPLE_RSS, "https://example.com/feed").expect("parses");
        let feed = &normalized.feed;

        assert_eq!(feed.source, "https://example.com/feed");
        assert_eq!(feed.title(), Some("Example News"));
        assert_eq!(
            feed.element("description"),
            Some(&Value::Text("All the example news".into()))
        );
        assert_eq!(
            feed.element("language"),
            Some(&Value::Text("en-us".into()))
        );
        assert!(feed.element("lastBuildDate").unwrap().as_date().is_some());
    }

    #[test]
    fn test_self_closing_atom_link_does_not_shadow_link() {
        let normalized = parse(SAMPLE_RSS, "src").expect("parses");
        assert_eq!(
            normalized.feed.element("link"),
            Some(&Value::Text("https://example.com".into()))
        );
    }

    #[test]
    fn test_items_carry_vocabulary_fields_and_fingerprints() {
        let normalized = parse(SAMPLE_RSS, "src").expect("parses");
        let items = &normalized.feed.items;

        assert_eq!(items.len(), 2);
        // Entities unescape before fingerprinting.
        assert_eq!(items[0].fingerprint, fingerprint("First & foremost"));
        assert_eq!(
            items[0].element("creator"),
            Some(&Value::Text("Ann Author".into()))
        );
        assert_eq!(
            items[0].element("guid"),
            Some(&Value::Guid(GuidValue {
                value: "tag:example.com,2014:1".into(),
                permalink: false,
            }))
        );
        assert!(items[0].element("pubDate").unwrap().as_date().is_some());
    }

    #[test]
    fn test_cdata_title_and_first_text_node_win() {
        let normalized = parse(SAMPLE_RSS, "src").expect("parses");
        let second = &normalized.feed.items[1];

        assert_eq!(second.element("title"), Some(&Value::Text("Second story".into())));
        // "rich" and "tail" sit inside/after nested markup; only the first
        // text node of <description> itself counts.
        assert_eq!(
            second.element("description"),
            Some(&Value::Text("Plain".into()))
        );
    }

    #[test]
    fn test_identical_titles_collapse_to_last_item() {
        let doc = r#"<rss version="2.0"><channel>
            <title>T</title>
            <item><title>Same headline</title><link>https://example.com/old</link></item>
            <item><title>Same headline</title><link>https://example.com/new</link></item>
        </channel></rss>"#;
        let normalized = parse(doc, "src").expect("parses");

        assert_eq!(normalized.feed.items.len(), 1);
        assert_eq!(
            normalized.feed.items[0].element("link"),
            Some(&Value::Text("https://example.com/new".into()))
        );
    }

    #[test]
    fn test_document_without_channel_is_source_not_found() {
        let err = parse("<html><body>not a feed</body></html>", "src").unwrap_err();
        assert!(matches!(err, XmlError::SourceNotFound));
    }

    #[test]
    fn test_malformed_channel_date_degrades_with_diagnostic() {
        let doc = r#"<rss><channel>
            <title>T</title>
            <pubDate>sometime soon</pubDate>
        </channel></rss>"#;
        let normalized = parse(doc, "src").expect("parses");

        assert_eq!(normalized.feed.element("pubDate"), None);
        assert!(matches!(
            normalized.diagnostics.as_slice(),
            [Diagnostic::MalformedField { field, .. }] if field == "pubDate"
        ));
    }

    #[test]
    fn test_source_tag_hits_drop_policy() {
        let doc = r#"<rss><channel>
            <title>T</title>
            <item><title>A post</title><source url="https://origin.example">Origin</source></item>
        </channel></rss>"#;
        let normalized = parse(doc, "src").expect("parses");

        assert_eq!(normalized.feed.items[0].element("source"), None);
        assert_eq!(
            normalized.diagnostics,
            vec![Diagnostic::DroppedField {
                field: "source".into()
            }]
        );
    }

    #[test]
    fn test_childless_item_reported_untitled() {
        let doc = r#"<rss><channel><title>T</title><item/></channel></rss>"#;
        let normalized = parse(doc, "src").expect("parses");

        assert!(normalized.feed.items.is_empty());
        assert_eq!(
            normalized.diagnostics,
            vec![Diagnostic::UntitledItem { index: 0 }]
        );
    }

    #[test]
    fn test_item_nested_below_channel_children_is_still_found() {
        let doc = r#"<rss><channel>
            <title>T</title>
            <wrapper><item><title>Deep item</title></item></wrapper>
        </channel></rss>"#;
        let normalized = parse(doc, "src").expect("parses");

        assert_eq!(normalized.feed.items.len(), 1);
        assert_eq!(normalized.feed.items[0].fingerprint, fingerprint("Deep item"));
    }
}
