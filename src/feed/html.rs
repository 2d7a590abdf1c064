//! HTML source adapter: scrape a listing page into a canonical feed using
//! caller-declared CSS selectors.

use std::collections::HashMap;

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::feed::element::{normalize, NormalizedFeed};
use crate::util::{collapse_whitespace, scrub_text};

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("invalid selector '{selector}': {detail}")]
    BadSelector { selector: String, detail: String },

    /// A selector the feed cannot exist without matched nothing.
    #[error("selector '{selector}' matched nothing in the document")]
    SelectorNoMatch { selector: String },
}

/// Where the parts of a feed live in the scraped page.
///
/// Each parse call owns its set; there is no shared selector state between
/// feeds or between calls.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    /// Feed title element. The first match wins; zero matches is fatal.
    pub feed_title: String,
    /// One match per candidate item container, in document order.
    pub item: String,
    /// Title element inside each item container. When the matched element
    /// carries an `href`, it becomes the item link.
    pub item_title: String,
}

/// Scrape `document` into a canonical feed.
///
/// `source_link` is stored verbatim as the feed's `link` (and is the
/// feed's source identity); validating it is the caller's concern. A
/// container whose title selector matches nothing is skipped with a
/// diagnostic rather than failing the parse.
pub fn parse(
    document: &str,
    source_link: &str,
    selectors: &SelectorSet,
) -> Result<NormalizedFeed, HtmlError> {
    let feed_title_sel = compile(&selectors.feed_title)?;
    let item_sel = compile(&selectors.item)?;
    let item_title_sel = compile(&selectors.item_title)?;

    let html = Html::parse_document(document);

    let title_el = html
        .select(&feed_title_sel)
        .next()
        .ok_or_else(|| HtmlError::SelectorNoMatch {
            selector: selectors.feed_title.clone(),
        })?;

    let mut channel_fields = HashMap::new();
    channel_fields.insert(
        "title".to_string(),
        clean_fragment(title_el.text().collect::<String>()),
    );
    channel_fields.insert("link".to_string(), source_link.to_string());

    let base = Url::parse(source_link).ok();

    let mut raw_items = Vec::new();
    for container in html.select(&item_sel) {
        let mut raw_item = HashMap::new();
        if let Some(el) = container.select(&item_title_sel).next() {
            let title = clean_fragment(el.text().collect::<String>());
            if !title.is_empty() {
                raw_item.insert("title".to_string(), title);
            }
            if let Some(href) = el.value().attr("href") {
                raw_item.insert("link".to_string(), resolve_link(base.as_ref(), href));
            }
        }
        raw_items.push(raw_item);
    }

    Ok(normalize(source_link, channel_fields, raw_items))
}

fn compile(selector: &str) -> Result<Selector, HtmlError> {
    Selector::parse(selector).map_err(|e| HtmlError::BadSelector {
        selector: selector.to_string(),
        detail: e.to_string(),
    })
}

fn clean_fragment(text: String) -> String {
    let scrubbed = scrub_text(&text);
    collapse_whitespace(&scrubbed).into_owned()
}

/// Absolute hrefs pass through; relative ones resolve against the page URL.
fn resolve_link(base: Option<&Url>, href: &str) -> String {
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }
    if let Some(base) = base {
        if let Ok(joined) = base.join(href) {
            return joined.to_string();
        }
    }
    href.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::element::Diagnostic;
    use crate::feed::fingerprint::fingerprint;
    use crate::feed::model::Value;
    use pretty_assertions::assert_eq;

    const LISTING_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>ignored</title></head>
  <body>
    <h1 class="site-title">
        Example
        Bulletin
    </h1>
    <div class="story"><a class="headline" href="/posts/1">First post</a></div>
    <div class="story"><a class="headline" href="https://cdn.example.net/2">Second
        post</a></div>
    <div class="story"><span class="teaser">no headline here</span></div>
    <div class="story"><a class="headline" href="/posts/1-updated">First post</a></div>
  </body>
</html>"#;

    fn selectors() -> SelectorSet {
        SelectorSet {
            feed_title: "h1.site-title".into(),
            item: "div.story".into(),
            item_title: "a.headline".into(),
        }
    }

    #[test]
    fn test_scrapes_title_link_and_items() {
        let normalized =
            parse(LISTING_PAGE, "https://example.com/posts", &selectors()).expect("parses");
        let feed = &normalized.feed;

        assert_eq!(feed.source, "https://example.com/posts");
        assert_eq!(feed.title(), Some("Example Bulletin"));
        assert_eq!(
            feed.element("link"),
            Some(&Value::Text("https://example.com/posts".into()))
        );
        // Duplicate headline collapsed (last wins), plus one distinct story.
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn test_relative_hrefs_resolve_against_source_link() {
        let normalized =
            parse(LISTING_PAGE, "https://example.com/posts", &selectors()).expect("parses");
        let first = &normalized.feed.items[0];

        assert_eq!(first.fingerprint, fingerprint("First post"));
        // The duplicated headline replaced the original in place.
        assert_eq!(
            first.element("link"),
            Some(&Value::Text("https://example.com/posts/1-updated".into()))
        );
    }

    #[test]
    fn test_absolute_hrefs_pass_through() {
        let normalized =
            parse(LISTING_PAGE, "https://example.com/posts", &selectors()).expect("parses");
        let second = &normalized.feed.items[1];

        assert_eq!(second.element("title"), Some(&Value::Text("Second post".into())));
        assert_eq!(
            second.element("link"),
            Some(&Value::Text("https://cdn.example.net/2".into()))
        );
    }

    #[test]
    fn test_container_without_title_match_is_skipped_with_diagnostic() {
        let normalized =
            parse(LISTING_PAGE, "https://example.com/posts", &selectors()).expect("parses");

        assert_eq!(
            normalized.diagnostics,
            vec![Diagnostic::UntitledItem { index: 2 }]
        );
    }

    #[test]
    fn test_missing_feed_title_is_selector_no_match() {
        let err = parse("<html><body></body></html>", "https://example.com", &selectors())
            .unwrap_err();
        assert!(matches!(
            err,
            HtmlError::SelectorNoMatch { selector } if selector == "h1.site-title"
        ));
    }

    #[test]
    fn test_unparsable_selector_is_rejected() {
        let bad = SelectorSet {
            feed_title: "h1[".into(),
            item: "div".into(),
            item_title: "a".into(),
        };
        let err = parse("<html></html>", "https://example.com", &bad).unwrap_err();
        assert!(matches!(err, HtmlError::BadSelector { .. }));
    }
}
