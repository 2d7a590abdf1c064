use std::collections::HashMap;

use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{FeedSummary, StoreError, WriteOutcome};
use crate::feed::element::{process, Processed};
use crate::feed::model::{Feed, Item, Value};

impl Database {
    // ========================================================================
    // Write Path
    // ========================================================================

    /// Whether a feed with this source identity is already stored.
    pub async fn feed_exists(&self, source: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM feeds WHERE source = ?")
            .bind(source)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Persist a canonical feed: the feed row, one field row per element,
    /// and per item one row plus its field rows, all in a single
    /// transaction. Either everything commits or nothing does.
    ///
    /// An already-stored source returns [`WriteOutcome::DuplicateSource`]
    /// without touching the store. The existence check races concurrent
    /// writers of the same source; the UNIQUE constraint on `source`
    /// backstops the race, and the losing insert degrades to the same
    /// sentinel.
    pub async fn create_feed(&self, feed: &Feed) -> Result<WriteOutcome, StoreError> {
        if self.feed_exists(&feed.source).await? {
            return Ok(WriteOutcome::DuplicateSource);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO feeds (source, created_at) VALUES (?, ?)")
            .bind(&feed.source)
            .bind(now)
            .execute(&mut *tx)
            .await;
        let feed_id = match inserted {
            Ok(result) => result.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(source = %feed.source, "feed already stored; write skipped");
                return Ok(WriteOutcome::DuplicateSource);
            }
            Err(e) => return Err(e.into()),
        };

        insert_field_rows(&mut tx, FieldTable::Feed, feed_id, &feed.elements).await?;

        for item in &feed.items {
            let item_id =
                sqlx::query("INSERT INTO items (feed_id, fingerprint, created_at) VALUES (?, ?, ?)")
                    .bind(feed_id)
                    .bind(&item.fingerprint)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
            insert_field_rows(&mut tx, FieldTable::Item, item_id, &item.elements).await?;
        }

        tx.commit().await?;
        tracing::info!(feed_id, source = %feed.source, items = feed.items.len(), "feed stored");
        Ok(WriteOutcome::Created(feed_id))
    }

    // ========================================================================
    // Read Path
    // ========================================================================

    /// Reconstruct a canonical feed from its stored rows.
    ///
    /// Storage holds field values as text; every value runs back through
    /// the element processor here, so interpretation happens at read time.
    /// A stored value that no longer processes (a corrupted date, say) is
    /// omitted with a warning rather than failing the read.
    pub async fn get_feed(&self, id: i64) -> Result<Feed, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT source FROM feeds WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let (source,) = row.ok_or(StoreError::FeedNotFound(id))?;

        let mut feed = Feed::new(source);

        let field_rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, value FROM feed_fields WHERE feed_id = ?")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        for (name, value) in field_rows {
            apply_stored(&mut feed.elements, name, value);
        }

        // Items in insertion order (document order at write time), each
        // with its field rows in one pass.
        let item_rows: Vec<(i64, String, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT i.id, i.fingerprint, f.name, f.value
            FROM items i
            LEFT JOIN item_fields f ON f.item_id = i.id
            WHERE i.feed_id = ?
            ORDER BY i.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut last_id = None;
        for (item_id, fingerprint, name, value) in item_rows {
            if last_id != Some(item_id) {
                feed.items.push(Item::new(fingerprint));
                last_id = Some(item_id);
            }
            if let (Some(name), Some(value)) = (name, value) {
                if let Some(item) = feed.items.last_mut() {
                    apply_stored(&mut item.elements, name, value);
                }
            }
        }

        Ok(feed)
    }

    /// Every stored feed with its title and item count, for listing.
    pub async fn get_feed_summaries(&self) -> Result<Vec<FeedSummary>, StoreError> {
        let rows: Vec<(i64, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT
                f.id, f.source, f.created_at,
                (SELECT value FROM feed_fields WHERE feed_id = f.id AND name = 'title'),
                (SELECT COUNT(*) FROM items WHERE feed_id = f.id)
            FROM feeds f
            ORDER BY f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, source, created_at, title, item_count)| FeedSummary {
                id,
                source,
                title,
                item_count,
                created_at,
            })
            .collect())
    }

    /// Delete a feed; items and field rows go with it via cascade.
    pub async fn delete_feed(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::FeedNotFound(id));
        }
        tracing::info!(feed_id = id, "feed removed");
        Ok(())
    }
}

// ============================================================================
// Field Row Helpers
// ============================================================================

#[derive(Clone, Copy)]
enum FieldTable {
    Feed,
    Item,
}

impl FieldTable {
    fn insert_prefix(self) -> &'static str {
        match self {
            FieldTable::Feed => "INSERT INTO feed_fields (feed_id, name, value, required) ",
            FieldTable::Item => "INSERT INTO item_fields (item_id, name, value, required) ",
        }
    }
}

/// Batch-insert one flat row per element. The `required` flag is schema
/// metadata defaulted true; no read path consults it.
async fn insert_field_rows(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: FieldTable,
    owner_id: i64,
    elements: &HashMap<String, Value>,
) -> Result<(), StoreError> {
    if elements.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(table.insert_prefix());
    builder.push_values(elements.iter(), |mut b, (name, value)| {
        b.push_bind(owner_id)
            .push_bind(name)
            .push_bind(value.as_stored_text())
            .push_bind(1i64);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

/// Re-process one stored field row into the in-memory element map.
fn apply_stored(elements: &mut HashMap<String, Value>, name: String, value: String) {
    match process(&value, &name) {
        Ok(Processed::Value(processed)) => {
            elements.insert(name, processed);
        }
        Ok(Processed::Dropped) => {
            // Drop-policy fields are never written; a row can only get here
            // from a hand-edited database.
            tracing::debug!(field = %name, "stored field excluded by drop policy");
        }
        Err(e) => {
            tracing::warn!(field = %name, error = %e, "stored field no longer parses; omitted");
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::GuidValue;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn test_feed(source: &str) -> Feed {
        let mut feed = Feed::new(source);
        feed.elements
            .insert("title".into(), Value::Text("Example News".into()));
        feed.elements
            .insert("link".into(), Value::Text("https://example.com".into()));
        feed.elements
            .insert("description".into(), Value::Text("All the news".into()));

        let mut first = Item::new("fp-one");
        first
            .elements
            .insert("title".into(), Value::Text("First".into()));
        first.elements.insert(
            "pubDate".into(),
            Value::Date(DateTime::parse_from_rfc2822("Mon, 29 Dec 2014 10:00:00 GMT").unwrap()),
        );
        first.elements.insert(
            "guid".into(),
            Value::Guid(GuidValue {
                value: "tag:example.com,2014:1".into(),
                permalink: false,
            }),
        );
        feed.items.push(first);

        let mut second = Item::new("fp-two");
        second
            .elements
            .insert("title".into(), Value::Text("Second".into()));
        second
            .elements
            .insert("link".into(), Value::Text("https://example.com/2".into()));
        feed.items.push(second);

        feed
    }

    async fn count(db: &Database, sql: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(sql).fetch_one(&db.pool).await.unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_create_then_read_round_trips() {
        let db = test_db().await;
        let feed = test_feed("https://example.com/rss");

        let WriteOutcome::Created(id) = db.create_feed(&feed).await.unwrap() else {
            panic!("expected Created");
        };
        let loaded = db.get_feed(id).await.unwrap();

        assert_eq!(loaded.source, feed.source);
        assert_eq!(loaded.title(), Some("Example News"));
        assert_eq!(loaded.element("link"), feed.element("link"));
        assert_eq!(loaded.element("description"), feed.element("description"));

        let fingerprints: Vec<&str> = loaded.items.iter().map(|i| i.fingerprint.as_str()).collect();
        assert_eq!(fingerprints, vec!["fp-one", "fp-two"]);
        // Dates and guids survive the text round trip as their processed forms.
        assert_eq!(loaded.items[0].element("pubDate"), feed.items[0].element("pubDate"));
        assert_eq!(loaded.items[0].element("guid"), feed.items[0].element("guid"));
        assert_eq!(loaded.items[1].element("link"), feed.items[1].element("link"));
    }

    #[tokio::test]
    async fn test_duplicate_source_is_a_sentinel_not_an_error() {
        let db = test_db().await;
        let feed = test_feed("https://example.com/rss");

        assert!(matches!(
            db.create_feed(&feed).await.unwrap(),
            WriteOutcome::Created(_)
        ));
        assert_eq!(
            db.create_feed(&feed).await.unwrap(),
            WriteOutcome::DuplicateSource
        );
        assert_eq!(count(&db, "SELECT COUNT(*) FROM feeds").await, 1);
    }

    #[tokio::test]
    async fn test_exists_tracks_stored_sources() {
        let db = test_db().await;
        assert!(!db.feed_exists("https://example.com/rss").await.unwrap());

        db.create_feed(&test_feed("https://example.com/rss"))
            .await
            .unwrap();
        assert!(db.feed_exists("https://example.com/rss").await.unwrap());
        assert!(!db.feed_exists("https://other.example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_feed_id_is_not_found() {
        let db = test_db().await;
        let err = db.get_feed(42).await.unwrap_err();
        assert!(matches!(err, StoreError::FeedNotFound(42)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_items_and_fields() {
        let db = test_db().await;
        let WriteOutcome::Created(id) = db
            .create_feed(&test_feed("https://example.com/rss"))
            .await
            .unwrap()
        else {
            panic!("expected Created");
        };

        assert!(count(&db, "SELECT COUNT(*) FROM items").await > 0);
        assert!(count(&db, "SELECT COUNT(*) FROM item_fields").await > 0);

        db.delete_feed(id).await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM feeds").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM feed_fields").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM items").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM item_fields").await, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_feed_is_not_found() {
        let db = test_db().await;
        let err = db.delete_feed(7).await.unwrap_err();
        assert!(matches!(err, StoreError::FeedNotFound(7)));
    }

    #[tokio::test]
    async fn test_summaries_expose_title_and_item_count() {
        let db = test_db().await;
        db.create_feed(&test_feed("https://example.com/rss"))
            .await
            .unwrap();

        let mut untitled = Feed::new("https://bare.example.com");
        untitled
            .elements
            .insert("link".into(), Value::Text("https://bare.example.com".into()));
        db.create_feed(&untitled).await.unwrap();

        let summaries = db.get_feed_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].title.as_deref(), Some("Example News"));
        assert_eq!(summaries[0].item_count, 2);
        assert_eq!(summaries[1].title, None);
        assert_eq!(summaries[1].item_count, 0);
        assert!(summaries[0].created_at > 0);
    }

    #[tokio::test]
    async fn test_corrupted_stored_date_is_omitted_on_read() {
        let db = test_db().await;
        let WriteOutcome::Created(id) = db
            .create_feed(&test_feed("https://example.com/rss"))
            .await
            .unwrap()
        else {
            panic!("expected Created");
        };

        sqlx::query("UPDATE item_fields SET value = 'not a date' WHERE name = 'pubDate'")
            .execute(&db.pool)
            .await
            .unwrap();

        let loaded = db.get_feed(id).await.unwrap();
        assert_eq!(loaded.items[0].element("pubDate"), None);
        // The rest of the item is unaffected.
        assert_eq!(
            loaded.items[0].element("title"),
            Some(&Value::Text("First".into()))
        );
    }
}
