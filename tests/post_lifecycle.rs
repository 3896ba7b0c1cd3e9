//! Integration tests for the post lifecycle: parse, store, replace, window, export.
//!
//! Each test creates its own SQLite database for isolation. Feed documents
//! are fed through `ingest_bytes`, the same path used after a download, so
//! no network is involved.

use chrono::{TimeDelta, TimeZone, Utc};
use planet::config::Feed;
use planet::export;
use planet::feed::{date, ingest_bytes, FeedStatus};
use planet::storage::Database;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_feed(name: &str) -> Feed {
    Feed {
        name: name.to_string(),
        url: format!("https://{}.example/feed", name),
        home: None,
    }
}

fn atom_doc(entries: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Site</title>
  <author><name>Site Owner</name></author>
  {}
</feed>"#,
        entries
    )
}

fn rss_doc(items: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>RSS Site</title>{}</channel></rss>"#,
        items
    )
}

// ============================================================================
// Ingest Tests
// ============================================================================

#[tokio::test]
async fn test_atom_entry_round_trips_through_store() {
    let db = test_db().await;
    let doc = atom_doc(
        r#"<entry><id>u1</id><title>Hello</title>
<published>2024-03-01T10:00:00Z</published>
<link rel="self" href="http://x/self"/>
<link rel="alternate" href="http://x/1"/>
<category term="a"/><category term="b"/></entry>"#,
    );

    let outcome = ingest_bytes(&db, &test_feed("atom"), doc.as_bytes()).await;
    assert!(matches!(outcome.status, FeedStatus::Ingested { stored: 1, .. }));

    let post = db.get_post("u1").await.unwrap().unwrap();
    assert_eq!(post.title, "Hello");
    assert_eq!(post.link, "http://x/1");
    assert_eq!(post.author.as_deref(), Some("Site Owner"));
    assert_eq!(post.feed_title, "Atom Site");
    assert_eq!(post.tags, vec!["a", "b"]);
    assert_eq!(
        post.published_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_updated_entry_replaces_tags() {
    let db = test_db().await;
    let feed = test_feed("rss");

    let v1 = rss_doc(
        r#"<item><guid>g1</guid><title>v1</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate>
<category>old</category><category>stale</category></item>"#,
    );
    let v2 = rss_doc(
        r#"<item><guid>g1</guid><title>v2</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate>
<category>new</category></item>"#,
    );

    ingest_bytes(&db, &feed, v1.as_bytes()).await;
    ingest_bytes(&db, &feed, v2.as_bytes()).await;

    let post = db.get_post("g1").await.unwrap().unwrap();
    assert_eq!(post.title, "v2");
    assert_eq!(post.tags, vec!["new"]);
    assert_eq!(db.count_posts().await.unwrap(), 1);
    assert_eq!(db.count_tags().await.unwrap(), 1);
}

#[tokio::test]
async fn test_bad_entries_do_not_block_siblings() {
    let db = test_db().await;
    let doc = rss_doc(
        r#"<item><guid>bad</guid><pubDate>not a date</pubDate></item>
<item><title>no guid</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>
<item><guid>good</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#,
    );

    let outcome = ingest_bytes(&db, &test_feed("rss"), doc.as_bytes()).await;
    assert_eq!(
        outcome.status,
        FeedStatus::Ingested {
            stored: 1,
            dropped: 2,
            failed_writes: 0
        }
    );
    assert!(db.get_post("bad").await.unwrap().is_none());
    assert!(db.get_post("good").await.unwrap().is_some());
}

// ============================================================================
// Window Tests
// ============================================================================

#[tokio::test]
async fn test_window_returns_recent_posts_newest_first() {
    let db = test_db().await;
    let now = Utc::now();
    let items: String = [("old", 40), ("mid", 3), ("new", 1)]
        .iter()
        .map(|(id, days_ago)| {
            format!(
                "<item><guid>{}</guid><pubDate>{}</pubDate></item>",
                id,
                date::to_rfc822(now - TimeDelta::days(*days_ago))
            )
        })
        .collect();

    ingest_bytes(&db, &test_feed("rss"), rss_doc(&items).as_bytes()).await;

    let posts = db.query(TimeDelta::days(7), 100).await.unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid"]);
}

// ============================================================================
// Persistence and Export Tests
// ============================================================================

#[tokio::test]
async fn test_posts_persist_across_reopen() {
    let dir = std::env::temp_dir().join("planet_test_persist");
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("posts.db");
    let _ = std::fs::remove_file(&db_path);
    let db_path_str = db_path.to_str().unwrap().to_string();

    {
        let db = Database::open(&db_path_str).await.unwrap();
        let doc = atom_doc(r#"<entry><id>p1</id><updated>2024-03-01T10:00:00+02:00</updated></entry>"#);
        ingest_bytes(&db, &test_feed("atom"), doc.as_bytes()).await;
    }

    let db = Database::open(&db_path_str).await.unwrap();
    let post = db.get_post("p1").await.unwrap().unwrap();
    assert_eq!(
        post.published_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_export_of_stored_posts() {
    let db = test_db().await;
    let published = Utc::now() - TimeDelta::hours(1);
    let doc = rss_doc(&format!(
        "<item><guid>e1</guid><title>Exported</title><description>Body</description><pubDate>{}</pubDate></item>",
        date::to_rfc822(published)
    ));
    ingest_bytes(&db, &test_feed("rss"), doc.as_bytes()).await;

    let posts = db.query(TimeDelta::days(1), 10).await.unwrap();
    let mut out = Vec::new();
    export::write_json(&mut out, &posts, &[test_feed("rss")], "%F").unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value[0]["id"], "e1");
    assert_eq!(value[0]["body"], "Body");
    assert_eq!(value[0]["feed_name"], "rss");
    assert_eq!(value[0]["rfc822_date"], date::to_rfc822(posts[0].published_at));
}
