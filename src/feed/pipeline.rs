use chrono::{TimeDelta, Utc};
use futures::stream::{self, StreamExt};

use super::dialect::Dialect;
use super::fetcher::fetch_feed;
use super::parser::parse_feed;
use crate::config::Feed;
use crate::storage::Database;

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum number of feeds downloaded at once.
    pub concurrency: usize,
    /// Posts published before `now - retention` are deleted after ingesting.
    pub retention: Option<TimeDelta>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            retention: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Document parsed; `stored` posts were written.
    Ingested {
        stored: usize,
        dropped: usize,
        failed_writes: usize,
    },
    /// Root element was neither `rss` nor `feed`.
    Unrecognized,
    /// Download or parse failed; nothing was written.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub feed: String,
    pub status: FeedStatus,
}

/// Summary of an ingestion run, one outcome per configured feed in order.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<FeedOutcome>,
    pub pruned: u64,
    pub orphan_tags_removed: u64,
}

impl IngestReport {
    pub fn stored(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                FeedStatus::Ingested { stored, .. } => stored,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, FeedStatus::Ingested { .. }))
            .count()
    }
}

/// Fetches, parses and stores every configured feed.
///
/// Downloads run concurrently (bounded by `options.concurrency`) but results
/// are consumed in configuration order and written one post at a time, so a
/// post id shared by two feeds ends up with the values of the later feed.
/// A feed that fails to download or parse is logged and skipped; the run
/// never aborts because of one feed.
///
/// After all feeds: optional retention pruning, then orphaned tags are
/// removed.
pub async fn ingest_all(
    db: &Database,
    client: &reqwest::Client,
    feeds: &[Feed],
    options: &IngestOptions,
) -> IngestReport {
    let mut report = IngestReport::default();

    let mut fetches = std::pin::pin!(stream::iter(feeds.iter())
        .map(|feed| {
            let client = client.clone();
            async move {
                let result = fetch_feed(&client, &feed.url).await;
                (feed, result)
            }
        })
        .buffered(options.concurrency.max(1)));

    while let Some((feed, result)) = fetches.next().await {
        let outcome = match result {
            Ok(bytes) => ingest_bytes(db, feed, &bytes).await,
            Err(e) => {
                tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Failed to fetch feed, skipping");
                FeedOutcome {
                    feed: feed.name.clone(),
                    status: FeedStatus::Failed(e.to_string()),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    if let Some(retention) = options.retention {
        match Utc::now().checked_sub_signed(retention) {
            Some(cutoff) => match db.prune_older_than(cutoff).await {
                Ok(pruned) => {
                    report.pruned = pruned;
                    if pruned > 0 {
                        tracing::info!(pruned = pruned, cutoff = %cutoff, "Pruned expired posts");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to prune expired posts"),
            },
            None => tracing::warn!(
                retention_secs = retention.num_seconds(),
                "Retention reaches past the earliest representable date, nothing pruned"
            ),
        }
    }

    match db.reconcile_tags().await {
        Ok(removed) => {
            report.orphan_tags_removed = removed;
            if removed > 0 {
                tracing::debug!(removed = removed, "Removed orphaned tags");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to reconcile tags"),
    }

    tracing::info!(
        feeds = feeds.len(),
        failed = report.failed(),
        stored = report.stored(),
        "Ingestion finished"
    );
    report
}

/// Parses an already-downloaded document and stores its posts.
///
/// Each post is upserted on its own; a failed write is logged and the next
/// post is still attempted.
pub async fn ingest_bytes(db: &Database, feed: &Feed, bytes: &[u8]) -> FeedOutcome {
    let parsed = match parse_feed(bytes, &feed.name) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(feed = %feed.name, error = %e, "Failed to parse feed, skipping");
            return FeedOutcome {
                feed: feed.name.clone(),
                status: FeedStatus::Failed(e.to_string()),
            };
        }
    };

    if let Some(encoding) = parsed.encoding.as_deref() {
        if !encoding.eq_ignore_ascii_case("utf-8") && !encoding.eq_ignore_ascii_case("utf8") {
            tracing::warn!(
                feed = %feed.name,
                encoding = %encoding,
                "Feed declares a non-UTF-8 encoding, text is passed through unconverted"
            );
        }
    }

    if !parsed.dialect.is_extractable() {
        let status = if parsed.dialect == Dialect::Unrecognized {
            tracing::warn!(feed = %feed.name, "Unrecognized feed format, skipping");
            FeedStatus::Unrecognized
        } else {
            tracing::warn!(feed = %feed.name, "Document has no root element, skipping");
            FeedStatus::Failed("no root element".to_string())
        };
        return FeedOutcome {
            feed: feed.name.clone(),
            status,
        };
    }

    let mut stored = 0;
    let mut failed_writes = 0;
    for post in &parsed.posts {
        match db.upsert(post).await {
            Ok(()) => stored += 1,
            Err(e) => {
                failed_writes += 1;
                tracing::warn!(feed = %feed.name, post = %post.id, error = %e, "Failed to store post");
            }
        }
    }

    tracing::info!(
        feed = %feed.name,
        dialect = %parsed.dialect,
        stored = stored,
        dropped = parsed.dropped,
        truncated = parsed.truncated,
        "Ingested feed"
    );

    FeedOutcome {
        feed: feed.name.clone(),
        status: FeedStatus::Ingested {
            stored,
            dropped: parsed.dropped,
            failed_writes,
        },
    }
}
