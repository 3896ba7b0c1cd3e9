use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The post database is locked by another process. Please try again later.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored timestamp is outside the representable range
    #[error("Invalid timestamp {0} stored for post")]
    InvalidTimestamp(i64),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One syndicated entry, normalized from an RSS `<item>` or Atom `<entry>`.
///
/// `id` is the dedup key: upserting a post with an existing id replaces the
/// stored post entirely, tags included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: String,
    pub feed_name: String,
    pub feed_title: String,
    pub title: String,
    pub author: Option<String>,
    pub link: String,
    pub content: Option<String>,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Document order, duplicates kept.
    pub tags: Vec<String>,
}

impl Post {
    /// Text to render: `content` when present, else `description`.
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().or(self.description.as_deref())
    }
}

// ============================================================================
// Helper Types
// ============================================================================

/// Internal row type for post queries (used by sqlx FromRow)
/// Converts to Post via into_post() once tags are attached
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostDbRow {
    pub id: String,
    pub feed_name: String,
    pub feed_title: String,
    pub title: String,
    pub author: Option<String>,
    pub link: String,
    pub content: Option<String>,
    pub description: Option<String>,
    pub published_at: i64,
    pub updated_at: Option<i64>,
}

impl PostDbRow {
    pub(crate) fn into_post(self, tags: Vec<String>) -> Result<Post, DatabaseError> {
        let published_at = timestamp(self.published_at)?;
        let updated_at = self.updated_at.map(timestamp).transpose()?;
        Ok(Post {
            id: self.id,
            feed_name: self.feed_name,
            feed_title: self.feed_title,
            title: self.title,
            author: self.author,
            link: self.link,
            content: self.content,
            description: self.description,
            published_at,
            updated_at,
            tags,
        })
    }
}

/// Tag row joined back onto its post (used in batch tag loading)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    pub post_id: String,
    pub tag: String,
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::from_timestamp(secs, 0).ok_or(DatabaseError::InvalidTimestamp(secs))
}
