use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `":memory:"` opens a private in-memory store (used by tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the database
    /// lock (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Other` for other database errors.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for the write lock
        // before returning SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // An in-memory database is per-connection, so it must stay on one.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
            {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    ///
    /// `tags` deliberately has no foreign key to `posts`: a post can be
    /// deleted (retention pruning, external cleanup) while its tag rows
    /// linger until [`Database::reconcile_tags`] runs.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                feed_name TEXT NOT NULL,
                feed_title TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT,
                link TEXT NOT NULL,
                content TEXT,
                description TEXT,
                published_at INTEGER NOT NULL,
                updated_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                post_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                tag TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Window queries filter and sort on published_at
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published_at DESC, id)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tags_post ON tags(post_id, position)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
