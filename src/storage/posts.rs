use chrono::{DateTime, TimeDelta, Utc};
use sqlx::QueryBuilder;
use std::collections::HashMap;

use super::schema::Database;
use super::types::{DatabaseError, Post, PostDbRow, TagRow};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of posts to return from any single query (OOM protection)
const MAX_POSTS: usize = 2000;

/// Rows per multi-row statement. Keeps bound parameters under SQLite's 999
/// limit (3 columns * 300 = 900 for tag inserts).
const BATCH_SIZE: usize = 300;

impl Database {
    // ========================================================================
    // Post Mutations
    // ========================================================================

    /// Insert a post, or fully replace the stored post with the same id.
    ///
    /// Last write wins: no field of the previous version survives, and its
    /// tags are replaced by the new post's tags. The post row and its tags
    /// are written in one transaction, so concurrent callers never interleave
    /// partial writes for the same id.
    pub async fn upsert(&self, post: &Post) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, feed_name, feed_title, title, author, link,
                               content, description, published_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                feed_name = excluded.feed_name,
                feed_title = excluded.feed_title,
                title = excluded.title,
                author = excluded.author,
                link = excluded.link,
                content = excluded.content,
                description = excluded.description,
                published_at = excluded.published_at,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(&post.id)
        .bind(&post.feed_name)
        .bind(&post.feed_title)
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.link)
        .bind(&post.content)
        .bind(&post.description)
        .bind(post.published_at.timestamp())
        .bind(post.updated_at.map(|dt| dt.timestamp()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tags WHERE post_id = ?")
            .bind(&post.id)
            .execute(&mut *tx)
            .await?;

        for (chunk_index, chunk) in post.tags.chunks(BATCH_SIZE).enumerate() {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO tags (post_id, position, tag) ");
            builder.push_values(chunk.iter().enumerate(), |mut b, (i, tag)| {
                let position = (chunk_index * BATCH_SIZE + i) as i64;
                b.push_bind(&post.id).push_bind(position).push_bind(tag);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete tag rows whose post no longer exists, returning how many.
    ///
    /// Tags of posts that are still present are never touched. Readers
    /// running between a post deletion and this call may see stale tags.
    pub async fn reconcile_tags(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM tags WHERE NOT EXISTS (SELECT 1 FROM posts WHERE posts.id = tags.post_id)",
        )
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::debug!(removed = removed, "Removed orphaned tag rows");
        }
        Ok(removed)
    }

    /// Delete posts published before `cutoff`, returning how many.
    ///
    /// Their tag rows are left for [`Database::reconcile_tags`].
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM posts WHERE published_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Post Queries
    // ========================================================================

    /// Posts published within `max_age` of now, newest first.
    ///
    /// See [`Database::query_at`].
    pub async fn query(&self, max_age: TimeDelta, limit: usize) -> Result<Vec<Post>, DatabaseError> {
        self.query_at(Utc::now(), max_age, limit).await
    }

    /// Posts with `now - published_at < max_age`, ordered by `published_at`
    /// descending and then by `id` ascending, truncated to `limit`.
    ///
    /// The limit is capped at MAX_POSTS (2000).
    pub async fn query_at(
        &self,
        now: DateTime<Utc>,
        max_age: TimeDelta,
        limit: usize,
    ) -> Result<Vec<Post>, DatabaseError> {
        let safe_limit: i64 = limit.min(MAX_POSTS).try_into().unwrap_or(i64::MAX);
        let cutoff = now
            .checked_sub_signed(max_age)
            .map(|dt| dt.timestamp())
            .unwrap_or(i64::MIN);
        tracing::debug!(
            requested_limit = limit,
            safe_limit = safe_limit,
            cutoff = cutoff,
            "query posts with limit cap"
        );

        let rows = sqlx::query_as::<_, PostDbRow>(
            r#"
            SELECT id, feed_name, feed_title, title, author, link, content,
                   description, published_at, updated_at
            FROM posts
            WHERE published_at > ?
            ORDER BY published_at DESC, id ASC
            LIMIT ?
        "#,
        )
        .bind(cutoff)
        .bind(safe_limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(rows).await
    }

    /// Get a single post by id.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostDbRow>(
            r#"
            SELECT id, feed_name, feed_title, title, author, link, content,
                   description, published_at, updated_at
            FROM posts
            WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn count_posts(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn count_tags(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Load tags for `rows` with one query per `BATCH_SIZE` ids and build the
    /// posts, preserving the order of `rows`.
    async fn attach_tags(&self, rows: Vec<PostDbRow>) -> Result<Vec<Post>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut tags: HashMap<String, Vec<String>> = HashMap::new();
        for chunk in rows.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("SELECT post_id, tag FROM tags WHERE post_id IN (");
            let mut separated = builder.separated(", ");
            for row in chunk {
                separated.push_bind(&row.id);
            }
            separated.push_unseparated(") ORDER BY post_id, position");

            let tag_rows: Vec<TagRow> = builder.build_query_as().fetch_all(&self.pool).await?;
            for TagRow { post_id, tag } in tag_rows {
                tags.entry(post_id).or_default().push(tag);
            }
        }

        rows.into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_post(post_tags)
            })
            .collect()
    }
}
