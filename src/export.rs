//! JSON export of windowed posts for downstream renderers.
//!
//! Each post is written with its stored fields plus the body to render, the
//! homepage of its feed, and the publication date in three presentations:
//! the configured local format, RSS (RFC 822) and Atom (ISO 8601).
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

use crate::config::Feed;
use crate::feed::date::{self, DateError};
use crate::storage::Post;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Date(#[from] DateError),
}

#[derive(Debug, Serialize)]
pub struct PostExport<'a> {
    #[serde(flatten)]
    pub post: &'a Post,
    pub body: Option<&'a str>,
    /// `home` of the configured feed named by `post.feed_name`, if any.
    pub feed_home: Option<&'a str>,
    pub formatted_date: String,
    pub rfc822_date: String,
    pub iso8601_date: String,
}

impl<'a> PostExport<'a> {
    pub fn new(
        post: &'a Post,
        feed_home: Option<&'a str>,
        date_format: &str,
    ) -> Result<Self, DateError> {
        Ok(Self {
            post,
            body: post.body(),
            feed_home,
            formatted_date: date::format_local(post.published_at, date_format)?,
            rfc822_date: date::to_rfc822(post.published_at),
            iso8601_date: date::to_iso8601(post.published_at),
        })
    }
}

/// Writes `posts` as a pretty-printed JSON array, preserving their order.
///
/// Posts from feeds no longer in `feeds` are still written, without a home.
pub fn write_json<W: Write>(
    mut writer: W,
    posts: &[Post],
    feeds: &[Feed],
    date_format: &str,
) -> Result<(), ExportError> {
    let homes: HashMap<&str, &str> = feeds
        .iter()
        .filter_map(|f| f.home.as_deref().map(|home| (f.name.as_str(), home)))
        .collect();
    let exports = posts
        .iter()
        .map(|post| {
            let home = homes.get(post.feed_name.as_str()).copied();
            PostExport::new(post, home, date_format)
        })
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_writer_pretty(&mut writer, &exports)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
