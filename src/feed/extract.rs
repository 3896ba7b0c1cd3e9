//! Path-keyed dispatch tables for RSS and Atom.
//!
//! Each recognized element path maps to a small [`Action`]. Start-element
//! actions fire on `<x>` (and on self-closing `<x/>`), end-element actions
//! fire on `</x>` with the element's accumulated text.
use chrono::{DateTime, Utc};

use super::date::{parse_iso8601, parse_rfc822, DateError};
use super::dialect::Dialect;
use crate::storage::Post;

/// What to do when a recognized path opens or closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    BeginPost,
    EndPost,
    FeedTitle,
    FeedAuthor,
    Set(Field),
    /// Atom `<link>`: inspect `rel`/`href` attributes.
    LinkAttributes,
    /// Atom `<category>`: read the `term` attribute.
    CategoryTerm,
}

/// Post field written from an element's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Title,
    Author,
    Link,
    Content,
    Description,
    Tag,
    /// RSS `pubDate`: RFC822, sets both `published_at` and `updated_at`.
    PubDate,
    /// Atom `published`: ISO8601.
    Published,
    /// Atom `updated`: ISO8601.
    Updated,
}

/// Action for a start element at `path`.
pub fn start_action(dialect: Dialect, path: &str) -> Option<Action> {
    match dialect {
        Dialect::Rss => match path {
            "/rss/channel/item" => Some(Action::BeginPost),
            _ => None,
        },
        Dialect::Atom => match path {
            "/feed/entry" => Some(Action::BeginPost),
            "/feed/entry/link" => Some(Action::LinkAttributes),
            "/feed/entry/category" => Some(Action::CategoryTerm),
            _ => None,
        },
        Dialect::Unknown | Dialect::Unrecognized => None,
    }
}

/// Action for an end element at `path` (the path still includes the element).
pub fn end_action(dialect: Dialect, path: &str) -> Option<Action> {
    match dialect {
        Dialect::Rss => match path {
            "/rss/channel/title" => Some(Action::FeedTitle),
            "/rss/channel/item" => Some(Action::EndPost),
            "/rss/channel/item/guid" => Some(Action::Set(Field::Id)),
            "/rss/channel/item/title" => Some(Action::Set(Field::Title)),
            "/rss/channel/item/dc:creator" => Some(Action::Set(Field::Author)),
            "/rss/channel/item/link" => Some(Action::Set(Field::Link)),
            "/rss/channel/item/pubDate" => Some(Action::Set(Field::PubDate)),
            "/rss/channel/item/category" => Some(Action::Set(Field::Tag)),
            "/rss/channel/item/description" => Some(Action::Set(Field::Description)),
            "/rss/channel/item/content:encoded" => Some(Action::Set(Field::Content)),
            _ => None,
        },
        Dialect::Atom => match path {
            "/feed/title" => Some(Action::FeedTitle),
            "/feed/author/name" => Some(Action::FeedAuthor),
            "/feed/entry" => Some(Action::EndPost),
            "/feed/entry/id" => Some(Action::Set(Field::Id)),
            "/feed/entry/title" => Some(Action::Set(Field::Title)),
            "/feed/entry/author/name" => Some(Action::Set(Field::Author)),
            "/feed/entry/published" => Some(Action::Set(Field::Published)),
            "/feed/entry/updated" => Some(Action::Set(Field::Updated)),
            "/feed/entry/content" => Some(Action::Set(Field::Content)),
            "/feed/entry/summary" => Some(Action::Set(Field::Description)),
            _ => None,
        },
        Dialect::Unknown | Dialect::Unrecognized => None,
    }
}

/// Whether an Atom `<link>` binds the post link.
///
/// `rel="alternate"` always binds, wherever it appears among the attributes.
/// A link with no `rel` at all binds only while the post has no link yet.
/// Any other `rel` (`self`, `enclosure`, `replies`, ...) is ignored.
pub fn link_binds(rel: Option<&str>, has_link: bool) -> bool {
    match rel {
        Some("alternate") => true,
        Some(_) => false,
        None => !has_link,
    }
}

/// Why a closed entry could not become a [`Post`].
#[derive(Debug, PartialEq, Eq)]
pub enum Rejection {
    MissingId,
    MissingDate,
    BadDate(DateError),
}

/// Fields collected for the item/entry currently open.
///
/// Dates are kept raw and parsed when the entry closes, so a malformed date
/// rejects exactly one post.
#[derive(Debug, Default)]
pub struct PostBuilder {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    link: Option<String>,
    content: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    tags: Vec<String>,
}

impl PostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` into `field`. The first author wins; other fields take
    /// the last value seen.
    pub fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Id => self.id = Some(text),
            Field::Title => self.title = Some(text),
            Field::Author => {
                if self.author.is_none() {
                    self.author = Some(text);
                }
            }
            Field::Link => self.link = Some(text),
            Field::Content => self.content = Some(text),
            Field::Description => self.description = Some(text),
            Field::Tag => self.tags.push(text),
            Field::PubDate => self.pub_date = Some(text),
            Field::Published => self.published = Some(text),
            Field::Updated => self.updated = Some(text),
        }
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn set_link(&mut self, href: String) {
        self.link = Some(href);
    }

    pub fn add_tag(&mut self, tag: String) {
        self.tags.push(tag);
    }

    /// Completes the post once its item/entry element has closed.
    ///
    /// `feed_author` is the Atom feed-level author, used when the entry
    /// names none.
    pub fn finish(
        self,
        dialect: Dialect,
        feed_name: &str,
        feed_title: &str,
        feed_author: Option<&str>,
    ) -> Result<Post, Rejection> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => return Err(Rejection::MissingId),
        };

        let (published_at, updated_at) = match dialect {
            Dialect::Atom => atom_dates(self.published.as_deref(), self.updated.as_deref())?,
            _ => {
                let raw = self.pub_date.ok_or(Rejection::MissingDate)?;
                let instant = parse_rfc822(&raw).map_err(Rejection::BadDate)?;
                (instant, Some(instant))
            }
        };

        let author = match dialect {
            Dialect::Atom => self.author.or_else(|| feed_author.map(str::to_string)),
            _ => self.author,
        };

        Ok(Post {
            id,
            feed_name: feed_name.to_string(),
            feed_title: feed_title.to_string(),
            title: self.title.unwrap_or_default(),
            author,
            link: self.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            content: self.content,
            description: self.description,
            published_at,
            updated_at,
            tags: self.tags,
        })
    }
}

/// `published` is optional in Atom while `updated` is mandatory, so an entry
/// without `<published>` is dated by `<updated>`. A present but malformed
/// date rejects the entry.
fn atom_dates(
    published: Option<&str>,
    updated: Option<&str>,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), Rejection> {
    let updated_at = updated
        .map(parse_iso8601)
        .transpose()
        .map_err(Rejection::BadDate)?;
    let published_at = match published {
        Some(raw) => parse_iso8601(raw).map_err(Rejection::BadDate)?,
        None => updated_at.ok_or(Rejection::MissingDate)?,
    };
    Ok((published_at, updated_at))
}
