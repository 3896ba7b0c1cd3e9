use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::dialect::Dialect;
use super::extract::{end_action, link_binds, start_action, Action, PostBuilder, Rejection};
use super::path::PathTracker;
use super::text::TextAccumulator;
use crate::storage::Post;

/// Errors that make a whole document unusable.
///
/// Problems inside a recognized document (bad nesting, bad dates, missing
/// ids, syntax errors after the root element) are logged and recovered
/// instead.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body was empty or whitespace only
    #[error("Empty feed document")]
    Empty,
    /// XML could not be read up to the root element
    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Result of one streaming parse pass over a feed document.
#[derive(Debug)]
pub struct ParsedFeed {
    pub dialect: Dialect,
    /// Document title, or the configured feed name if the document has none.
    pub title: String,
    /// Encoding named by the XML declaration, passed through unconverted.
    pub encoding: Option<String>,
    /// Completed posts in document order.
    pub posts: Vec<Post>,
    /// Entries rejected for a missing id or date, or left unclosed.
    pub dropped: usize,
    /// A syntax error stopped the parse early.
    pub truncated: bool,
}

/// Parses a raw RSS 2.0 or Atom document into posts.
///
/// Posts are emitted only when their `<item>`/`<entry>` element closes. A
/// document whose root is neither `rss` nor `feed` parses successfully with
/// zero posts and `dialect == Dialect::Unrecognized`.
pub fn parse_feed(bytes: &[u8], feed_name: &str) -> Result<ParsedFeed, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_reader(bytes);
    // Nesting is checked by the path tracker, which recovers instead of failing
    reader.config_mut().check_end_names = false;

    let mut ctx = ParseContext::new(feed_name);
    let mut buf = Vec::new();

    loop {
        let decoder = reader.decoder();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => ctx.start_element(&e, decoder),
            Ok(Event::Empty(e)) => {
                ctx.start_element(&e, decoder);
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                ctx.end_element(&name);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                ctx.end_element(&name);
            }
            Ok(Event::Text(e)) => match e.unescape() {
                Ok(text) => ctx.text.push(&text),
                // Undeclared entities (&nbsp; in HTML bodies) are kept raw
                Err(_) => ctx.text.push(&String::from_utf8_lossy(&e)),
            },
            Ok(Event::CData(e)) => ctx.text.push(&String::from_utf8_lossy(&e)),
            Ok(Event::Decl(e)) => {
                if let Some(Ok(encoding)) = e.encoding() {
                    ctx.encoding = Some(String::from_utf8_lossy(&encoding).into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let position = reader.buffer_position() as u64;
                if ctx.dialect == Dialect::Unknown {
                    return Err(ParseError::Xml {
                        position,
                        message: e.to_string(),
                    });
                }
                tracing::warn!(
                    feed = %feed_name,
                    position = position,
                    error = %e,
                    "XML syntax error, keeping entries parsed so far"
                );
                ctx.truncated = true;
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ctx.finish())
}

/// Transient state for one feed document.
struct ParseContext<'a> {
    feed_name: &'a str,
    dialect: Dialect,
    path: PathTracker,
    text: TextAccumulator,
    current: Option<PostBuilder>,
    feed_title: Option<String>,
    feed_author: Option<String>,
    encoding: Option<String>,
    posts: Vec<Post>,
    dropped: usize,
    truncated: bool,
}

impl<'a> ParseContext<'a> {
    fn new(feed_name: &'a str) -> Self {
        Self {
            feed_name,
            dialect: Dialect::Unknown,
            path: PathTracker::new(),
            text: TextAccumulator::new(),
            current: None,
            feed_title: None,
            feed_author: None,
            encoding: None,
            posts: Vec::new(),
            dropped: 0,
            truncated: false,
        }
    }

    fn start_element(&mut self, e: &BytesStart<'_>, decoder: Decoder) {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        self.text.reset();
        self.path.push(&name);

        if self.dialect.detect(&name) {
            tracing::debug!(feed = %self.feed_name, dialect = %self.dialect, "Detected feed dialect");
        }

        match start_action(self.dialect, self.path.as_str()) {
            Some(Action::BeginPost) => {
                if self.current.is_some() {
                    tracing::warn!(
                        feed = %self.feed_name,
                        path = %self.path.as_str(),
                        "Entry opened before the previous one closed, discarding the previous one"
                    );
                    self.dropped += 1;
                }
                self.current = Some(PostBuilder::new());
            }
            Some(Action::LinkAttributes) => {
                if let Some(post) = self.current.as_mut() {
                    let attrs = read_attributes(e, decoder);
                    let rel = attribute(&attrs, "rel");
                    if let Some(href) = attribute(&attrs, "href") {
                        if link_binds(rel, post.has_link()) {
                            post.set_link(href.to_string());
                        }
                    }
                }
            }
            Some(Action::CategoryTerm) => {
                if let Some(post) = self.current.as_mut() {
                    let attrs = read_attributes(e, decoder);
                    if let Some(term) = attribute(&attrs, "term") {
                        post.add_tag(term.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn end_element(&mut self, name: &str) {
        let mut text = self.text.take();

        // Close children left open (`<item><title>x</item>`) so their text
        // still reaches the post before the named element closes.
        if self.path.top() != Some(name) && self.path.contains(name) {
            while let Some(top) = self.path.top().filter(|t| *t != name).map(str::to_string) {
                tracing::warn!(
                    feed = %self.feed_name,
                    path = %self.path.as_str(),
                    element = %name,
                    "Implicitly closing unterminated element"
                );
                self.dispatch_end(std::mem::take(&mut text));
                self.path.pop(&top);
            }
        }

        if self.path.top() == Some(name) {
            self.dispatch_end(text);
        }
        self.path.pop(name);
    }

    fn dispatch_end(&mut self, text: String) {
        let Some(action) = end_action(self.dialect, self.path.as_str()) else {
            return;
        };

        match action {
            Action::EndPost => {
                if let Some(builder) = self.current.take() {
                    self.close_post(builder);
                }
            }
            // Blank values count as absent
            Action::FeedTitle => {
                if self.feed_title.is_none() && !text.trim().is_empty() {
                    self.feed_title = Some(text);
                }
            }
            Action::FeedAuthor => {
                if self.feed_author.is_none() && !text.trim().is_empty() {
                    self.feed_author = Some(text);
                }
            }
            Action::Set(field) => {
                if let Some(post) = self.current.as_mut() {
                    post.set(field, text);
                }
            }
            Action::BeginPost | Action::LinkAttributes | Action::CategoryTerm => {}
        }
    }

    fn close_post(&mut self, builder: PostBuilder) {
        let feed_title = self.feed_title.as_deref().unwrap_or(self.feed_name);
        match builder.finish(
            self.dialect,
            self.feed_name,
            feed_title,
            self.feed_author.as_deref(),
        ) {
            Ok(post) => self.posts.push(post),
            Err(rejection) => {
                self.dropped += 1;
                match rejection {
                    Rejection::MissingId => {
                        tracing::warn!(feed = %self.feed_name, "Entry has no id, skipping");
                    }
                    Rejection::MissingDate => {
                        tracing::warn!(feed = %self.feed_name, "Entry has no date, skipping");
                    }
                    Rejection::BadDate(e) => {
                        tracing::warn!(feed = %self.feed_name, error = %e, "Invalid date format, skipping entry");
                    }
                }
            }
        }
    }

    fn finish(mut self) -> ParsedFeed {
        if !self.path.is_empty() {
            tracing::warn!(
                feed = %self.feed_name,
                path = %self.path.as_str(),
                "Document ended with unclosed elements"
            );
        }
        if self.current.take().is_some() {
            tracing::warn!(feed = %self.feed_name, "Last entry never closed, discarding it");
            self.dropped += 1;
        }

        // Feed-level title and author may follow the entries in the document
        let title = self
            .feed_title
            .unwrap_or_else(|| self.feed_name.to_string());
        for post in &mut self.posts {
            post.feed_title.clone_from(&title);
            if self.dialect == Dialect::Atom && post.author.is_none() {
                post.author.clone_from(&self.feed_author);
            }
        }

        ParsedFeed {
            dialect: self.dialect,
            title,
            encoding: self.encoding,
            posts: self.posts,
            dropped: self.dropped,
            truncated: self.truncated,
        }
    }
}

/// Decoded `(key, value)` pairs of an element, in document order.
fn read_attributes(e: &BytesStart<'_>, decoder: Decoder) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        match attr.decode_and_unescape_value(decoder) {
            Ok(value) => attrs.push((key, value.into_owned())),
            Err(e) => tracing::warn!(key = %key, error = %e, "Skipping undecodable attribute"),
        }
    }
    attrs
}

fn attribute<'v>(attrs: &'v [(String, String)], key: &str) -> Option<&'v str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn march_first() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn atom(entries: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <author><name>Feed Author</name></author>
  {}
</feed>"#,
            entries
        )
    }

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example RSS</title>
    <link>http://x/</link>
    {}
  </channel>
</rss>"#,
            items
        )
    }

    #[test]
    fn test_atom_entry_example() {
        let doc = atom(
            r#"<entry><id>u1</id><title>Hello</title><published>2024-03-01T10:00:00Z</published><link rel="alternate" href="http://x/1"/></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();

        assert_eq!(parsed.dialect, Dialect::Atom);
        assert_eq!(parsed.title, "Example Atom");
        assert_eq!(parsed.encoding.as_deref(), Some("utf-8"));
        assert_eq!(parsed.posts.len(), 1);
        let post = &parsed.posts[0];
        assert_eq!(post.id, "u1");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.link, "http://x/1");
        assert_eq!(post.published_at, march_first());
        assert_eq!(post.feed_name, "example");
        assert_eq!(post.feed_title, "Example Atom");
    }

    #[test]
    fn test_rss_item_example() {
        let doc = rss(
            r#"<item><guid>g1</guid><title>Hello</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();

        assert_eq!(parsed.dialect, Dialect::Rss);
        assert_eq!(parsed.posts.len(), 1);
        let post = &parsed.posts[0];
        assert_eq!(post.id, "g1");
        assert!(post.tags.is_empty());
        assert_eq!(post.published_at, march_first());
        assert_eq!(post.updated_at, Some(march_first()));
    }

    #[test]
    fn test_rss_all_fields_and_tag_order() {
        let doc = rss(
            r#"<item>
  <guid isPermaLink="false">g1</guid>
  <title>Title &amp; more</title>
  <dc:creator>Bob</dc:creator>
  <link>http://x/g1</link>
  <pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate>
  <category>zeta</category>
  <category>alpha</category>
  <category>zeta</category>
  <description>Short</description>
  <content:encoded><![CDATA[<p>Long</p>]]></content:encoded>
</item>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        let post = &parsed.posts[0];

        assert_eq!(post.title, "Title & more");
        assert_eq!(post.author.as_deref(), Some("Bob"));
        assert_eq!(post.link, "http://x/g1");
        assert_eq!(post.tags, vec!["zeta", "alpha", "zeta"]);
        assert_eq!(post.description.as_deref(), Some("Short"));
        assert_eq!(post.content.as_deref(), Some("<p>Long</p>"));
        assert_eq!(post.body(), Some("<p>Long</p>"));
    }

    #[test]
    fn test_rss_items_in_document_order() {
        let doc = rss(
            r#"<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>
<item><guid>b</guid><pubDate>Sat, 02 Mar 2024 10:00:00 +0000</pubDate></item>
<item><guid>c</guid><pubDate>Sun, 03 Mar 2024 10:00:00 +0000</pubDate></item>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        let ids: Vec<&str> = parsed.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(parsed.dropped, 0);
    }

    #[test]
    fn test_rss_author_is_not_defaulted() {
        let doc = rss(
            r#"<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].author, None);
    }

    #[test]
    fn test_atom_link_self_then_alternate() {
        let doc = atom(
            r#"<entry><id>u1</id><published>2024-03-01T10:00:00Z</published>
<link rel="self" href="http://x/self"/>
<link rel="alternate" href="http://x/real"/></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].link, "http://x/real");
    }

    #[test]
    fn test_atom_link_attribute_order_independent() {
        let doc = atom(
            r#"<entry><id>u1</id><published>2024-03-01T10:00:00Z</published>
<link href="http://x/real" type="text/html" rel="alternate"/></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].link, "http://x/real");
    }

    #[test]
    fn test_atom_link_without_rel() {
        let doc = atom(
            r#"<entry><id>u1</id><published>2024-03-01T10:00:00Z</published>
<link href="http://x/plain"/>
<link rel="enclosure" href="http://x/audio.mp3"/></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].link, "http://x/plain");
    }

    #[test]
    fn test_atom_feed_link_is_ignored() {
        let doc = atom(
            r#"<link rel="alternate" href="http://x/home"/>
<entry><id>u1</id><published>2024-03-01T10:00:00Z</published></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].link, "");
    }

    #[test]
    fn test_atom_author_default_and_override() {
        let doc = atom(
            r#"<entry><id>u1</id><published>2024-03-01T10:00:00Z</published></entry>
<entry><id>u2</id><published>2024-03-01T10:00:00Z</published>
  <author><name>Entry Author</name></author></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].author.as_deref(), Some("Feed Author"));
        assert_eq!(parsed.posts[1].author.as_deref(), Some("Entry Author"));
    }

    #[test]
    fn test_atom_feed_author_after_entries() {
        let doc = r#"<feed><entry><id>u1</id><published>2024-03-01T10:00:00Z</published></entry>
<title>Late Title</title><author><name>Late Author</name></author></feed>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].author.as_deref(), Some("Late Author"));
        assert_eq!(parsed.posts[0].feed_title, "Late Title");
    }

    #[test]
    fn test_atom_categories_updated_content_summary() {
        let doc = atom(
            r#"<entry><id>u1</id>
<published>2024-03-01T10:00:00Z</published>
<updated>2024-03-02T10:00:00+00:00</updated>
<category term="rust"/><category term="xml" label="XML"></category>
<summary>Sum</summary>
<content type="html">&lt;p&gt;Body&lt;/p&gt;</content>
</entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        let post = &parsed.posts[0];
        assert_eq!(post.tags, vec!["rust", "xml"]);
        assert_eq!(
            post.updated_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap())
        );
        assert_eq!(post.description.as_deref(), Some("Sum"));
        assert_eq!(post.content.as_deref(), Some("<p>Body</p>"));
    }

    #[test]
    fn test_atom_fractional_seconds() {
        let doc = atom(r#"<entry><id>u1</id><published>2024-03-01T10:00:00.123Z</published></entry>"#);
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].published_at, march_first());
    }

    #[test]
    fn test_feed_title_first_occurrence_wins() {
        let doc = r#"<rss><channel><title>First</title><title>Second</title>
<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item></channel></rss>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.title, "First");
        assert_eq!(parsed.posts[0].feed_title, "First");
    }

    #[test]
    fn test_missing_title_falls_back_to_feed_name() {
        let doc = r#"<rss><channel><item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item></channel></rss>"#;
        let parsed = parse_feed(doc.as_bytes(), "configured-name").unwrap();
        assert_eq!(parsed.title, "configured-name");
        assert_eq!(parsed.posts[0].feed_title, "configured-name");
    }

    #[test]
    fn test_blank_title_falls_back_to_feed_name() {
        for title in ["<title></title>", "<title/>", "<title>  \n </title>"] {
            let doc = format!(
                "<rss><channel>{}<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item></channel></rss>",
                title
            );
            let parsed = parse_feed(doc.as_bytes(), "configured-name").unwrap();
            assert_eq!(parsed.title, "configured-name", "title element {}", title);
            assert_eq!(parsed.posts[0].feed_title, "configured-name");
        }
    }

    #[test]
    fn test_blank_atom_feed_author_not_used_as_default() {
        let doc = r#"<feed><title>T</title><author><name></name></author>
<entry><id>u1</id><published>2024-03-01T10:00:00Z</published></entry></feed>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].author, None);
    }

    #[test]
    fn test_item_title_does_not_leak_into_feed_title() {
        let doc = r#"<rss><channel><item><guid>a</guid><title>Item</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item><title>Channel</title></channel></rss>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.title, "Channel");
        assert_eq!(parsed.posts[0].title, "Item");
    }

    #[test]
    fn test_bad_entries_dropped_siblings_kept() {
        let doc = rss(
            r#"<item><title>no id</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>
<item><guid>bad-date</guid><pubDate>someday</pubDate></item>
<item><guid>no-date</guid></item>
<item><guid>ok</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].id, "ok");
        assert_eq!(parsed.dropped, 3);
    }

    #[test]
    fn test_unrecognized_dialect_yields_nothing() {
        let doc = r#"<?xml version="1.0"?>
<rdf:RDF><channel><title>RDF</title></channel>
<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item></rdf:RDF>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.dialect, Dialect::Unrecognized);
        assert!(parsed.posts.is_empty());
        assert_eq!(parsed.title, "example");
    }

    #[test]
    fn test_text_is_not_normalized() {
        let doc = rss(
            "<item><guid>a</guid><title>\n  Spaced  out\n</title><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>",
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].title, "\n  Spaced  out\n");
    }

    #[test]
    fn test_mixed_content_keeps_trailing_text_only() {
        let doc = atom(
            r#"<entry><id>u1</id><published>2024-03-01T10:00:00Z</published>
<content type="xhtml">lead <b>bold</b> tail</content></entry>"#,
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].content.as_deref(), Some(" tail"));
    }

    #[test]
    fn test_unknown_entity_kept_raw() {
        let doc = rss(
            "<item><guid>a</guid><description>a&nbsp;b</description><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>",
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].description.as_deref(), Some("a&nbsp;b"));
    }

    #[test]
    fn test_unterminated_field_recovered() {
        let doc = r#"<rss><channel><item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate><title>Unclosed</item></channel></rss>"#;
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].title, "Unclosed");
    }

    #[test]
    fn test_truncated_document_keeps_closed_entries() {
        let doc = rss(
            r#"<item><guid>a</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#,
        );
        let cut = doc.find("</channel>").unwrap();
        let truncated = format!(
            "{}<item><guid>b</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate>",
            &doc[..cut]
        );
        let parsed = parse_feed(truncated.as_bytes(), "example").unwrap();
        let ids: Vec<&str> = parsed.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(parsed.dropped, 1);
    }

    #[test]
    fn test_empty_body_is_an_error() {
        assert!(matches!(parse_feed(b"", "example"), Err(ParseError::Empty)));
        assert!(matches!(parse_feed(b"  \n ", "example"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_garbage_before_root_is_an_error() {
        assert!(matches!(
            parse_feed(b"<not valid xml", "example"),
            Err(ParseError::Xml { .. })
        ));
    }

    #[test]
    fn test_id_whitespace_trimmed() {
        let doc = rss(
            "<item><guid>\n  tag:x,2024:1\n</guid><pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>",
        );
        let parsed = parse_feed(doc.as_bytes(), "example").unwrap();
        assert_eq!(parsed.posts[0].id, "tag:x,2024:1");
    }
}
