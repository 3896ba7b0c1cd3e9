//! Feed ingestion: turning RSS 2.0 and Atom documents into stored posts.
//!
//! - **Parsing**: a single streaming pass over quick-xml events. The current
//!   element path is tracked explicitly and looked up in per-dialect dispatch
//!   tables, so extraction never builds a DOM.
//! - **Dates**: RFC 822 and ISO 8601 parsing with lenient fallbacks,
//!   normalized to whole-second UTC instants.
//! - **Fetching**: HTTP retrieval with retry, backoff and a size limit.
//! - **Pipeline**: concurrent downloads, sequential upserts, then tag
//!   reconciliation.
//!
//! # Architecture
//!
//! - [`path`] - element path stack with mismatch recovery
//! - [`dialect`] - RSS/Atom detection from the root element
//! - [`text`] - character data accumulation between elements
//! - [`extract`] - path → action tables and the in-progress post
//! - [`parser`] - the parse context that drives the above
//! - [`date`] - date grammars and rendering
//! - [`fetcher`] - HTTP client and download loop
//! - [`pipeline`] - orchestration over all configured feeds

pub mod date;
pub mod dialect;
pub mod extract;
pub mod fetcher;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod text;

pub use dialect::Dialect;
pub use fetcher::{build_client, fetch_feed, FetchError};
pub use parser::{parse_feed, ParseError, ParsedFeed};
pub use pipeline::{ingest_all, ingest_bytes, FeedOutcome, FeedStatus, IngestOptions, IngestReport};
