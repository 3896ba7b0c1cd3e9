//! planet: a feed aggregator that normalizes RSS 2.0 and Atom entries into a
//! deduplicated SQLite post store and exports recent posts as JSON.

pub mod config;
pub mod export;
pub mod feed;
pub mod storage;
