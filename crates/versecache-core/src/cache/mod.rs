//! Cache-aside loading of remote content documents.
//!
//! `CacheManager::load` resolves a `ContentSource` through a fixed chain:
//! valid cache entry, single-flight network fetch, stale cache entry,
//! bundled fallback payload. Only the last tier failing is an error, and
//! that only happens when a source was built without a fallback.
//!
//! Entries embed their own fetch timestamp, so payload and age can never
//! drift apart.

pub mod entry;
pub mod error;
pub mod manager;
pub mod source;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use manager::{CacheAge, CacheManager, LoadOrigin, LoadStatus, Loaded};
pub use source::{Content, ContentRegistry, ContentSource, SourceInfo};
