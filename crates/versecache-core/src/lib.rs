//! Core library for versecache.
//!
//! Provides the offline-first content cache that backs every content screen
//! of the Bible study app, the quiz session engine and progress tracking.
//! Front ends (the `versecache` CLI, a mobile shell) only wire a
//! [`store::KeyValueStore`] and an [`api::ContentFetcher`] into a
//! [`cache::CacheManager`].

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod models;
pub mod quiz;
pub mod store;
pub mod utils;

pub use api::{ContentFetcher, FetchError, HttpFetcher};
pub use cache::{CacheError, CacheManager, ContentRegistry, ContentSource, LoadOrigin, Loaded};
pub use config::Config;
pub use content::ContentSources;
pub use quiz::{QuizEngine, QuizError, RevealPolicy};
pub use store::{FileStore, KeyValueStore, MemoryStore};
