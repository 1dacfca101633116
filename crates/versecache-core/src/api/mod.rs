//! Remote content fetching.
//!
//! Content documents are static JSON files served over plain HTTP GET.
//! The `ContentFetcher` trait is the seam the cache manager talks to;
//! `HttpFetcher` is the reqwest-backed implementation.

pub mod client;
pub mod error;

pub use client::{ContentFetcher, HttpFetcher};
pub use error::FetchError;
