use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::CacheError;

/// Payload types a content module can load.
pub trait Content: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Content for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

type FallbackFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Static descriptor of one content module's remote document.
pub struct ContentSource<T> {
    pub source_id: String,
    pub remote_url: String,
    pub cache_key: String,
    /// Zero disables cache hits; the entry is still kept as a stale fallback.
    pub ttl: Duration,
    fallback: Option<FallbackFactory<T>>,
}

impl<T> ContentSource<T> {
    pub fn new(
        source_id: impl Into<String>,
        remote_url: impl Into<String>,
        cache_key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            remote_url: remote_url.into(),
            cache_key: cache_key.into(),
            ttl,
            fallback: None,
        }
    }

    /// Attach the bundled payload served when neither network nor cache
    /// can provide one.
    pub fn with_fallback(mut self, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.fallback = Some(Arc::new(factory));
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn fallback_payload(&self) -> Option<T> {
        self.fallback.as_ref().map(|factory| factory())
    }

    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            source_id: self.source_id.clone(),
            remote_url: self.remote_url.clone(),
            cache_key: self.cache_key.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T> Clone for ContentSource<T> {
    fn clone(&self) -> Self {
        Self {
            source_id: self.source_id.clone(),
            remote_url: self.remote_url.clone(),
            cache_key: self.cache_key.clone(),
            ttl: self.ttl,
            fallback: self.fallback.clone(),
        }
    }
}

impl<T> fmt::Debug for ContentSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSource")
            .field("source_id", &self.source_id)
            .field("remote_url", &self.remote_url)
            .field("cache_key", &self.cache_key)
            .field("ttl", &self.ttl)
            .field("has_fallback", &self.has_fallback())
            .finish()
    }
}

/// Type-erased summary of a registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub source_id: String,
    pub remote_url: String,
    pub cache_key: String,
    pub ttl: Duration,
}

/// Startup registration of every content module's source.
///
/// Registration is where configuration defects surface: a source without a
/// fallback, or two sources sharing an id or cache key.
#[derive(Debug, Default)]
pub struct ContentRegistry {
    sources: Vec<SourceInfo>,
    by_id: HashMap<String, usize>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, source: &ContentSource<T>) -> Result<(), CacheError> {
        if !source.has_fallback() {
            return Err(CacheError::NoFallbackAvailable(source.source_id.clone()));
        }
        if self.by_id.contains_key(&source.source_id) {
            return Err(CacheError::DuplicateSource(source.source_id.clone()));
        }
        if self.sources.iter().any(|s| s.cache_key == source.cache_key) {
            return Err(CacheError::DuplicateSource(source.cache_key.clone()));
        }

        debug!(source = %source.source_id, cache_key = %source.cache_key, "Content source registered");
        self.by_id.insert(source.source_id.clone(), self.sources.len());
        self.sources.push(source.info());
        Ok(())
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceInfo> {
        self.by_id.get(source_id).map(|&i| &self.sources[i])
    }

    /// Registered sources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceInfo> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, key: &str) -> ContentSource<Vec<u32>> {
        ContentSource::new(id, format!("https://example.test/{}.json", id), key, Duration::hours(1))
            .with_fallback(Vec::new)
    }

    #[test]
    fn test_register_requires_fallback() {
        let mut registry = ContentRegistry::new();
        let no_fallback: ContentSource<Vec<u32>> =
            ContentSource::new("facts", "https://example.test/facts.json", "facts", Duration::hours(1));

        assert_eq!(
            registry.register(&no_fallback),
            Err(CacheError::NoFallbackAvailable("facts".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ContentRegistry::new();
        registry.register(&source("facts", "facts_v1")).unwrap();

        assert_eq!(
            registry.register(&source("facts", "facts_v2")),
            Err(CacheError::DuplicateSource("facts".to_string()))
        );
        assert_eq!(
            registry.register(&source("guides", "facts_v1")),
            Err(CacheError::DuplicateSource("facts_v1".to_string()))
        );

        registry.register(&source("guides", "guides_v1")).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("guides").map(|s| s.cache_key.as_str()), Some("guides_v1"));
    }

    #[test]
    fn test_fallback_payload() {
        let src = ContentSource::new("x", "u", "k", Duration::zero()).with_fallback(|| vec![7u32]);
        assert_eq!(src.fallback_payload(), Some(vec![7]));
        assert!(format!("{:?}", src).contains("has_fallback: true"));
    }
}
