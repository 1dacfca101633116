use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use super::{CacheEntry, CacheError, Content, ContentRegistry, ContentSource};
use crate::api::{ContentFetcher, FetchError};
use crate::store::KeyValueStore;
use crate::utils::{Clock, SystemClock};

/// Upper bound on a single remote fetch, whatever the fetcher's own timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Which tier of the load chain produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Valid cache entry, no network access.
    Cache,
    /// Fresh network fetch, now persisted.
    Network,
    /// Fetch failed; an expired cache entry was served.
    Stale,
    /// Fetch failed and nothing was cached; the bundled payload was served.
    Fallback,
}

/// Result of a successful `CacheManager::load`.
#[derive(Debug)]
pub struct Loaded<T> {
    pub payload: Arc<T>,
    pub origin: LoadOrigin,
    /// When the payload was fetched from the remote. `None` for fallbacks.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Why a Stale or Fallback payload was served instead of a fresh one.
    pub fetch_error: Option<FetchError>,
}

impl<T> Loaded<T> {
    pub fn is_stale(&self) -> bool {
        self.origin == LoadOrigin::Stale
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == LoadOrigin::Fallback
    }

    /// True when the module should show an offline banner.
    pub fn is_degraded(&self) -> bool {
        self.is_stale() || self.is_fallback()
    }
}

impl<T> Clone for Loaded<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            origin: self.origin,
            fetched_at: self.fetched_at,
            fetch_error: self.fetch_error.clone(),
        }
    }
}

/// Public view of a source's transient load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready(LoadOrigin),
    Failed(CacheError),
}

/// Per-source age of the cached entry, for status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheAge {
    pub source_id: String,
    pub age: Option<String>,
}

impl CacheAge {
    pub fn display(&self) -> &str {
        self.age.as_deref().unwrap_or("never")
    }
}

type ErasedPayload = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct ErasedLoaded {
    payload: ErasedPayload,
    origin: LoadOrigin,
    fetched_at: Option<DateTime<Utc>>,
    fetch_error: Option<FetchError>,
}

impl ErasedLoaded {
    fn downcast<T: Content>(self, source_id: &str) -> Result<Loaded<T>, CacheError> {
        let payload = Arc::downcast::<T>(self.payload)
            .map_err(|_| CacheError::PayloadTypeMismatch(source_id.to_string()))?;
        Ok(Loaded {
            payload,
            origin: self.origin,
            fetched_at: self.fetched_at,
            fetch_error: self.fetch_error,
        })
    }
}

type LoadResult = Result<ErasedLoaded, CacheError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum LoadState {
    Loading(SharedLoad),
    Ready(LoadOrigin),
    Failed(CacheError),
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn ContentFetcher>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
    // Keyed by source id. Absent means Idle.
    states: Mutex<HashMap<String, LoadState>>,
}

/// Generic cache-aside loader shared by every content module.
/// Clone is cheap; clones share load state and single-flight registry.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("fetch_timeout", &self.inner.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self::with_clock(store, fetcher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ContentFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(store, fetcher, clock, DEFAULT_FETCH_TIMEOUT)
    }

    /// Replace the fetch deadline. Intended for construction time.
    pub fn with_fetch_timeout(self, timeout: Duration) -> Self {
        Self::build(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.fetcher),
            Arc::clone(&self.inner.clock),
            timeout,
        )
    }

    fn build(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ContentFetcher>,
        clock: Arc<dyn Clock>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fetcher,
                clock,
                fetch_timeout,
                states: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Resolve `source` through the load chain.
    ///
    /// 1. Valid cache entry (skipped when `force_refresh`).
    /// 2. Join an in-flight load for the same source id.
    /// 3. Fetch, persist, return.
    /// 4. On fetch failure, any cache entry, tagged `Stale`.
    /// 5. Otherwise the bundled fallback, tagged `Fallback`.
    ///
    /// A failed refresh never removes the existing entry.
    pub async fn load<T: Content>(
        &self,
        source: &ContentSource<T>,
        force_refresh: bool,
    ) -> Result<Loaded<T>, CacheError> {
        if !force_refresh {
            if let Some(loaded) = self.inner.valid_cached(source) {
                debug!(source = %source.source_id, "Cache hit");
                self.inner.mark_ready_unless_loading(&source.source_id, LoadOrigin::Cache);
                return Ok(loaded);
            }
        }

        let load = Inner::join_or_start(&self.inner, source, force_refresh);
        let loaded = load.await?;
        loaded.downcast(&source.source_id)
    }

    /// Forced reload. Same as `load(source, true)`.
    pub async fn refresh<T: Content>(&self, source: &ContentSource<T>) -> Result<Loaded<T>, CacheError> {
        self.load(source, true).await
    }

    pub fn status(&self, source_id: &str) -> LoadStatus {
        let states = self.inner.states.lock().unwrap_or_else(|e| e.into_inner());
        match states.get(source_id) {
            None => LoadStatus::Idle,
            Some(LoadState::Loading(_)) => LoadStatus::Loading,
            Some(LoadState::Ready(origin)) => LoadStatus::Ready(*origin),
            Some(LoadState::Failed(e)) => LoadStatus::Failed(e.clone()),
        }
    }

    /// When the entry for `cache_key` was fetched, if one exists.
    pub fn cached_at(&self, cache_key: &str) -> Option<DateTime<Utc>> {
        self.inner.read_entry(cache_key).and_then(|e| e.fetched_at())
    }

    /// Delete the cached entry for one source.
    pub fn clear<T>(&self, source: &ContentSource<T>) -> Result<(), CacheError> {
        self.clear_entry(&source.source_id, &source.cache_key)
    }

    /// Delete every registered source's cached entry.
    pub fn clear_all(&self, registry: &ContentRegistry) -> Result<(), CacheError> {
        for info in registry.iter() {
            self.clear_entry(&info.source_id, &info.cache_key)?;
        }
        info!(count = registry.len(), "Cleared all content caches");
        Ok(())
    }

    fn clear_entry(&self, source_id: &str, cache_key: &str) -> Result<(), CacheError> {
        self.inner.store.delete(cache_key)?;
        let mut states = self.inner.states.lock().unwrap_or_else(|e| e.into_inner());
        if !matches!(states.get(source_id), Some(LoadState::Loading(_))) {
            states.remove(source_id);
        }
        debug!(source = source_id, cache_key, "Cache entry cleared");
        Ok(())
    }

    pub fn cache_ages(&self, registry: &ContentRegistry) -> Vec<CacheAge> {
        let now_ms = self.inner.clock.now_millis();
        registry
            .iter()
            .map(|info| CacheAge {
                source_id: info.source_id.clone(),
                age: self
                    .inner
                    .read_entry(&info.cache_key)
                    .map(|entry| entry.age_display(now_ms)),
            })
            .collect()
    }
}

impl Inner {
    fn join_or_start<T: Content>(
        this: &Arc<Self>,
        source: &ContentSource<T>,
        force_refresh: bool,
    ) -> SharedLoad {
        let mut states = this.states.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(LoadState::Loading(load)) = states.get(&source.source_id) {
            debug!(source = %source.source_id, force_refresh, "Joining in-flight load");
            return load.clone();
        }

        // The load runs as its own task so it completes, and its state
        // settles, even if every waiter is dropped.
        let task = tokio::spawn(Arc::clone(this).fetch_with_recovery(source.clone()));
        let inner = Arc::clone(this);
        let source_id = source.source_id.clone();
        let load = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(source = %source_id, error = %e, "Load task aborted");
                    let err = CacheError::LoadAborted {
                        source_id: source_id.clone(),
                        reason: e.to_string(),
                    };
                    inner
                        .states
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(source_id, LoadState::Failed(err.clone()));
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();
        states.insert(source.source_id.clone(), LoadState::Loading(load.clone()));
        load
    }

    async fn fetch_with_recovery<T: Content>(self: Arc<Self>, source: ContentSource<T>) -> LoadResult {
        info!(source = %source.source_id, url = %source.remote_url, "Fetching remote content");

        let result = match self.fetch_payload(&source).await {
            Ok((payload, raw)) => {
                let entry = CacheEntry::new(&source.cache_key, raw, self.clock.now_millis());
                if let Err(e) = self.write_entry(&entry) {
                    warn!(source = %source.source_id, error = %e, "Failed to persist fetched content");
                }
                info!(source = %source.source_id, "Remote content fetched");
                let payload: ErasedPayload = Arc::new(payload);
                Ok(ErasedLoaded {
                    payload,
                    origin: LoadOrigin::Network,
                    fetched_at: entry.fetched_at(),
                    fetch_error: None,
                })
            }
            Err(fetch_error) => {
                warn!(source = %source.source_id, error = %fetch_error, "Remote fetch failed");
                self.recover(&source, fetch_error)
            }
        };

        let state = match &result {
            Ok(loaded) => LoadState::Ready(loaded.origin),
            Err(e) => LoadState::Failed(e.clone()),
        };
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source.source_id.clone(), state);

        result
    }

    async fn fetch_payload<T: Content>(
        &self,
        source: &ContentSource<T>,
    ) -> Result<(T, serde_json::Value), FetchError> {
        let fetch = self.fetcher.fetch(&source.remote_url);
        let bytes = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::NetworkUnavailable(format!(
                    "timed out after {}ms",
                    self.fetch_timeout.as_millis()
                )))
            }
        };

        let raw: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::MalformedPayload(e.to_string()))?;
        let payload = T::deserialize(&raw).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;
        Ok((payload, raw))
    }

    fn recover<T: Content>(&self, source: &ContentSource<T>, fetch_error: FetchError) -> LoadResult {
        if let Some(entry) = self.read_entry(&source.cache_key) {
            match entry.decode::<T>() {
                Ok(payload) => {
                    warn!(
                        source = %source.source_id,
                        age = %entry.age_display(self.clock.now_millis()),
                        "Serving stale cached content"
                    );
                    let payload: ErasedPayload = Arc::new(payload);
                    return Ok(ErasedLoaded {
                        payload,
                        origin: LoadOrigin::Stale,
                        fetched_at: entry.fetched_at(),
                        fetch_error: Some(fetch_error),
                    });
                }
                Err(e) => {
                    warn!(source = %source.source_id, error = %e, "Cached entry does not decode, skipping");
                }
            }
        }

        match source.fallback_payload() {
            Some(payload) => {
                warn!(source = %source.source_id, "Serving bundled fallback content");
                let payload: ErasedPayload = Arc::new(payload);
                Ok(ErasedLoaded {
                    payload,
                    origin: LoadOrigin::Fallback,
                    fetched_at: None,
                    fetch_error: Some(fetch_error),
                })
            }
            None => {
                error!(source = %source.source_id, "Every load tier exhausted and no fallback registered");
                Err(CacheError::NoFallbackAvailable(source.source_id.clone()))
            }
        }
    }

    fn valid_cached<T: Content>(&self, source: &ContentSource<T>) -> Option<Loaded<T>> {
        let entry = self.read_entry(&source.cache_key)?;
        if !entry.is_valid(source.ttl, self.clock.now_millis()) {
            return None;
        }
        match entry.decode::<T>() {
            Ok(payload) => Some(Loaded {
                payload: Arc::new(payload),
                origin: LoadOrigin::Cache,
                fetched_at: entry.fetched_at(),
                fetch_error: None,
            }),
            Err(e) => {
                warn!(source = %source.source_id, error = %e, "Cached entry does not decode, refetching");
                None
            }
        }
    }

    /// Read an entry, treating unreadable or corrupt entries as absent.
    fn read_entry(&self, cache_key: &str) -> Option<CacheEntry> {
        match self.store.get(cache_key) {
            Ok(Some(bytes)) => match CacheEntry::from_bytes(&bytes) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(cache_key, error = %e, "Failed to parse cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key, error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> anyhow::Result<()> {
        let bytes = entry.to_bytes()?;
        self.store.set(&entry.cache_key, &bytes)
    }

    fn mark_ready_unless_loading(&self, source_id: &str, origin: LoadOrigin) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        if !matches!(states.get(source_id), Some(LoadState::Loading(_))) {
            states.insert(source_id.to_string(), LoadState::Ready(origin));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
