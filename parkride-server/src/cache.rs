//! Caching layer for source responses.
//!
//! The TfNSW occupancy endpoint is quota-limited and the scraper drives a
//! real browser, so repeated cycles inside a short window reuse the last
//! answer instead of hitting upstream again. Only non-empty answers are
//! cached; an empty or failed fetch, or a listing whose occupancy phase
//! failed, is retried next time.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use moka::future::Cache as MokaCache;

use crate::sources::{FacilitySource, RawFacility, SourceBatch, SourceError, SourceKind};

/// Key-value store with time-based expiry.
///
/// The pipeline does not depend on this; it is injected around sources.
pub trait KeyValueStore<V>: Send + Sync {
    /// The value under `key`, unless missing or expired.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<V>>;

    /// Store `value` under `key` until the store's TTL runs out.
    fn set(&self, key: String, value: V) -> BoxFuture<'_, ()>;

    fn invalidate<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;

    /// Drop every entry.
    fn clear(&self);
}

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 64,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// moka-backed [`KeyValueStore`].
#[derive(Clone)]
pub struct MemoryStore<V: Clone + Send + Sync + 'static> {
    entries: MokaCache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> MemoryStore<V> {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { entries }
    }
}

impl<V: Clone + Send + Sync + 'static> KeyValueStore<V> for MemoryStore<V> {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<V>> {
        Box::pin(async move { self.entries.get(key).await })
    }

    fn set(&self, key: String, value: V) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.entries.insert(key, value).await })
    }

    fn invalidate<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move { self.entries.invalidate(key).await })
    }

    fn clear(&self) {
        self.entries.invalidate_all();
    }
}

/// Store shared by every cached source in one process.
pub type BatchStore = Arc<dyn KeyValueStore<SourceBatch>>;

/// A source with its non-empty answers cached.
///
/// Wraps any [`FacilitySource`]; entries are keyed by source kind so one
/// store can be shared across the chain.
pub struct CachedSource<S> {
    inner: S,
    store: BatchStore,
}

impl<S: FacilitySource> CachedSource<S> {
    pub fn new(inner: S, store: BatchStore) -> Self {
        Self { inner, store }
    }

    fn key(&self, what: &str) -> String {
        format!("{}:{what}", self.inner.kind())
    }
}

/// Whether a batch is worth keeping: some facilities, and for split
/// batches some occupancy too, so a failed occupancy phase is retried.
fn is_complete(batch: &SourceBatch) -> bool {
    match batch {
        SourceBatch::Records(records) => !records.is_empty(),
        SourceBatch::Split { listing, occupancy } => !listing.is_empty() && !occupancy.is_empty(),
    }
}

impl<S: FacilitySource> FacilitySource for CachedSource<S> {
    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
        Box::pin(async move {
            let key = self.key("facilities");

            if let Some(cached) = self.store.get(&key).await {
                return Ok(cached);
            }

            let batch = self.inner.fetch_facilities().await?;
            if is_complete(&batch) {
                self.store.set(key, batch.clone()).await;
            }
            Ok(batch)
        })
    }

    fn fetch_occupancy(&self) -> BoxFuture<'_, Result<Vec<RawFacility>, SourceError>> {
        Box::pin(async move {
            let key = self.key("occupancy");

            if let Some(SourceBatch::Records(cached)) = self.store.get(&key).await {
                return Ok(cached);
            }

            let records = self.inner.fetch_occupancy().await?;
            if !records.is_empty() {
                self.store
                    .set(key, SourceBatch::Records(records.clone()))
                    .await;
            }
            Ok(records)
        })
    }
}
