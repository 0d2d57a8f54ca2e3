//! Caching Catalogue
//!
//! Wraps any resolver with a TTL-bounded cache. Descriptors are immutable
//! within one operation, so a short TTL is enough to keep them fresh.
//! Misses and outages are never cached: a newly published item becomes
//! visible on the next lookup.

use aaa_core::ResourceDescriptor;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{CatalogueError, Result};
use crate::resolver::CatalogueResolver;

/// Default number of descriptors kept in the cache
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Resolver decorator with a moka TTL cache
pub struct CachedCatalogue<R> {
    inner: Arc<R>,
    cache: Cache<String, Arc<ResourceDescriptor>>,
}

impl<R: CatalogueResolver + 'static> CachedCatalogue<R> {
    /// Wrap `inner` with a cache whose entries live for `ttl`
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: R, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner: Arc::new(inner),
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    /// Drop a cached descriptor so the next lookup reaches the inner resolver
    pub async fn invalidate(&self, resource_id: &str) {
        self.cache.invalidate(resource_id).await;
    }

    /// Number of cached descriptors (approximate)
    pub fn cached_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<R: CatalogueResolver + 'static> CatalogueResolver for CachedCatalogue<R> {
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor> {
        let inner = Arc::clone(&self.inner);
        let id = resource_id.to_string();

        // Concurrent lookups for the same id share one inner call; errors
        // are returned to every waiter and not inserted.
        let item = self
            .cache
            .try_get_with(resource_id.to_string(), async move {
                debug!(resource_id = %id, resolver = inner.description(), "Catalogue cache miss");
                inner.resolve(&id).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<CatalogueError>| (*e).clone())?;

        Ok((*item).clone())
    }

    fn description(&self) -> &str {
        "cached catalogue"
    }
}
