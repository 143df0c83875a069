//! Cache-aside link resolution.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::entities::LinkRecord;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

/// Default lifetime of a cached link record (1 day).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Settings for [`ResolutionService`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long a cached record may be served before it is refetched.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Resolves link ids to their routing records.
///
/// Reads go to the cache first and fall back to the record store, which is the
/// source of truth. Cache trouble of any kind (unreachable, corrupt payload,
/// failed write) is logged and counted but never fails a resolution.
pub struct ResolutionService<L: LinkRepository + ?Sized, C: CacheService + ?Sized> {
    link_repository: Arc<L>,
    cache: Arc<C>,
    config: ResolverConfig,
}

impl<L: LinkRepository + ?Sized, C: CacheService + ?Sized> ResolutionService<L, C> {
    /// Creates a new resolution service.
    pub fn new(link_repository: Arc<L>, cache: Arc<C>, config: ResolverConfig) -> Self {
        Self {
            link_repository,
            cache,
            config,
        }
    }

    /// Returns the routing record for `id`.
    ///
    /// On a cache miss the record is fetched from the store and written back to
    /// the cache with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the store has no such link (nothing is
    /// cached in that case). Returns [`AppError::Internal`] if the store fails.
    pub async fn resolve(&self, id: &str) -> Result<LinkRecord, AppError> {
        if let Some(record) = self.read_cached(id).await {
            counter!("link_cache_hits_total").increment(1);
            return Ok(record);
        }
        counter!("link_cache_misses_total").increment(1);

        let record = self
            .link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "id": id })))?;

        self.write_cached(id, &record).await;

        Ok(record)
    }

    async fn read_cached(&self, id: &str) -> Option<LinkRecord> {
        let payload = match self.cache.get(id).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("Cache MISS for {}", id);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", id, e);
                counter!("link_cache_errors_total", "op" => "get").increment(1);
                return None;
            }
        };

        match LinkRecord::from_json(&payload) {
            Ok(record) if record.id == id => {
                debug!("Cache HIT for {}", id);
                Some(record)
            }
            Ok(record) => {
                warn!(
                    "Cached record for {} carries id {}, refetching",
                    id, record.id
                );
                counter!("link_cache_corrupt_total").increment(1);
                None
            }
            Err(e) => {
                warn!("Discarding cached record for {}: {}", id, e);
                counter!("link_cache_corrupt_total").increment(1);
                None
            }
        }
    }

    async fn write_cached(&self, id: &str, record: &LinkRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize link record {}: {}", id, e);
                return;
            }
        };

        if let Err(e) = self.cache.put(id, &payload, self.config.cache_ttl).await {
            warn!("Cache write failed for {}: {}", id, e);
            counter!("link_cache_errors_total", "op" => "put").increment(1);
        }
    }
}
