//! Cache-first manifest resolution.

use std::sync::Arc;

use adp_types::CapabilityManifest;

use crate::cache::DiscoveryCache;
use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryClient, DiscoveryOutcome};
use crate::transport::ProcessTransport;

/// Resolves manifests through a shared [`DiscoveryCache`], discovering on miss.
pub struct ManifestResolver<T: ProcessTransport> {
    client: DiscoveryClient<T>,
    cache: Arc<DiscoveryCache>,
}

impl<T: ProcessTransport> ManifestResolver<T> {
    /// Build a resolver with its own cache.
    #[must_use]
    pub fn new(transport: Arc<T>, config: DiscoveryConfig) -> Self {
        let cache = Arc::new(DiscoveryCache::new(config.cache_stats_log_interval()));
        Self::with_cache(transport, config, cache)
    }

    /// Build a resolver over an existing cache (shared between resolvers).
    #[must_use]
    pub fn with_cache(transport: Arc<T>, config: DiscoveryConfig, cache: Arc<DiscoveryCache>) -> Self {
        Self {
            client: DiscoveryClient::new(transport, config),
            cache,
        }
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// Resolve a process; concurrent misses share one discovery round trip.
    pub async fn resolve(&self, process_id: &str) -> DiscoveryOutcome {
        self.cache
            .get_or_fetch(process_id, || self.client.fetch(process_id))
            .await
    }

    /// Resolve a process, collapsing every non-manifest outcome into `None`.
    pub async fn discover(&self, process_id: &str) -> Option<Arc<CapabilityManifest>> {
        self.resolve(process_id).await.manifest()
    }
}
