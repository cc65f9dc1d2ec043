//! Manifest cache keyed by process id, with single-flight discovery.
//!
//! Entries never expire on their own; manifests are stable for the lifetime of a
//! process's deployed code and `clear`/`clear_all` are the only way to force
//! rediscovery. A cached `None` remembers a process that does not describe itself.
//!
//! Concurrent misses for the same key share one fetch: the first caller becomes
//! the leader and publishes its outcome on a `watch` channel the others wait on.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};

use adp_types::CapabilityManifest;

use crate::discovery::DiscoveryOutcome;

const DEFAULT_STATS_LOG_INTERVAL_SECS: u64 = 60;

/// Cached result for one process. Owned by the cache, handed out as clones.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Process identifier.
    pub process_id: String,
    /// Manifest, or `None` for a process without a supported manifest.
    pub manifest: Option<Arc<CapabilityManifest>>,
    /// When the outcome was stored.
    pub fetched_at: SystemTime,
}

/// Result of a plain cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// An outcome is cached (possibly "not capable").
    Hit(Option<Arc<CapabilityManifest>>),
    /// Nothing cached; the caller must discover and `put`.
    Miss,
}

/// Point-in-time view of cache contents and behavior.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryCacheStatsSnapshot {
    /// Cached process count.
    pub entries: usize,
    /// Cached process ids, sorted.
    pub keys: Vec<String>,
    /// `get_or_fetch` calls.
    pub requests_total: u64,
    /// Calls answered from cache.
    pub cache_hits: u64,
    /// Calls that found nothing cached.
    pub cache_misses: u64,
    /// Discovery round trips actually issued.
    pub fetches: u64,
    /// Misses that joined an in-flight fetch instead of issuing one.
    pub coalesced_waits: u64,
    /// `cache_hits / requests_total`, as a percentage.
    pub hit_rate_pct: f64,
}

struct InflightFetch {
    generation: u64,
    outcome: watch::Receiver<Option<DiscoveryOutcome>>,
    /// Set by `clear(process_id)` or `clear_all` while this fetch runs.
    invalidated: Arc<AtomicBool>,
}

enum FlightRole {
    Leader {
        generation: u64,
        publish: watch::Sender<Option<DiscoveryOutcome>>,
        invalidated: Arc<AtomicBool>,
    },
    Follower(watch::Receiver<Option<DiscoveryOutcome>>),
}

/// Shared manifest cache. Construct once and pass by reference (or `Arc`).
pub struct DiscoveryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, InflightFetch>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    coalesced_waits: AtomicU64,
    last_stats_log_at: Mutex<Instant>,
    stats_log_interval: Duration,
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_STATS_LOG_INTERVAL_SECS))
    }
}

impl DiscoveryCache {
    /// Create an empty cache that logs stats at most once per `stats_log_interval`.
    #[must_use]
    pub fn new(stats_log_interval: Duration) -> Self {
        let initial_log_at = Instant::now()
            .checked_sub(stats_log_interval)
            .unwrap_or_else(Instant::now);
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            coalesced_waits: AtomicU64::new(0),
            last_stats_log_at: Mutex::new(initial_log_at),
            stats_log_interval,
        }
    }

    /// Plain lookup without counting or fetching.
    pub async fn get(&self, process_id: &str) -> CacheLookup {
        let entries = self.entries.read().await;
        entries
            .get(process_id)
            .map_or(CacheLookup::Miss, |entry| {
                CacheLookup::Hit(entry.manifest.clone())
            })
    }

    /// Full entry for a process, if cached.
    pub async fn entry(&self, process_id: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(process_id).cloned()
    }

    /// Store an outcome (`None` = process is not capable), replacing any entry.
    pub async fn put(&self, process_id: &str, manifest: Option<Arc<CapabilityManifest>>) {
        let entry = CacheEntry {
            process_id: process_id.to_string(),
            manifest,
            fetched_at: SystemTime::now(),
        };
        self.entries
            .write()
            .await
            .insert(process_id.to_string(), entry);
    }

    /// Drop one entry so the next lookup rediscovers.
    ///
    /// A fetch for the same process that is still in flight will not store its
    /// outcome; fetches for other processes are unaffected.
    pub async fn clear(&self, process_id: &str) {
        let inflight = self.inflight.lock().await;
        if let Some(flight) = inflight.get(process_id) {
            flight.invalidated.store(true, Ordering::SeqCst);
        }
        let removed = self.entries.write().await.remove(process_id).is_some();
        drop(inflight);
        tracing::debug!(
            event = "adp.discovery.cache.cleared",
            process_id,
            removed,
            "discovery cache entry cleared"
        );
    }

    /// Drop every entry.
    pub async fn clear_all(&self) {
        let inflight = self.inflight.lock().await;
        for flight in inflight.values() {
            flight.invalidated.store(true, Ordering::SeqCst);
        }
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        drop(entries);
        drop(inflight);
        tracing::debug!(
            event = "adp.discovery.cache.cleared_all",
            removed,
            "discovery cache cleared"
        );
    }

    /// Cached process ids, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of cached processes.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Resolve a process, running `fetch` at most once across concurrent callers.
    ///
    /// Cacheable outcomes are stored unless the cache was cleared while the
    /// fetch was in flight; unreachable outcomes are shared with the waiting
    /// callers but never stored.
    pub async fn get_or_fetch<F, Fut>(&self, process_id: &str, fetch: F) -> DiscoveryOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = DiscoveryOutcome>,
    {
        loop {
            if let CacheLookup::Hit(manifest) = self.get(process_id).await {
                self.record_hit(process_id);
                return outcome_from_cached(manifest);
            }

            let role = {
                let mut inflight = self.inflight.lock().await;
                if let CacheLookup::Hit(manifest) = self.get(process_id).await {
                    drop(inflight);
                    self.record_hit(process_id);
                    return outcome_from_cached(manifest);
                }
                match inflight.get(process_id) {
                    Some(flight) if flight.outcome.has_changed().is_ok() => {
                        FlightRole::Follower(flight.outcome.clone())
                    }
                    _ => {
                        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                        let (publish, outcome) = watch::channel(None);
                        let invalidated = Arc::new(AtomicBool::new(false));
                        inflight.insert(
                            process_id.to_string(),
                            InflightFetch {
                                generation,
                                outcome,
                                invalidated: Arc::clone(&invalidated),
                            },
                        );
                        FlightRole::Leader {
                            generation,
                            publish,
                            invalidated,
                        }
                    }
                }
            };

            match role {
                FlightRole::Leader {
                    generation,
                    publish,
                    invalidated,
                } => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.fetches.fetch_add(1, Ordering::Relaxed);
                    let outcome = fetch().await;
                    {
                        // Holding the in-flight lock orders this store against `clear`.
                        let mut inflight = self.inflight.lock().await;
                        if outcome.is_cacheable() && !invalidated.load(Ordering::SeqCst) {
                            self.put(process_id, outcome.manifest()).await;
                        }
                        if inflight
                            .get(process_id)
                            .is_some_and(|flight| flight.generation == generation)
                        {
                            inflight.remove(process_id);
                        }
                    }
                    let _ = publish.send(Some(outcome.clone()));
                    tracing::debug!(
                        event = "adp.discovery.cache.fetched",
                        process_id,
                        outcome = outcome.kind(),
                        cached = outcome.is_cacheable(),
                        "discovery fetch completed"
                    );
                    self.maybe_log_stats();
                    return outcome;
                }
                FlightRole::Follower(mut outcome_rx) => {
                    self.coalesced_waits.fetch_add(1, Ordering::Relaxed);
                    let shared = outcome_rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| outcome.clone());
                    if let Some(outcome) = shared {
                        tracing::debug!(
                            event = "adp.discovery.cache.coalesced",
                            process_id,
                            outcome = outcome.kind(),
                            "joined in-flight discovery"
                        );
                        return outcome;
                    }
                    // Leader was cancelled before publishing; take over.
                }
            }
        }
    }

    /// Return a cheap point-in-time snapshot of cache contents and counters.
    pub async fn stats_snapshot(&self) -> DiscoveryCacheStatsSnapshot {
        let keys = self.keys().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        self.counters_snapshot(keys, hits, misses)
    }

    fn counters_snapshot(
        &self,
        keys: Vec<String>,
        hits: u64,
        misses: u64,
    ) -> DiscoveryCacheStatsSnapshot {
        let requests = hits.saturating_add(misses);
        let hit_rate_pct = if requests == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = hits as f64 / requests as f64;
            (ratio * 10_000.0).round() / 100.0
        };
        DiscoveryCacheStatsSnapshot {
            entries: keys.len(),
            keys,
            requests_total: requests,
            cache_hits: hits,
            cache_misses: misses,
            fetches: self.fetches.load(Ordering::Relaxed),
            coalesced_waits: self.coalesced_waits.load(Ordering::Relaxed),
            hit_rate_pct,
        }
    }

    fn record_hit(&self, process_id: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            event = "adp.discovery.cache.hit",
            process_id,
            "manifest served from cache"
        );
        self.maybe_log_stats();
    }

    fn maybe_log_stats(&self) {
        let Ok(mut last_log_at) = self.last_stats_log_at.try_lock() else {
            return;
        };
        if last_log_at.elapsed() < self.stats_log_interval {
            return;
        }
        *last_log_at = Instant::now();
        drop(last_log_at);

        let entries = self.entries.try_read().map(|entries| entries.len()).ok();
        let snapshot = self.counters_snapshot(
            Vec::new(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        );
        tracing::info!(
            event = "adp.discovery.cache.stats",
            entries,
            requests_total = snapshot.requests_total,
            cache_hits = snapshot.cache_hits,
            cache_misses = snapshot.cache_misses,
            fetches = snapshot.fetches,
            coalesced_waits = snapshot.coalesced_waits,
            hit_rate_pct = snapshot.hit_rate_pct,
            "discovery cache stats"
        );
    }
}

fn outcome_from_cached(manifest: Option<Arc<CapabilityManifest>>) -> DiscoveryOutcome {
    match manifest {
        Some(manifest) => DiscoveryOutcome::Supported(manifest),
        None => DiscoveryOutcome::Unsupported {
            reason: "process previously answered without a supported manifest".to_string(),
        },
    }
}
