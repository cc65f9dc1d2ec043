//! Tests for `DiscoveryCache` lookup, invalidation and single-flight bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adp_client::{CacheLookup, DiscoveryCache, DiscoveryOutcome};
use adp_types::{CapabilityManifest, HandlerDescriptor};

fn manifest(actions: &[&str]) -> Arc<CapabilityManifest> {
    Arc::new(CapabilityManifest {
        protocol_version: "1.0".to_string(),
        last_updated: String::new(),
        capabilities: Default::default(),
        handlers: actions.iter().map(|a| HandlerDescriptor::new(*a)).collect(),
        name: None,
        ticker: None,
        description: None,
        owner: None,
        logo: None,
    })
}

#[tokio::test]
async fn get_distinguishes_miss_from_cached_none() {
    let cache = DiscoveryCache::default();
    assert_eq!(cache.get("p1").await, CacheLookup::Miss);

    cache.put("p1", None).await;
    assert_eq!(cache.get("p1").await, CacheLookup::Hit(None));

    let m = manifest(&["Ping"]);
    cache.put("p2", Some(Arc::clone(&m))).await;
    assert_eq!(cache.get("p2").await, CacheLookup::Hit(Some(m)));

    let entry = cache.entry("p1").await.expect("entry");
    assert_eq!(entry.process_id, "p1");
    assert!(entry.manifest.is_none());
    assert_eq!(cache.keys().await, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn get_or_fetch_counts_hits_and_misses() {
    let cache = DiscoveryCache::default();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let fetch = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        DiscoveryOutcome::Supported(manifest(&["Ping"]))
    };

    let first = cache.get_or_fetch("p", fetch).await;
    let second = cache.get_or_fetch("p", fetch).await;
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats_snapshot().await;
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.requests_total, 2);
    assert!((stats.hit_rate_pct - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn unreachable_outcome_is_not_stored() {
    let cache = DiscoveryCache::default();
    let outcome = cache
        .get_or_fetch("p", || async {
            DiscoveryOutcome::Unreachable {
                reason: "timeout".to_string(),
            }
        })
        .await;
    assert!(outcome.manifest().is_none());
    assert_eq!(cache.get("p").await, CacheLookup::Miss);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clear_during_fetch_discards_stale_outcome() {
    let cache = Arc::new(DiscoveryCache::default());
    let fetching = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch("p", || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    DiscoveryOutcome::Supported(manifest(&["Old"]))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.clear("p").await;

    let outcome = fetching.await.unwrap();
    assert!(outcome.manifest().is_some());
    assert_eq!(cache.get("p").await, CacheLookup::Miss);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clearing_another_key_keeps_in_flight_outcome() {
    let cache = Arc::new(DiscoveryCache::default());
    cache.put("other", None).await;
    let fetching = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch("p", || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    DiscoveryOutcome::Supported(manifest(&["Ping"]))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.clear("other").await;
    cache.clear("never-cached").await;

    let outcome = fetching.await.unwrap();
    assert_eq!(
        cache.get("p").await,
        CacheLookup::Hit(outcome.manifest()),
        "clearing unrelated keys must not discard the fetch for p"
    );
    assert_eq!(cache.get("other").await, CacheLookup::Miss);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clear_all_during_fetch_discards_every_outcome() {
    let cache = Arc::new(DiscoveryCache::default());
    let fetching = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch("p", || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    DiscoveryOutcome::Supported(manifest(&["Old"]))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.clear_all().await;

    fetching.await.unwrap();
    assert_eq!(cache.get("p").await, CacheLookup::Miss);
    assert!(cache.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_leader_hands_over_to_waiter() {
    let cache = Arc::new(DiscoveryCache::default());
    let leader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch("p", std::future::pending::<DiscoveryOutcome>)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let follower = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch("p", || async {
                    DiscoveryOutcome::Supported(manifest(&["Ping"]))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    leader.abort();

    let outcome = tokio::time::timeout(Duration::from_secs(2), follower)
        .await
        .expect("follower finishes")
        .unwrap();
    assert!(outcome.manifest().is_some());
    assert!(matches!(cache.get("p").await, CacheLookup::Hit(Some(_))));
}
