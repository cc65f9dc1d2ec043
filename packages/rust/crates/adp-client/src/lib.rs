//! Capability discovery for actor processes.
//!
//! Sends the reserved read-only `Info` query through a caller-provided
//! [`ProcessTransport`], decodes the published manifest, and caches the outcome
//! per process id. Concurrent discoveries of the same uncached process collapse
//! into a single round trip.
//!
//! Discovery failure is never fatal: callers get `None` (or a
//! [`DiscoveryOutcome`] explaining why) and fall back to plain messaging.

mod cache;
mod config;
mod discovery;
mod resolver;
#[doc(hidden)]
pub mod test_support;
mod transport;

pub use cache::{CacheEntry, CacheLookup, DiscoveryCache, DiscoveryCacheStatsSnapshot};
pub use config::DiscoveryConfig;
pub use discovery::{DiscoveryClient, DiscoveryOutcome, manifest_from_response};
pub use resolver::ManifestResolver;
pub use transport::ProcessTransport;
