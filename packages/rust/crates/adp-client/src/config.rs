//! Discovery settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;
const MIN_DISCOVERY_TIMEOUT_MS: u64 = 100;
const MAX_DISCOVERY_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_CACHE_STATS_LOG_INTERVAL_SECS: u64 = 60;

/// Discovery client and cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Upper bound for one self-description round trip (and for the fallback scan).
    pub timeout_ms: u64,
    /// Scan recent published responses when `Info` yields no manifest.
    pub fallback_scan_enabled: bool,
    /// Minimum interval between cache stats log lines.
    pub cache_stats_log_interval_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
            fallback_scan_enabled: true,
            cache_stats_log_interval_secs: DEFAULT_CACHE_STATS_LOG_INTERVAL_SECS,
        }
    }
}

impl DiscoveryConfig {
    /// Round-trip timeout, clamped to a sane range.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(
            self.timeout_ms
                .clamp(MIN_DISCOVERY_TIMEOUT_MS, MAX_DISCOVERY_TIMEOUT_MS),
        )
    }

    /// Stats log interval (at least one second).
    #[must_use]
    pub fn cache_stats_log_interval(&self) -> Duration {
        Duration::from_secs(self.cache_stats_log_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped() {
        let tiny = DiscoveryConfig {
            timeout_ms: 1,
            ..DiscoveryConfig::default()
        };
        assert_eq!(tiny.timeout(), Duration::from_millis(100));
        let huge = DiscoveryConfig {
            timeout_ms: u64::MAX,
            ..DiscoveryConfig::default()
        };
        assert_eq!(huge.timeout(), Duration::from_secs(120));
    }
}
