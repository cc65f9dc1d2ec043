use std::time::Duration;

use serde::{Deserialize, Serialize};

use adp_client::DiscoveryConfig;

use crate::matcher::DEFAULT_MIN_CONFIDENCE;

const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;
const MIN_OPERATION_TIMEOUT_MS: u64 = 100;
const MAX_OPERATION_TIMEOUT_MS: u64 = 300_000;

/// Effective dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Discovery client and cache settings.
    pub discovery: DiscoveryConfig,
    /// Upper bound for the final read/write round trip.
    pub operation_timeout_ms: u64,
    /// Matcher acceptance floor.
    pub min_confidence: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl DispatcherConfig {
    /// Clamped operation timeout.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(
            self.operation_timeout_ms
                .clamp(MIN_OPERATION_TIMEOUT_MS, MAX_OPERATION_TIMEOUT_MS),
        )
    }
}
