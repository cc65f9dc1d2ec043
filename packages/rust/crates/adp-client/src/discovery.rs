//! Discovery client: issue the reserved `Info` query and decode the manifest.
//!
//! Every failure stays local. A transport error or timeout becomes
//! [`DiscoveryOutcome::Unreachable`] (retried on the next call), a payload that
//! is not a supported manifest becomes [`DiscoveryOutcome::Unsupported`]
//! (remembered by the cache).

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use adp_types::{CapabilityManifest, info_query_tags};

use crate::config::DiscoveryConfig;
use crate::transport::ProcessTransport;

/// Result of one discovery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// The process published a supported manifest.
    Supported(Arc<CapabilityManifest>),
    /// The process answered but does not describe itself.
    Unsupported {
        /// Why no manifest was accepted.
        reason: String,
    },
    /// The round trip failed or timed out.
    Unreachable {
        /// Transport error text.
        reason: String,
    },
}

impl DiscoveryOutcome {
    /// The manifest, if any.
    #[must_use]
    pub fn manifest(&self) -> Option<Arc<CapabilityManifest>> {
        match self {
            Self::Supported(manifest) => Some(Arc::clone(manifest)),
            Self::Unsupported { .. } | Self::Unreachable { .. } => None,
        }
    }

    /// Whether this outcome may be remembered by the cache.
    ///
    /// Transport failures are never cached so a later call retries discovery.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Unreachable { .. })
    }

    /// Human-readable explanation (empty for a supported process).
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Supported(_) => String::new(),
            Self::Unsupported { reason } | Self::Unreachable { reason } => reason.clone(),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Supported(_) => "supported",
            Self::Unsupported { .. } => "unsupported",
            Self::Unreachable { .. } => "unreachable",
        }
    }
}

/// Issues self-description queries through a [`ProcessTransport`].
pub struct DiscoveryClient<T: ProcessTransport> {
    transport: Arc<T>,
    config: DiscoveryConfig,
}

impl<T: ProcessTransport> DiscoveryClient<T> {
    /// Create a client over a shared transport.
    #[must_use]
    pub fn new(transport: Arc<T>, config: DiscoveryConfig) -> Self {
        Self { transport, config }
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover a manifest, collapsing every failure into `None`.
    pub async fn discover(&self, process_id: &str) -> Option<Arc<CapabilityManifest>> {
        self.fetch(process_id).await.manifest()
    }

    /// Discover a manifest and report how the attempt ended.
    ///
    /// The `Info` query and the fallback scan share one deadline of
    /// `config.timeout()` from the start of the call.
    pub async fn fetch(&self, process_id: &str) -> DiscoveryOutcome {
        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;
        let tags = info_query_tags();
        let primary = match tokio::time::timeout_at(deadline, self.transport.read(process_id, &tags))
            .await
        {
            Ok(Ok(response)) => match manifest_from_response(&response) {
                Some(manifest) => {
                    tracing::debug!(
                        event = "adp.discovery.fetch.supported",
                        process_id,
                        handlers = manifest.handlers.len(),
                        "process published a capability manifest"
                    );
                    return DiscoveryOutcome::Supported(Arc::new(manifest));
                }
                None => DiscoveryOutcome::Unsupported {
                    reason: "Info response carried no supported manifest".to_string(),
                },
            },
            Ok(Err(error)) => {
                tracing::warn!(
                    event = "adp.discovery.fetch.failed",
                    process_id,
                    error = %error,
                    "self-description query failed"
                );
                DiscoveryOutcome::Unreachable {
                    reason: format!("Info query failed: {error}"),
                }
            }
            Err(_) => {
                tracing::warn!(
                    event = "adp.discovery.fetch.timeout",
                    process_id,
                    timeout_ms = timeout.as_millis(),
                    "self-description query timed out"
                );
                DiscoveryOutcome::Unreachable {
                    reason: format!("Info query timed out after {}ms", timeout.as_millis()),
                }
            }
        };

        if !self.config.fallback_scan_enabled || Instant::now() >= deadline {
            return primary;
        }
        match self.scan_recent_responses(process_id, deadline).await {
            Some(manifest) => {
                tracing::info!(
                    event = "adp.discovery.fallback.found",
                    process_id,
                    handlers = manifest.handlers.len(),
                    "manifest recovered from recent responses"
                );
                DiscoveryOutcome::Supported(Arc::new(manifest))
            }
            None => primary,
        }
    }

    async fn scan_recent_responses(
        &self,
        process_id: &str,
        deadline: Instant,
    ) -> Option<CapabilityManifest> {
        match tokio::time::timeout_at(deadline, self.transport.recent_responses(process_id)).await {
            Ok(Ok(responses)) => responses.iter().find_map(manifest_from_response),
            Ok(Err(error)) => {
                tracing::debug!(
                    event = "adp.discovery.fallback.failed",
                    process_id,
                    error = %error,
                    "recent response scan failed"
                );
                None
            }
            Err(_) => {
                tracing::debug!(
                    event = "adp.discovery.fallback.timeout",
                    process_id,
                    "recent response scan timed out"
                );
                None
            }
        }
    }
}

/// Find the first payload in a raw response that decodes as a manifest.
///
/// Accepts a bare manifest object, a JSON string, a dry-run style
/// `{ "Messages": [{ "Data": .. }], "Output": { "data": .. } }` envelope, or an
/// array of any of these.
#[must_use]
pub fn manifest_from_response(response: &Value) -> Option<CapabilityManifest> {
    let mut payloads = Vec::new();
    collect_payloads(response, &mut payloads, 0);
    payloads.iter().find_map(|payload| {
        CapabilityManifest::from_value(payload.clone())
            .map_err(|error| {
                tracing::debug!(
                    event = "adp.discovery.payload.rejected",
                    error = %error,
                    "payload is not a supported manifest"
                );
            })
            .ok()
    })
}

const MAX_PAYLOAD_DEPTH: usize = 4;

fn collect_payloads(value: &Value, out: &mut Vec<Value>, depth: usize) {
    if depth > MAX_PAYLOAD_DEPTH {
        return;
    }
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            if (trimmed.starts_with('{') || trimmed.starts_with('"'))
                && let Ok(parsed) = serde_json::from_str::<Value>(trimmed)
            {
                collect_payloads(&parsed, out, depth + 1);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_payloads(item, out, depth + 1);
            }
        }
        Value::Object(map) => {
            if map.contains_key("protocolVersion") {
                out.push(value.clone());
                return;
            }
            for key in ["Messages", "messages"] {
                if let Some(messages) = map.get(key) {
                    collect_payloads(messages, out, depth + 1);
                }
            }
            for key in ["Data", "data"] {
                if let Some(data) = map.get(key) {
                    collect_payloads(data, out, depth + 1);
                }
            }
            for key in ["Output", "output"] {
                if let Some(output) = map.get(key) {
                    collect_payloads(output, out, depth + 1);
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn finds_manifest_in_dry_run_envelope() {
        let manifest = json!({"protocolVersion": "1.0", "handlers": [{"action": "Ping"}]});
        let response = json!({
            "Messages": [
                {"Data": "hello"},
                {"Data": manifest.to_string()}
            ]
        });
        let decoded = manifest_from_response(&response).expect("manifest");
        assert_eq!(decoded.actions(), vec!["Ping"]);
    }

    #[test]
    fn ignores_unsupported_payloads() {
        let response = json!({
            "Messages": [{"Data": {"protocolVersion": "0.1", "handlers": []}}],
            "Output": {"data": "plain text"}
        });
        assert!(manifest_from_response(&response).is_none());
    }

    #[test]
    fn unreachable_is_not_cacheable() {
        let outcome = DiscoveryOutcome::Unreachable {
            reason: "timeout".to_string(),
        };
        assert!(!outcome.is_cacheable());
        assert!(
            DiscoveryOutcome::Unsupported {
                reason: String::new()
            }
            .is_cacheable()
        );
    }
}
