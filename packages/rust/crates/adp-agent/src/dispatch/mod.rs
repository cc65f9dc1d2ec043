//! Dispatcher: resolve manifest, plan, invoke the read or write primitive.
//!
//! Every entry point returns a [`DispatchResult`]; no error or panic from a
//! lower layer crosses this boundary.

mod error;
mod message;
mod operation;
mod plan;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinSet;

use adp_client::{DiscoveryCache, DiscoveryOutcome, ManifestResolver, ProcessTransport};
use adp_types::{CapabilityManifest, OperationKind};

use crate::config::DispatcherConfig;
use crate::contracts::{DispatchPlan, DispatchResult};
use crate::matcher::HandlerMatcher;

pub use error::{DispatchError, SelectedHandler};
pub use message::{BODY_PARAMETER, build_message};
pub use operation::{classify_operation, declared_operation, infer_operation};
pub use plan::plan_dispatch;

/// One instruction of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Target process.
    pub process_id: String,
    /// Free-text instruction.
    pub text: String,
    /// Caller-supplied values merged over extracted ones.
    pub parameters: Map<String, Value>,
}

impl DispatchRequest {
    /// Request without caller-supplied parameters.
    #[must_use]
    pub fn new(process_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            text: text.into(),
            parameters: Map::new(),
        }
    }

    /// Attach caller-supplied parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Capability-aware dispatcher over a [`ProcessTransport`].
pub struct Dispatcher<T: ProcessTransport> {
    transport: Arc<T>,
    resolver: ManifestResolver<T>,
    matcher: HandlerMatcher,
    operation_timeout: Duration,
}

impl<T: ProcessTransport> Dispatcher<T> {
    /// Dispatcher with its own discovery cache.
    #[must_use]
    pub fn new(transport: Arc<T>, config: DispatcherConfig) -> Self {
        let cache = Arc::new(DiscoveryCache::new(config.discovery.cache_stats_log_interval()));
        Self::with_cache(transport, config, cache)
    }

    /// Dispatcher sharing an existing discovery cache.
    #[must_use]
    pub fn with_cache(transport: Arc<T>, config: DispatcherConfig, cache: Arc<DiscoveryCache>) -> Self {
        Self {
            resolver: ManifestResolver::with_cache(Arc::clone(&transport), config.discovery, cache),
            transport,
            matcher: HandlerMatcher::new(config.min_confidence),
            operation_timeout: config.operation_timeout(),
        }
    }

    /// Replace the matcher (custom strategies or floor).
    #[must_use]
    pub fn with_matcher(mut self, matcher: HandlerMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// The discovery cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        self.resolver.cache()
    }

    /// The matcher.
    #[must_use]
    pub fn matcher(&self) -> &HandlerMatcher {
        &self.matcher
    }

    /// Dispatch a free-text instruction to `process_id`.
    pub async fn execute(&self, process_id: &str, text: &str, identity: &T::Identity) -> DispatchResult {
        self.execute_with_parameters(process_id, text, identity, &Map::new())
            .await
    }

    /// Dispatch with caller-supplied parameters merged over extracted ones.
    pub async fn execute_with_parameters(
        &self,
        process_id: &str,
        text: &str,
        identity: &T::Identity,
        parameters: &Map<String, Value>,
    ) -> DispatchResult {
        match self.try_execute(process_id, text, identity, parameters).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(
                    event = "adp.dispatch.failed",
                    process_id,
                    kind = error.kind(),
                    error = %error,
                    "dispatch failed"
                );
                error.into()
            }
        }
    }

    /// Dry run against an already known manifest: no network calls.
    ///
    /// # Errors
    /// [`DispatchError::NoHandlerMatched`] or [`DispatchError::InvalidParameters`].
    pub fn plan(
        &self,
        manifest: &CapabilityManifest,
        text: &str,
        parameters: &Map<String, Value>,
    ) -> Result<DispatchPlan, DispatchError> {
        plan_dispatch(&self.matcher, manifest, text, parameters)
    }

    async fn try_execute(
        &self,
        process_id: &str,
        text: &str,
        identity: &T::Identity,
        parameters: &Map<String, Value>,
    ) -> Result<DispatchResult, DispatchError> {
        let manifest = match self.resolver.resolve(process_id).await {
            DiscoveryOutcome::Supported(manifest) => manifest,
            other => {
                return Err(DispatchError::Unsupported {
                    process_id: process_id.to_string(),
                    reason: other.reason(),
                });
            }
        };

        let plan = self.plan(&manifest, text, parameters)?;
        let response = self.invoke(process_id, identity, &plan).await?;
        tracing::info!(
            event = "adp.dispatch.completed",
            process_id,
            action = %plan.handler,
            operation = plan.operation.as_str(),
            confidence = plan.confidence,
            method = plan.method.as_str(),
            "dispatch completed"
        );
        Ok(DispatchResult::completed(plan, response))
    }

    async fn invoke(
        &self,
        process_id: &str,
        identity: &T::Identity,
        plan: &DispatchPlan,
    ) -> Result<Value, DispatchError> {
        let tags = &plan.message.tags;
        let call = async {
            match plan.operation {
                OperationKind::Read => self.transport.read(process_id, tags).await,
                OperationKind::Write => {
                    self.transport
                        .send(identity, process_id, tags, plan.message.body.as_deref())
                        .await
                }
            }
        };
        let selected = || SelectedHandler {
            action: plan.handler.clone(),
            confidence: plan.confidence,
            parameters: plan.parameters.clone(),
        };
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(DispatchError::OperationFailed {
                handler: selected(),
                operation: plan.operation,
                message: format!("{error:#}"),
            }),
            Err(_) => Err(DispatchError::OperationTimedOut {
                handler: selected(),
                operation: plan.operation,
                timeout_ms: u64::try_from(self.operation_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl<T: ProcessTransport> Dispatcher<T> {
    /// Run independent requests concurrently; results come back in request order.
    ///
    /// Requests for the same process share one discovery round trip.
    pub async fn execute_batch(
        self: &Arc<Self>,
        requests: Vec<DispatchRequest>,
        identity: Arc<T::Identity>,
    ) -> Vec<DispatchResult> {
        let total = requests.len();
        let mut tasks = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let dispatcher = Arc::clone(self);
            let identity = Arc::clone(&identity);
            tasks.spawn(async move {
                let result = dispatcher
                    .execute_with_parameters(
                        &request.process_id,
                        &request.text,
                        &identity,
                        &request.parameters,
                    )
                    .await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<DispatchResult>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        event = "adp.dispatch.batch.task_failed",
                        error = %error,
                        "batch dispatch task failed"
                    );
                }
            }
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    DispatchError::TaskFailed("task panicked or was cancelled".to_string()).into()
                })
            })
            .collect()
    }
}
