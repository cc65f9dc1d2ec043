//! Collaborator boundary: the two message primitives the engine is allowed to use.
//!
//! Wallets, signing and the network transport live behind this trait. The engine
//! never talks to a transport directly.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use adp_types::Tag;

/// Read/send primitives for addressing actor processes.
#[async_trait]
pub trait ProcessTransport: Send + Sync + 'static {
    /// Opaque signer handle used for write operations.
    type Identity: Send + Sync + 'static;

    /// Read-only query (dry run). Used for the self-description query and read operations.
    async fn read(&self, process_id: &str, tags: &[Tag]) -> Result<Value>;

    /// State-mutating message signed by `identity`.
    async fn send(
        &self,
        identity: &Self::Identity,
        process_id: &str,
        tags: &[Tag],
        body: Option<&str>,
    ) -> Result<Value>;

    /// Recently published responses of a process, newest first.
    ///
    /// Best-effort out-of-band source used when the `Info` query yields no
    /// manifest. Transports without such an index keep the default.
    async fn recent_responses(&self, process_id: &str) -> Result<Vec<Value>> {
        let _ = process_id;
        Ok(Vec::new())
    }
}
