//! Test-only scripted transport.
//!
//! Records every call and answers from a script so cache, discovery and
//! dispatcher tests run without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use adp_types::{ACTION_TAG, INFO_ACTION, Tag};

use crate::transport::ProcessTransport;

/// Scripted answer for one process.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Respond with this value.
    Value(Value),
    /// Fail with this message.
    Fail(String),
    /// Never respond.
    Hang,
}

/// Which primitive was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `read` primitive.
    Read,
    /// `send` primitive.
    Send,
    /// `recent_responses` primitive.
    Recent,
}

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    /// Primitive used.
    pub kind: CallKind,
    /// Target process.
    pub process_id: String,
    /// Tags as sent.
    pub tags: Vec<Tag>,
    /// Body for sends.
    pub body: Option<String>,
    /// Identity for sends.
    pub identity: Option<String>,
}

/// In-memory [`ProcessTransport`] driven by a script. Identity is a plain string.
#[derive(Debug)]
pub struct ScriptedTransport {
    info: HashMap<String, ScriptedReply>,
    recent: HashMap<String, Vec<Value>>,
    recent_hangs: bool,
    read_reply: ScriptedReply,
    send_reply: ScriptedReply,
    info_delay: Duration,
    calls: Mutex<Vec<TransportCall>>,
    info_reads: AtomicUsize,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Empty script: `Info` answers with no manifest, reads and sends succeed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: HashMap::new(),
            recent: HashMap::new(),
            recent_hangs: false,
            read_reply: ScriptedReply::Value(json!({"Messages": [{"Data": "ok"}]})),
            send_reply: ScriptedReply::Value(json!({"id": "message-1"})),
            info_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            info_reads: AtomicUsize::new(0),
        }
    }

    /// Answer `Info` for `process_id` with a dry-run envelope carrying `manifest`.
    #[must_use]
    pub fn with_manifest(mut self, process_id: &str, manifest: &Value) -> Self {
        self.info.insert(
            process_id.to_string(),
            ScriptedReply::Value(json!({"Messages": [{"Data": manifest.to_string()}]})),
        );
        self
    }

    /// Script the raw `Info` reply for `process_id`.
    #[must_use]
    pub fn with_info_reply(mut self, process_id: &str, reply: ScriptedReply) -> Self {
        self.info.insert(process_id.to_string(), reply);
        self
    }

    /// Recent responses returned by the out-of-band scan.
    #[must_use]
    pub fn with_recent(mut self, process_id: &str, responses: Vec<Value>) -> Self {
        self.recent.insert(process_id.to_string(), responses);
        self
    }

    /// Make the out-of-band scan never answer.
    #[must_use]
    pub const fn with_hanging_recent(mut self) -> Self {
        self.recent_hangs = true;
        self
    }

    /// Reply for non-`Info` reads.
    #[must_use]
    pub fn with_read_reply(mut self, reply: ScriptedReply) -> Self {
        self.read_reply = reply;
        self
    }

    /// Reply for sends.
    #[must_use]
    pub fn with_send_reply(mut self, reply: ScriptedReply) -> Self {
        self.send_reply = reply;
        self
    }

    /// Delay every `Info` answer (to widen concurrency windows).
    #[must_use]
    pub const fn with_info_delay(mut self, delay: Duration) -> Self {
        self.info_delay = delay;
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `Info` queries issued.
    pub fn info_reads(&self) -> usize {
        self.info_reads.load(Ordering::SeqCst)
    }

    fn record(&self, call: TransportCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

async fn answer(reply: &ScriptedReply) -> Result<Value> {
    match reply {
        ScriptedReply::Value(value) => Ok(value.clone()),
        ScriptedReply::Fail(message) => Err(anyhow!("{message}")),
        ScriptedReply::Hang => std::future::pending().await,
    }
}

fn is_info_query(tags: &[Tag]) -> bool {
    tags.iter()
        .any(|tag| tag.name == ACTION_TAG && tag.value == INFO_ACTION)
}

#[async_trait]
impl ProcessTransport for ScriptedTransport {
    type Identity = String;

    async fn read(&self, process_id: &str, tags: &[Tag]) -> Result<Value> {
        self.record(TransportCall {
            kind: CallKind::Read,
            process_id: process_id.to_string(),
            tags: tags.to_vec(),
            body: None,
            identity: None,
        });
        if is_info_query(tags) {
            self.info_reads.fetch_add(1, Ordering::SeqCst);
            if !self.info_delay.is_zero() {
                tokio::time::sleep(self.info_delay).await;
            }
            return match self.info.get(process_id) {
                Some(reply) => answer(reply).await,
                None => Ok(json!({"Messages": []})),
            };
        }
        answer(&self.read_reply).await
    }

    async fn send(
        &self,
        identity: &Self::Identity,
        process_id: &str,
        tags: &[Tag],
        body: Option<&str>,
    ) -> Result<Value> {
        self.record(TransportCall {
            kind: CallKind::Send,
            process_id: process_id.to_string(),
            tags: tags.to_vec(),
            body: body.map(str::to_string),
            identity: Some(identity.clone()),
        });
        answer(&self.send_reply).await
    }

    async fn recent_responses(&self, process_id: &str) -> Result<Vec<Value>> {
        self.record(TransportCall {
            kind: CallKind::Recent,
            process_id: process_id.to_string(),
            tags: Vec::new(),
            body: None,
            identity: None,
        });
        if self.recent_hangs {
            return std::future::pending().await;
        }
        Ok(self.recent.get(process_id).cloned().unwrap_or_default())
    }
}
