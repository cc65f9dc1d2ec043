//! Wire tags and operation kinds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tag name that carries the handler action on every message.
pub const ACTION_TAG: &str = "Action";

/// Reserved action of the read-only self-description query.
pub const INFO_ACTION: &str = "Info";

/// One `name = value` tag on a process message. Order on the wire is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tag {
    /// Tag name (e.g. `Action`, `Recipient`).
    pub name: String,
    /// Tag value, always transmitted as a string.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Tags of the reserved self-description query.
#[must_use]
pub fn info_query_tags() -> Vec<Tag> {
    vec![Tag::new(ACTION_TAG, INFO_ACTION)]
}

/// Whether a dispatched message is a read query or a state-mutating write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Query with no intended state mutation.
    Read,
    /// Message intended to mutate process state.
    Write,
}

impl OperationKind {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
