//! Read/write classification: explicit handler declaration first, verb heuristic second.

use adp_types::{HandlerDescriptor, OperationKind};

use crate::matcher::text::{identifier_words, words};

const READ_VERBS: &[&str] = &[
    "get", "check", "balance", "balances", "info", "read", "query", "view", "list", "fetch",
    "show", "total", "supply", "lookup", "status", "stats", "search", "find", "count",
    "allowance", "metadata", "describe",
];
const WRITE_VERBS: &[&str] = &[
    "transfer", "mint", "set", "burn", "send", "update", "create", "delete", "remove",
    "register", "stake", "unstake", "withdraw", "deposit", "approve", "vote", "claim", "cancel",
    "post", "write", "put", "swap", "execute",
];

/// The handler's own `operation` declaration, if any.
#[must_use]
pub fn declared_operation(handler: &HandlerDescriptor) -> Option<OperationKind> {
    handler.operation
}

/// Verb heuristic over the action identifier, then the description.
/// Handlers with no recognised verb are writes.
#[must_use]
pub fn infer_operation(handler: &HandlerDescriptor) -> OperationKind {
    verb_kind(&identifier_words(&handler.action))
        .or_else(|| verb_kind(&words(&handler.description)))
        .unwrap_or(OperationKind::Write)
}

/// Two-stage decision: [`declared_operation`], else [`infer_operation`].
#[must_use]
pub fn classify_operation(handler: &HandlerDescriptor) -> OperationKind {
    declared_operation(handler).unwrap_or_else(|| infer_operation(handler))
}

fn verb_kind(words: &[String]) -> Option<OperationKind> {
    words.iter().find_map(|word| {
        if READ_VERBS.contains(&word.as_str()) {
            Some(OperationKind::Read)
        } else if WRITE_VERBS.contains(&word.as_str()) {
            Some(OperationKind::Write)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(action: &str, description: &str) -> HandlerDescriptor {
        let mut handler = HandlerDescriptor::new(action);
        handler.description = description.to_string();
        handler
    }

    #[test]
    fn action_verbs_decide_first() {
        assert_eq!(infer_operation(&handler("Balance", "")), OperationKind::Read);
        assert_eq!(infer_operation(&handler("TotalSupply", "")), OperationKind::Read);
        assert_eq!(infer_operation(&handler("Transfer", "")), OperationKind::Write);
        assert_eq!(
            infer_operation(&handler("SetName", "Get a new name")),
            OperationKind::Write
        );
    }

    #[test]
    fn description_is_the_fallback_and_write_the_default() {
        assert_eq!(
            infer_operation(&handler("Holders", "List all token holders")),
            OperationKind::Read
        );
        assert_eq!(infer_operation(&handler("Ping", "")), OperationKind::Write);
    }

    #[test]
    fn declaration_overrides_heuristic() {
        let mut h = handler("Transfer", "");
        h.operation = Some(OperationKind::Read);
        assert_eq!(classify_operation(&h), OperationKind::Read);
        assert_eq!(classify_operation(&handler("Info", "")), OperationKind::Read);
    }
}
