use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use adp_types::HandlerDescriptor;

/// Strategy that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Instruction names the handler action.
    ExactAction,
    /// Instruction has the structural shape of the handler's parameters.
    DomainPattern,
    /// Word overlap with description and examples.
    LexicalOverlap,
}

impl MatchMethod {
    /// Stable label used in logs and plans.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExactAction => "exact_action",
            Self::DomainPattern => "domain_pattern",
            Self::LexicalOverlap => "lexical_overlap",
        }
    }

    /// Evaluation rank; lower runs first and wins exact ties on one handler.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::ExactAction => 0,
            Self::DomainPattern => 1,
            Self::LexicalOverlap => 2,
        }
    }
}

/// Winning handler for one instruction. Ephemeral, produced per dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Selected handler.
    pub handler: HandlerDescriptor,
    /// Declaration index of the handler in the manifest.
    pub handler_index: usize,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Strategy that produced the winning candidate.
    pub method: MatchMethod,
    /// Parameters extracted from the instruction for this handler.
    pub extracted_parameters: Map<String, Value>,
}

/// Matcher verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A candidate cleared the acceptance floor.
    Matched(MatchResult),
    /// Nothing cleared the floor; every declared action is listed for diagnostics.
    NoMatch {
        /// `manifest.handlers[*].action` in declaration order.
        available_handlers: Vec<String>,
    },
}

impl MatchOutcome {
    /// The match, if any.
    #[must_use]
    pub fn matched(self) -> Option<MatchResult> {
        match self {
            Self::Matched(result) => Some(result),
            Self::NoMatch { .. } => None,
        }
    }
}
