//! Handler matcher: ordered strategies plus one deterministic reducer.

mod strategies;
pub(crate) mod text;

use std::cmp::Ordering;

use adp_types::CapabilityManifest;

use crate::contracts::{MatchOutcome, MatchResult};
use crate::params::extract_parameters;

pub use strategies::{
    Candidate, DomainPatternStrategy, ExactActionStrategy, LexicalOverlapStrategy, MatchStrategy,
    Utterance, default_strategies,
};

/// Minimum confidence a candidate needs to be accepted.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

/// Selects the handler a free-text instruction refers to.
pub struct HandlerMatcher {
    strategies: Vec<Box<dyn MatchStrategy>>,
    min_confidence: f64,
}

impl Default for HandlerMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl std::fmt::Debug for HandlerMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<&str> = self
            .strategies
            .iter()
            .map(|strategy| strategy.method().as_str())
            .collect();
        f.debug_struct("HandlerMatcher")
            .field("strategies", &methods)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl HandlerMatcher {
    /// Built-in strategies with the given acceptance floor (clamped into `[0, 1]`).
    #[must_use]
    pub fn new(min_confidence: f64) -> Self {
        Self::with_strategies(default_strategies(), min_confidence)
    }

    /// Custom strategy list, evaluated in order.
    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn MatchStrategy>>, min_confidence: f64) -> Self {
        let min_confidence = if min_confidence.is_nan() {
            DEFAULT_MIN_CONFIDENCE
        } else {
            min_confidence.clamp(0.0, 1.0)
        };
        Self {
            strategies,
            min_confidence,
        }
    }

    /// Acceptance floor.
    #[must_use]
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Every candidate from every strategy, in evaluation order.
    #[must_use]
    pub fn candidates(&self, manifest: &CapabilityManifest, text: &str) -> Vec<Candidate> {
        let utterance = Utterance::new(text);
        self.strategies
            .iter()
            .flat_map(|strategy| strategy.candidates(manifest, &utterance))
            .filter(|candidate| candidate.handler_index < manifest.handlers.len())
            .map(|candidate| Candidate {
                confidence: candidate.confidence.clamp(0.0, 1.0),
                ..candidate
            })
            .collect()
    }

    /// Highest-confidence candidate clearing the floor; ties go to the handler
    /// declared first, then to the earlier strategy.
    #[must_use]
    pub fn best_candidate(&self, manifest: &CapabilityManifest, text: &str) -> Option<Candidate> {
        self.candidates(manifest, text)
            .into_iter()
            .filter(|candidate| candidate.confidence >= self.min_confidence)
            .min_by(compare_candidates)
    }

    /// Match `text` against `manifest`, extracting parameters for the winner.
    #[must_use]
    pub fn match_handler(&self, manifest: &CapabilityManifest, text: &str) -> MatchOutcome {
        let Some(best) = self.best_candidate(manifest, text) else {
            tracing::debug!(
                event = "adp.matcher.no_match",
                handlers = manifest.handlers.len(),
                min_confidence = self.min_confidence,
                "no handler cleared the acceptance floor"
            );
            return MatchOutcome::NoMatch {
                available_handlers: manifest.actions(),
            };
        };
        let handler = manifest.handlers[best.handler_index].clone();
        let extracted_parameters = extract_parameters(&handler, text);
        tracing::debug!(
            event = "adp.matcher.selected",
            action = %handler.action,
            confidence = best.confidence,
            method = best.method.as_str(),
            "handler selected"
        );
        MatchOutcome::Matched(MatchResult {
            handler,
            handler_index: best.handler_index,
            confidence: best.confidence,
            method: best.method,
            extracted_parameters,
        })
    }
}

/// Ordering where the preferred candidate is the minimum.
fn compare_candidates(left: &Candidate, right: &Candidate) -> Ordering {
    right
        .confidence
        .total_cmp(&left.confidence)
        .then_with(|| left.handler_index.cmp(&right.handler_index))
        .then_with(|| left.method.rank().cmp(&right.method.rank()))
}
