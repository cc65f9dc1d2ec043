//! Independent match strategies. Each one scores handlers on its own; the
//! reducer in [`super::HandlerMatcher`] picks the winner.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use adp_types::{CapabilityManifest, HandlerDescriptor, ParameterType};

use super::text::{
    compile_regex, content_words, contains_run, identifier_words, is_stopword, words,
};
use crate::contracts::MatchMethod;

const EXACT_ACTION_CONFIDENCE: f64 = 0.95;
const DOMAIN_SHAPE_CONFIDENCE: f64 = 0.9;
const DOMAIN_NEUTRAL_CONFIDENCE: f64 = 0.85;
const LEXICAL_CEILING: f64 = 0.8;
const LEXICAL_FLOOR: f64 = 0.3;

static QUANTITY_RECIPIENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?i)(?:^|[\s$])-?\d[\d,]*(?:\.\d+)?\b.*?\b(?:to|for)\s+[A-Za-z0-9_\-.@]+")
});
static BINARY_OPERATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"(?i)(-?\d+(?:\.\d+)?)\s*(\+|-|\*|×|x|/|÷|plus|minus|times|multiplied\s+by|divided\s+by|over|and|with|by)\s*(-?\d+(?:\.\d+)?)",
    )
});

/// Instruction text, normalized once and shared by every strategy.
#[derive(Debug, Clone)]
pub struct Utterance {
    raw: String,
    words: Vec<String>,
    content: Vec<String>,
}

impl Utterance {
    /// Normalize free text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            raw: text.trim().to_string(),
            words: words(text),
            content: content_words(text),
        }
    }

    /// Trimmed original text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lowercase words in order.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Lowercase words without stopwords and numbers.
    #[must_use]
    pub fn content(&self) -> &[String] {
        &self.content
    }
}

/// One `(handler, confidence)` proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Declaration index in `manifest.handlers`.
    pub handler_index: usize,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Proposing strategy.
    pub method: MatchMethod,
}

/// A pluggable scoring strategy.
pub trait MatchStrategy: Send + Sync {
    /// Method label attached to this strategy's candidates.
    fn method(&self) -> MatchMethod;

    /// Zero or more candidates for `utterance` against `manifest`.
    fn candidates(&self, manifest: &CapabilityManifest, utterance: &Utterance) -> Vec<Candidate>;
}

/// Instruction names the handler action as a word (`balance`) or as its split
/// identifier phrase (`total supply` for `TotalSupply`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactActionStrategy;

impl MatchStrategy for ExactActionStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::ExactAction
    }

    fn candidates(&self, manifest: &CapabilityManifest, utterance: &Utterance) -> Vec<Candidate> {
        manifest
            .handlers
            .iter()
            .enumerate()
            .filter(|(_, handler)| names_action(utterance.words(), &handler.action))
            .map(|(handler_index, _)| Candidate {
                handler_index,
                confidence: EXACT_ACTION_CONFIDENCE,
                method: self.method(),
            })
            .collect()
    }
}

fn names_action(text_words: &[String], action: &str) -> bool {
    let action_lower = action.to_lowercase();
    if action_lower.is_empty() {
        return false;
    }
    let plural = format!("{action_lower}s");
    if text_words
        .iter()
        .any(|word| *word == action_lower || *word == plural)
    {
        return true;
    }
    let split = identifier_words(action);
    split.len() > 1 && contains_run(text_words, &split)
}

/// Structural shapes tied to a handler's declared parameter types.
///
/// - quantity followed by `to <recipient>` for handlers taking an address and a number
/// - two numeric operands joined by an operator or connective for handlers taking
///   two numbers; an operator family that contradicts the handler's own
///   arithmetic vocabulary rules the handler out
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainPatternStrategy;

impl MatchStrategy for DomainPatternStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::DomainPattern
    }

    fn candidates(&self, manifest: &CapabilityManifest, utterance: &Utterance) -> Vec<Candidate> {
        let text = utterance.raw();
        let transfer_shaped_text = QUANTITY_RECIPIENT_REGEX.is_match(text);
        let operator = BINARY_OPERATION_REGEX
            .captures(text)
            .and_then(|caps| caps.get(2))
            .map(|op| OperatorFamily::from_operator(op.as_str()));

        let mut out = Vec::new();
        for (handler_index, handler) in manifest.handlers.iter().enumerate() {
            let mut best: Option<f64> = None;
            if transfer_shaped_text && is_transfer_shaped(handler) {
                best = Some(DOMAIN_SHAPE_CONFIDENCE);
            }
            if let Some(operator) = operator
                && is_binary_numeric(handler)
                && let Some(confidence) = arithmetic_confidence(operator, handler)
            {
                best = Some(best.map_or(confidence, |current| current.max(confidence)));
            }
            if let Some(confidence) = best {
                out.push(Candidate {
                    handler_index,
                    confidence,
                    method: self.method(),
                });
            }
        }
        out
    }
}

fn is_transfer_shaped(handler: &HandlerDescriptor) -> bool {
    handler.parameters_of_type(ParameterType::Address).next().is_some()
        && handler.parameters_of_type(ParameterType::Number).next().is_some()
}

fn is_binary_numeric(handler: &HandlerDescriptor) -> bool {
    handler.parameters_of_type(ParameterType::Number).count() >= 2
}

/// Arithmetic family implied by an operator or by handler vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorFamily {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Connective (`and`, `with`, `by`) that implies no particular operation.
    Neutral,
}

impl OperatorFamily {
    fn from_operator(raw: &str) -> Self {
        let normalized = raw.to_lowercase();
        let normalized = normalized.split_whitespace().next().unwrap_or_default();
        match normalized {
            "+" | "plus" => Self::Add,
            "-" | "minus" => Self::Subtract,
            "*" | "×" | "x" | "times" | "multiplied" => Self::Multiply,
            "/" | "÷" | "over" | "divided" => Self::Divide,
            _ => Self::Neutral,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "add" | "addition" | "sum" | "plus" => Some(Self::Add),
            "subtract" | "subtraction" | "sub" | "minus" | "difference" => Some(Self::Subtract),
            "multiply" | "multiplication" | "mul" | "times" | "product" => Some(Self::Multiply),
            "divide" | "division" | "div" | "quotient" => Some(Self::Divide),
            _ => None,
        }
    }
}

fn handler_family(handler: &HandlerDescriptor) -> Option<OperatorFamily> {
    let action_words = identifier_words(&handler.action);
    let description_words = words(&handler.description);
    action_words
        .iter()
        .chain(description_words.iter())
        .find_map(|word| OperatorFamily::from_word(word))
}

fn arithmetic_confidence(operator: OperatorFamily, handler: &HandlerDescriptor) -> Option<f64> {
    match (operator, handler_family(handler)) {
        (OperatorFamily::Neutral, _) | (_, None) => Some(DOMAIN_NEUTRAL_CONFIDENCE),
        (operator, Some(family)) if operator == family => Some(DOMAIN_SHAPE_CONFIDENCE),
        _ => None,
    }
}

/// Share of the instruction's content words found in the handler's
/// description, examples, action and parameter names, scaled into
/// `[LEXICAL_FLOOR, LEXICAL_CEILING]`; weaker overlaps yield no candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOverlapStrategy;

impl MatchStrategy for LexicalOverlapStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::LexicalOverlap
    }

    fn candidates(&self, manifest: &CapabilityManifest, utterance: &Utterance) -> Vec<Candidate> {
        let query: Vec<String> = dedup(utterance.content().iter().map(|word| stem(word)));
        if query.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (handler_index, handler) in manifest.handlers.iter().enumerate() {
            let vocabulary = handler_vocabulary(handler);
            let overlap = query
                .iter()
                .filter(|word| vocabulary.contains(word.as_str()))
                .count();
            if overlap == 0 {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let ratio = overlap as f64 / query.len() as f64;
            let confidence = (LEXICAL_CEILING * ratio).min(LEXICAL_CEILING);
            if confidence < LEXICAL_FLOOR {
                continue;
            }
            out.push(Candidate {
                handler_index,
                confidence,
                method: self.method(),
            });
        }
        out
    }
}

fn handler_vocabulary(handler: &HandlerDescriptor) -> HashSet<String> {
    let mut vocabulary: HashSet<String> = HashSet::new();
    vocabulary.extend(
        identifier_words(&handler.action)
            .into_iter()
            .filter(|word| !is_stopword(word))
            .map(|word| stem(&word)),
    );
    vocabulary.extend(content_words(&handler.description).iter().map(|w| stem(w)));
    for example in &handler.examples {
        vocabulary.extend(content_words(example).iter().map(|w| stem(w)));
    }
    for param in &handler.parameters {
        vocabulary.extend(identifier_words(&param.name).iter().map(|w| stem(w)));
    }
    vocabulary
}

fn stem(word: &str) -> String {
    match word.strip_suffix('s') {
        Some(base) if base.len() > 2 && !base.ends_with('s') => base.to_string(),
        _ => word.to_string(),
    }
}

fn dedup(words: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    words.filter(|word| seen.insert(word.clone())).collect()
}

/// The three built-in strategies in evaluation order.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(ExactActionStrategy),
        Box::new(DomainPatternStrategy),
        Box::new(LexicalOverlapStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use adp_types::ParameterDescriptor;

    use super::*;

    fn manifest(handlers: Vec<HandlerDescriptor>) -> CapabilityManifest {
        CapabilityManifest {
            protocol_version: "1.0".to_string(),
            last_updated: String::new(),
            capabilities: Default::default(),
            handlers,
            name: None,
            ticker: None,
            description: None,
            owner: None,
            logo: None,
        }
    }

    fn calculator(action: &str, description: &str) -> HandlerDescriptor {
        let mut handler = HandlerDescriptor::new(action);
        handler.description = description.to_string();
        handler.parameters = vec![
            ParameterDescriptor::new("A", ParameterType::Number, true),
            ParameterDescriptor::new("B", ParameterType::Number, true),
        ];
        handler
    }

    #[test]
    fn exact_action_matches_word_plural_and_split_identifier() {
        let m = manifest(vec![
            HandlerDescriptor::new("Balance"),
            HandlerDescriptor::new("TotalSupply"),
        ]);
        let hits = ExactActionStrategy.candidates(&m, &Utterance::new("show BALANCES please"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].handler_index, 0);

        let hits = ExactActionStrategy.candidates(&m, &Utterance::new("what is the total supply?"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].handler_index, 1);
        assert!((hits[0].confidence - EXACT_ACTION_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_action_ignores_substrings() {
        let m = manifest(vec![HandlerDescriptor::new("Mint")]);
        assert!(
            ExactActionStrategy
                .candidates(&m, &Utterance::new("peppermint tea"))
                .is_empty()
        );
    }

    #[test]
    fn domain_pattern_scores_transfer_shape() {
        let mut transfer = HandlerDescriptor::new("Send");
        transfer.parameters = vec![
            ParameterDescriptor::new("Recipient", ParameterType::Address, true),
            ParameterDescriptor::new("Quantity", ParameterType::Number, true),
        ];
        let m = manifest(vec![HandlerDescriptor::new("Info"), transfer]);
        let hits = DomainPatternStrategy.candidates(&m, &Utterance::new("move 25 to bob"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].handler_index, 1);
        assert!((hits[0].confidence - DOMAIN_SHAPE_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn domain_pattern_respects_operator_family() {
        let m = manifest(vec![
            calculator("Add", "Add two numbers"),
            calculator("Subtract", "Subtract B from A"),
            calculator("Combine", "Combine two values"),
        ]);
        let hits = DomainPatternStrategy.candidates(&m, &Utterance::new("5 + 3"));
        let scored: Vec<(usize, f64)> = hits.iter().map(|c| (c.handler_index, c.confidence)).collect();
        assert_eq!(scored, vec![(0, 0.9), (2, 0.85)]);

        let hits = DomainPatternStrategy.candidates(&m, &Utterance::new("12 and 4"));
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|c| (c.confidence - 0.85).abs() < f64::EPSILON));
    }

    #[test]
    fn lexical_overlap_scales_with_ratio() {
        let mut balance = HandlerDescriptor::new("Balance");
        balance.description = "Get the token balance of an account".to_string();
        balance.examples = vec!["check balance for alice".to_string()];
        let m = manifest(vec![balance]);

        let full = LexicalOverlapStrategy.candidates(&m, &Utterance::new("check token balance"));
        assert_eq!(full.len(), 1);
        assert!((full[0].confidence - LEXICAL_CEILING).abs() < f64::EPSILON);

        let weak = LexicalOverlapStrategy.candidates(
            &m,
            &Utterance::new("token weather forecast tomorrow morning"),
        );
        assert!(weak.is_empty());
    }
}
