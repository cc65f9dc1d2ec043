//! Free-text parameter extraction.
//!
//! Binding order, each token consumed at most once:
//! 1. JSON substrings, for `json` parameters in declared order
//! 2. explicit `Name=value` / `Name: value` assignments
//! 3. name anchors (`quantity 100`, `memo is "hi"`)
//! 4. addresses: opaque 43-character ids first, then `to|for|from|of|at <token>`
//! 5. remaining numeric literals, in declared order
//! 6. boolean keywords
//! 7. strings: quoted text, else (required only) the remaining literal span
//!
//! Extraction never fails. Values that do not fit their declared type are kept
//! as text so validation can report them.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use adp_types::{HandlerDescriptor, ParameterDescriptor, ParameterType};

use super::coerce::{coerce, is_address_like, is_opaque_id, number_value};
use crate::matcher::text::{compile_regex, identifier_words, is_stopword, parse_number};

static INFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^(-?\d+(?:\.\d+)?)([+*/×÷x-])(\d+(?:\.\d+)?)$"));

const ANCHOR_FILLERS: &[&str] = &["=", ":", "is", "as", "of", "to", "be", "equals", "equal"];
/// Address anchors in rank order: explicit role nouns, then `to`, then the rest.
const EXPLICIT_ADDRESS_ANCHORS: &[&str] = &["recipient", "target"];
const RECIPIENT_ANCHOR: &str = "to";
const WEAK_ADDRESS_ANCHORS: &[&str] = &[
    "for", "from", "of", "at", "account", "wallet", "address", "owner",
];
const ADDRESS_FILLERS: &[&str] = &["account", "wallet", "address", "user", "process", "recipient"];
const BOOLEAN_WORDS: &[&str] = &[
    "true", "false", "yes", "no", "on", "off", "enable", "enabled", "disable", "disabled",
];

#[derive(Debug, Clone)]
struct Token {
    text: String,
    lower: String,
    quoted: bool,
    used: bool,
}

impl Token {
    fn new(text: &str, quoted: bool) -> Self {
        Self {
            text: text.to_string(),
            lower: text.to_lowercase(),
            quoted,
            used: false,
        }
    }

    fn free(&self) -> bool {
        !self.used && !self.quoted
    }
}

/// Bind values from `text` to the declared parameters of `handler`.
#[must_use]
pub fn extract_parameters(handler: &HandlerDescriptor, text: &str) -> Map<String, Value> {
    let mut bound = Map::new();
    let mut remaining = text.to_string();

    let json_params: Vec<&ParameterDescriptor> =
        handler.parameters_of_type(ParameterType::Json).collect();
    for param in json_params {
        let Some((span, value)) = find_json_span(&remaining) else {
            break;
        };
        remaining.replace_range(span, " ");
        bound.insert(param.name.clone(), value);
    }

    let mut tokens = tokenize(&remaining);
    bind_explicit(handler, &mut tokens, &mut bound);
    bind_name_anchors(handler, &mut tokens, &mut bound);
    bind_addresses(handler, &mut tokens, &mut bound);
    bind_numbers(handler, &mut tokens, &mut bound);
    bind_booleans(handler, &mut tokens, &mut bound);
    bind_strings(handler, &mut tokens, &mut bound);
    bound
}

fn find_json_span(text: &str) -> Option<(Range<usize>, Value)> {
    for (start, c) in text.char_indices() {
        if c != '{' && c != '[' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            return Some((start..start + stream.byte_offset(), value));
        }
    }
    None
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if let Some(close) = closing_quote(c) {
            flush(&mut current, &mut tokens);
            let quoted: String = chars.by_ref().take_while(|q| *q != close).collect();
            tokens.push(Token::new(&quoted, true));
        } else if c.is_whitespace() {
            flush(&mut current, &mut tokens);
        } else {
            current.push(c);
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn closing_quote(c: char) -> Option<char> {
    match c {
        '"' => Some('"'),
        '“' => Some('”'),
        _ => None,
    }
}

fn flush(current: &mut String, tokens: &mut Vec<Token>) {
    let raw = std::mem::take(current);
    let trimmed = raw
        .trim_matches(|c: char| matches!(c, ',' | ';' | '!' | '?' | '(' | ')' | '[' | ']' | '\''))
        .trim_end_matches('.');
    if trimmed.is_empty() {
        return;
    }
    if let Some(caps) = INFIX_REGEX.captures(trimmed) {
        for group in 1..=3 {
            if let Some(part) = caps.get(group) {
                tokens.push(Token::new(part.as_str(), false));
            }
        }
        return;
    }
    tokens.push(Token::new(trimmed, false));
}

/// Extracted text for `param`: the coerced value when it fits, else the raw text.
fn typed_value(param: &ParameterDescriptor, raw: &str) -> Value {
    let text = Value::String(raw.to_string());
    coerce(param, &text).unwrap_or(text)
}

fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let pos = text.find(['=', ':'])?;
    if pos == 0 {
        return None;
    }
    Some((&text[..pos], &text[pos + 1..]))
}

fn bind_explicit(handler: &HandlerDescriptor, tokens: &mut [Token], bound: &mut Map<String, Value>) {
    let mut idx = 0;
    while idx < tokens.len() {
        if !tokens[idx].free() {
            idx += 1;
            continue;
        }
        let text = tokens[idx].text.clone();
        if let Some((lhs, rhs)) = split_assignment(&text)
            && let Some(param) = handler.parameter_ignore_case(lhs)
            && !bound.contains_key(&param.name)
        {
            if !rhs.is_empty() {
                bound.insert(param.name.clone(), typed_value(param, rhs));
                tokens[idx].used = true;
            } else if let Some(next) = tokens.get(idx + 1)
                && !next.used
            {
                bound.insert(param.name.clone(), typed_value(param, &next.text));
                tokens[idx].used = true;
                tokens[idx + 1].used = true;
                idx += 1;
            }
        } else if let Some(param) = handler.parameter_ignore_case(&text)
            && !bound.contains_key(&param.name)
            && tokens
                .get(idx + 1)
                .is_some_and(|sep| sep.free() && matches!(sep.text.as_str(), "=" | ":"))
            && let Some(value) = tokens.get(idx + 2)
            && !value.used
        {
            bound.insert(param.name.clone(), typed_value(param, &value.text));
            for token in &mut tokens[idx..=idx + 2] {
                token.used = true;
            }
            idx += 2;
        }
        idx += 1;
    }
}

fn bind_name_anchors(
    handler: &HandlerDescriptor,
    tokens: &mut [Token],
    bound: &mut Map<String, Value>,
) {
    let param_names: Vec<String> = handler
        .parameters
        .iter()
        .map(|param| param.name.to_lowercase())
        .collect();
    for param in &handler.parameters {
        if bound.contains_key(&param.name) || param.kind == ParameterType::Json {
            continue;
        }
        let name = param.name.to_lowercase();
        let Some(anchor) = tokens
            .iter()
            .position(|token| token.free() && token.lower.trim_end_matches([':', '=']) == name)
        else {
            continue;
        };
        let mut cursor = anchor + 1;
        while tokens
            .get(cursor)
            .is_some_and(|token| token.free() && ANCHOR_FILLERS.contains(&token.lower.as_str()))
        {
            cursor += 1;
        }
        let Some((value, end)) = value_at(param, tokens, cursor, &param_names) else {
            continue;
        };
        for token in &mut tokens[anchor..end] {
            token.used = true;
        }
        bound.insert(param.name.clone(), value);
    }
}

/// Value for `param` starting at `cursor`, with the exclusive end of the consumed run.
fn value_at(
    param: &ParameterDescriptor,
    tokens: &[Token],
    cursor: usize,
    param_names: &[String],
) -> Option<(Value, usize)> {
    let token = tokens.get(cursor).filter(|token| !token.used)?;
    match param.kind {
        ParameterType::Number if !token.quoted => {
            parse_number(&token.text).map(|n| (number_value(n), cursor + 1))
        }
        ParameterType::Boolean if !token.quoted && BOOLEAN_WORDS.contains(&token.lower.as_str()) => {
            Some((typed_value(param, &token.text), cursor + 1))
        }
        ParameterType::Address if plausible_address(token) => {
            Some((Value::String(token.text.clone()), cursor + 1))
        }
        ParameterType::String if token.quoted => {
            Some((Value::String(token.text.clone()), cursor + 1))
        }
        ParameterType::String => {
            let end = tokens[cursor..]
                .iter()
                .position(|t| !t.free() || param_names.contains(&t.lower))
                .map_or(tokens.len(), |offset| cursor + offset);
            let span = join_span(&tokens[cursor..end]);
            if span.is_empty() {
                None
            } else {
                Some((Value::String(span), end))
            }
        }
        _ => None,
    }
}

fn plausible_address(token: &Token) -> bool {
    token.free()
        && !is_stopword(&token.lower)
        && parse_number(&token.text).is_none()
        && is_address_like(&token.text)
}

fn bind_addresses(handler: &HandlerDescriptor, tokens: &mut [Token], bound: &mut Map<String, Value>) {
    let action_words = action_words(handler);
    for param in handler.parameters_of_type(ParameterType::Address) {
        if bound.contains_key(&param.name) {
            continue;
        }
        if let Some(idx) = tokens
            .iter()
            .position(|token| token.free() && is_opaque_id(&token.text))
        {
            tokens[idx].used = true;
            bound.insert(param.name.clone(), Value::String(tokens[idx].text.clone()));
            continue;
        }
        if let Some((anchor, idx)) = anchored_address(tokens, &action_words) {
            tokens[anchor].used = true;
            tokens[idx].used = true;
            bound.insert(param.name.clone(), Value::String(tokens[idx].text.clone()));
        }
    }
}

/// `(anchor, address)` token indices. Explicit role nouns win, then the last
/// `to` in the sentence, then weaker prepositions left to right.
fn anchored_address(tokens: &[Token], action_words: &[String]) -> Option<(usize, usize)> {
    let anchors_of = |words: &[&str]| -> Vec<usize> {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.free() && words.contains(&token.lower.as_str()))
            .map(|(idx, _)| idx)
            .collect()
    };
    let mut ranked = anchors_of(EXPLICIT_ADDRESS_ANCHORS);
    ranked.extend(anchors_of(&[RECIPIENT_ANCHOR]).into_iter().rev());
    ranked.extend(anchors_of(WEAK_ADDRESS_ANCHORS));
    ranked
        .into_iter()
        .find_map(|anchor| address_after(tokens, anchor, action_words).map(|idx| (anchor, idx)))
}

fn address_after(tokens: &[Token], anchor: usize, action_words: &[String]) -> Option<usize> {
    let mut cursor = anchor + 1;
    while tokens.get(cursor).is_some_and(|t| {
        t.free() && (is_stopword(&t.lower) || ADDRESS_FILLERS.contains(&t.lower.as_str()))
    }) {
        cursor += 1;
    }
    tokens
        .get(cursor)
        .filter(|candidate| plausible_address(candidate) && !action_words.contains(&candidate.lower))
        .map(|_| cursor)
}

fn bind_numbers(handler: &HandlerDescriptor, tokens: &mut [Token], bound: &mut Map<String, Value>) {
    for param in handler.parameters_of_type(ParameterType::Number) {
        if bound.contains_key(&param.name) {
            continue;
        }
        let Some((idx, value)) = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.free())
            .find_map(|(idx, token)| parse_number(&token.text).map(|n| (idx, n)))
        else {
            break;
        };
        tokens[idx].used = true;
        bound.insert(param.name.clone(), number_value(value));
    }
}

fn bind_booleans(handler: &HandlerDescriptor, tokens: &mut [Token], bound: &mut Map<String, Value>) {
    for param in handler.parameters_of_type(ParameterType::Boolean) {
        if bound.contains_key(&param.name) {
            continue;
        }
        let Some(idx) = tokens
            .iter()
            .position(|token| token.free() && BOOLEAN_WORDS.contains(&token.lower.as_str()))
        else {
            break;
        };
        tokens[idx].used = true;
        bound.insert(param.name.clone(), typed_value(param, &tokens[idx].text));
    }
}

fn bind_strings(handler: &HandlerDescriptor, tokens: &mut [Token], bound: &mut Map<String, Value>) {
    let action_words = action_words(handler);
    for param in handler.parameters_of_type(ParameterType::String) {
        if bound.contains_key(&param.name) {
            continue;
        }
        if let Some(idx) = tokens
            .iter()
            .position(|token| token.quoted && !token.used)
        {
            tokens[idx].used = true;
            bound.insert(param.name.clone(), Value::String(tokens[idx].text.clone()));
            continue;
        }
        if !param.required {
            continue;
        }
        let span_indices: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.free() && !action_words.contains(&token.lower))
            .map(|(idx, _)| idx)
            .collect();
        let span_tokens: Vec<Token> = span_indices.iter().map(|idx| tokens[*idx].clone()).collect();
        let span = join_span(&span_tokens);
        if span.is_empty() {
            continue;
        }
        for idx in span_indices {
            tokens[idx].used = true;
        }
        bound.insert(param.name.clone(), Value::String(span));
    }
}

/// Words of the action identifier (and its plural), which never become values.
fn action_words(handler: &HandlerDescriptor) -> Vec<String> {
    let mut words = identifier_words(&handler.action);
    let whole = handler.action.to_lowercase();
    words.push(format!("{whole}s"));
    words.push(whole);
    words
}

/// Join tokens with spaces, trimming stopwords at both ends.
fn join_span(tokens: &[Token]) -> String {
    let start = tokens
        .iter()
        .position(|token| !is_stopword(&token.lower))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|token| !is_stopword(&token.lower))
        .map_or(start, |idx| idx + 1);
    tokens[start..end.max(start)]
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
