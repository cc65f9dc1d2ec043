//! Word-level helpers shared by the match strategies and the parameter extractor.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Function words ignored by lexical overlap and address anchoring.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "to", "for", "from", "of", "at", "in", "on", "by", "with", "and", "or",
        "is", "are", "be", "as", "it", "its", "this", "that", "these", "those", "my", "me", "i",
        "you", "your", "our", "we", "us", "please", "can", "could", "would", "should", "do",
        "does", "did", "some", "any", "what", "how", "much", "many", "into", "onto", "via",
        "using", "then", "now", "just",
    ]
    .into_iter()
    .collect()
});

/// Compile a hardcoded pattern; an invalid one degrades to a never-matching regex.
pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

/// Whether `word` (lowercase) is a stopword.
pub(crate) fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Lowercase alphanumeric words of `text`, in order.
///
/// Decimal numbers (`1.5`) and digit groups (`1,000`) stay one word.
pub(crate) fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    for (idx, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
            continue;
        }
        let joins_digits = matches!(c, '.' | ',')
            && current.chars().next_back().is_some_and(|prev| prev.is_ascii_digit())
            && chars.get(idx + 1).is_some_and(char::is_ascii_digit);
        if joins_digits {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Content words: [`words`] without stopwords and bare numbers.
pub(crate) fn content_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|word| !is_stopword(word) && !is_numeric_word(word))
        .collect()
}

/// Split an identifier (`TotalSupply`, `get_info`, `Token.Mint`) into lowercase words.
pub(crate) fn identifier_words(identifier: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in identifier.split(|c: char| !c.is_alphanumeric()) {
        let mut current = String::new();
        let mut prev_was_lower = false;
        for c in part.chars() {
            if c.is_uppercase() && prev_was_lower && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            current.extend(c.to_lowercase());
            prev_was_lower = c.is_lowercase() || c.is_ascii_digit();
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

/// Digits with optional sign, decimal part and `,` digit grouping.
pub(crate) fn is_numeric_word(word: &str) -> bool {
    parse_number(word).is_some()
}

/// Parse a numeric literal, tolerating `,` grouping and a leading currency sign.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_start_matches(['$', '€', '£']);
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    let digits = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    if digits.is_empty()
        || digits.starts_with('.')
        || digits.ends_with('.')
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        || digits.matches('.').count() > 1
    {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Whether `needle` occurs as a contiguous run inside `haystack`.
pub(crate) fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|window| window == needle)
}
