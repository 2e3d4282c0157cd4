//! Disclosure guardrail.
//!
//! Phrasings must never reveal internal pricing limits. The same closed term
//! list is checked against catalog templates at load time and against LLM
//! output before it is returned to the caller.

use std::sync::LazyLock;

use regex::Regex;

/// Terms that disclose internal pricing limits.
///
/// Matched case-insensitively as whole words, plural included, so "my costs"
/// is a hit while "your costs" and "economy cost" are not.
pub const DISCLOSURE_TERMS: &[&str] = &[
    "floor price",
    "minimum price",
    "my cost",
    "my margin",
    "our cost",
    "our margin",
];

/// A disclosure term found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureHit {
    /// The matched term, as listed in [`DISCLOSURE_TERMS`].
    pub term: &'static str,
}

struct TermMatcher {
    term: &'static str,
    // None only if the pattern failed to compile; matching then falls back
    // to a plain substring check.
    regex: Option<Regex>,
}

impl TermMatcher {
    fn is_match(&self, text: &str, lower: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => lower.contains(self.term),
        }
    }
}

static MATCHERS: LazyLock<Vec<TermMatcher>> = LazyLock::new(|| {
    DISCLOSURE_TERMS
        .iter()
        .map(|&term| TermMatcher {
            term,
            regex: Regex::new(&term_pattern(term)).ok(),
        })
        .collect()
});

fn term_pattern(term: &str) -> String {
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    format!(r"(?i)\b{}s?\b", words.join(r"\s+"))
}

/// Scan text for disclosure terms.
///
/// Returns one hit per distinct term present; empty when the text is clean.
pub fn scan(text: &str) -> Vec<DisclosureHit> {
    let lower = text.to_lowercase();
    MATCHERS
        .iter()
        .filter(|matcher| matcher.is_match(text, &lower))
        .map(|matcher| DisclosureHit { term: matcher.term })
        .collect()
}

/// Returns true when the text contains no disclosure term.
pub fn is_clean(text: &str) -> bool {
    scan(text).is_empty()
}
