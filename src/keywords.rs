//! Fuzzy keyword containment used by the `matches` predicate.
//!
//! A token is a maximal run of Unicode letters and digits, lowercased.
//! Everything else (whitespace, ASCII and Unicode punctuation, symbols)
//! separates tokens, so `"up?"` yields the single token `up` and
//! `"what's"` yields `what` and `s`.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::index::OtherHasher;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("token pattern is valid");
}

pub type Tokens = HashSet<String, OtherHasher>;

pub fn tokenize(text: &str) -> Tokens {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// True when every token of `query` occurs in `target`, either as a whole
/// token or inside one. An empty query matches anything.
pub fn matches(query: &str, target: &str) -> bool {
    let wanted = tokenize(query);
    if wanted.is_empty() {
        return true;
    }
    let available = tokenize(target);
    wanted.iter().all(|token| {
        available.contains(token) || available.iter().any(|t| t.contains(token.as_str()))
    })
}
