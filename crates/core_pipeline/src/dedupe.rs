//! Repeated-word removal
//!
//! Small vision models like to repeat themselves ("맛있어요 맛있어요").
//! Tokens are whitespace-delimited only, so a repeated phrase glued together
//! without spaces is left alone.

use std::collections::HashSet;

/// Keep the first occurrence of every whitespace-delimited token
pub fn dedupe(text: &str) -> String {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|token| seen.insert(*token))
        .collect::<Vec<_>>()
        .join(" ")
}
