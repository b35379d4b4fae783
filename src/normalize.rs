//! Query normalization for cache-key derivation.
//!
//! Two prompts that differ only in word order, letter case, punctuation, or
//! stop-words normalize to the same key, so paraphrased repeats of a question
//! hit the response cache. The tradeoff is deliberate: two genuinely
//! different questions sharing the same content words collide, which is
//! accepted in exchange for a higher hit rate.

use crate::keywords::{contains_hangul, tokenize, STOP_WORDS};

/// Canonicalizes a prompt into a cache key.
///
/// Tokens are kept when they contain Hangul or are longer than two
/// characters; stop-words are then removed from the non-Hangul tokens. The
/// survivors are sorted lexicographically and joined with single spaces.
/// Empty, blank, and fully-filtered input all normalize to the empty string.
/// The function is idempotent.
pub fn normalize_prompt(prompt: &str) -> String {
    let mut tokens: Vec<String> = tokenize(prompt)
        .into_iter()
        .filter(|t| contains_hangul(t) || t.chars().count() > 2)
        .filter(|t| contains_hangul(t) || !STOP_WORDS.contains(&t.as_str()))
        .collect();
    tokens.sort();
    tokens.join(" ")
}
