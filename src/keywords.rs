//! Keyword extraction from free-text queries.
//!
//! Tokenization is shared with the prompt normalizer ([`crate::normalize`]):
//! text splits on any character that is not ASCII alphanumeric and not a
//! Hangul syllable. Hangul tokens bypass the length and stop-word filters:
//! Korean nouns are commonly one or two syllables and the stop-word list is
//! English-only.

/// Common English function words filtered out of keyword sets and cache keys.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "in", "on", "at", "to",
    "for", "with", "by", "about", "like", "through", "over", "before", "after", "between",
    "under", "during", "of", "from", "up", "down", "into", "out", "as", "if", "when", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
    "should", "now",
];

/// Returns true for characters in the Hangul syllables block (U+AC00–U+D7A3).
pub fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Returns true if the string contains at least one Hangul syllable.
pub fn contains_hangul(s: &str) -> bool {
    s.chars().any(is_hangul)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_hangul(c)
}

/// Splits text into lowercase tokens on non-token boundaries.
///
/// No filtering is applied here; this is the shared tokenizer used by both
/// [`extract_keywords`] and the prompt normalizer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_token_char(c))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Extracts the significant terms of a query.
///
/// Tokens containing Hangul are kept unconditionally. Other tokens are
/// dropped when they are at most two characters long or appear in
/// [`STOP_WORDS`]. The result is duplicate-free in first-occurrence order;
/// iteration order carries no meaning.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if !contains_hangul(&token)
            && (token.chars().count() <= 2 || STOP_WORDS.contains(&token.as_str()))
        {
            continue;
        }
        if !keywords.contains(&token) {
            keywords.push(token);
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_stop_words_and_short_tokens() {
        let keywords = extract_keywords("What is the deployment pipeline for the API?");
        assert_eq!(keywords, vec!["what", "deployment", "pipeline"]);
    }

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let keywords = extract_keywords("Kubernetes,Docker;and-Terraform!");
        assert_eq!(keywords, vec!["kubernetes", "docker", "terraform"]);
    }

    #[test]
    fn hangul_tokens_bypass_filters() {
        // Two-syllable Korean words survive even though their length is <= 2.
        let keywords = extract_keywords("배포 절차 is the same");
        assert_eq!(keywords, vec!["배포", "절차", "same"]);
    }

    #[test]
    fn deduplicates_preserving_first_occurrence() {
        let keywords = extract_keywords("widget report widget REPORT widget");
        assert_eq!(keywords, vec!["widget", "report"]);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("   \t\n").is_empty());
        assert!(extract_keywords("The a to in").is_empty());
    }

    #[test]
    fn digits_count_as_token_characters() {
        let keywords = extract_keywords("error 502 in zone us-east-1");
        assert_eq!(keywords, vec!["error", "502", "zone", "east"]);
    }
}
