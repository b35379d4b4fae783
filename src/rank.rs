//! Relevance scoring and ranking of candidate sources against a query.
//!
//! Documents and tables rank through the same scorer; callers supply the
//! source's display name (filename or table name) and its searchable content
//! (full text or serialized row data). Scores accumulate across independent
//! signals rather than averaging, so a source matching on several axes
//! outranks one matching strongly on a single axis.

use std::cmp::Ordering;

use crate::fuzzy::fuzzy_matches;

/// A source offered to the ranker.
#[derive(Debug, Clone)]
pub struct RankCandidate {
    /// Stable identifier returned in ranking results (filename or table name).
    pub id: String,
    /// Name checked for keyword containment.
    pub name: String,
    /// Searchable content.
    pub content: String,
}

/// A scored source, transient per query.
#[derive(Debug, Clone)]
pub struct RelevanceScore {
    pub source_id: String,
    pub score: f64,
    /// First phrase-level match found in the content, when any.
    pub matched_fragment: Option<String>,
}

/// Bonus when any query keyword appears in the source name.
const NAME_MATCH_BONUS: f64 = 0.3;
/// Per-keyword occurrence score: 0.05 per occurrence, capped.
const OCCURRENCE_WEIGHT: f64 = 0.05;
const OCCURRENCE_CAP: f64 = 0.2;
/// Per-keyword fuzzy-match score: 0.02 per distinct near-miss word, capped.
const FUZZY_WEIGHT: f64 = 0.02;
const FUZZY_CAP: f64 = 0.1;
/// Bonus when the full query appears verbatim in the content.
const EXACT_PHRASE_BONUS: f64 = 0.5;
/// Bonus per 3-word query window appearing verbatim in the content.
const FRAGMENT_BONUS: f64 = 0.3;
/// Sources scoring at or below this are discarded.
const MIN_SCORE: f64 = 0.1;

/// Number of words per sliding phrase-fragment window.
const FRAGMENT_WINDOW: usize = 3;

/// Scores every candidate against the query and returns the top `limit`
/// sources above the relevance floor, highest first. The sort is stable, so
/// ties keep input order.
pub fn rank_sources(
    candidates: &[RankCandidate],
    query: &str,
    keywords: &[String],
    limit: usize,
) -> Vec<RelevanceScore> {
    let query_lower = query.to_lowercase();

    let mut scored: Vec<RelevanceScore> = candidates
        .iter()
        .filter_map(|candidate| {
            let (score, matched_fragment) = score_candidate(candidate, &query_lower, keywords);
            if score > MIN_SCORE {
                Some(RelevanceScore {
                    source_id: candidate.id.clone(),
                    score,
                    matched_fragment,
                })
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored
}

fn score_candidate(
    candidate: &RankCandidate,
    query_lower: &str,
    keywords: &[String],
) -> (f64, Option<String>) {
    let name_lower = candidate.name.to_lowercase();
    let content_lower = candidate.content.to_lowercase();
    let mut score = 0.0;

    if keywords.iter().any(|k| name_lower.contains(k.as_str())) {
        score += NAME_MATCH_BONUS;
    }

    for keyword in keywords {
        let occurrences = count_occurrences(&content_lower, keyword);
        if occurrences > 0 {
            score += (OCCURRENCE_WEIGHT * occurrences as f64).min(OCCURRENCE_CAP);
        }

        let near_misses = fuzzy_matches(&content_lower, keyword);
        if !near_misses.is_empty() {
            score += (FUZZY_WEIGHT * near_misses.len() as f64).min(FUZZY_CAP);
        }
    }

    let mut matched_fragment = None;
    if !query_lower.trim().is_empty() && content_lower.contains(query_lower) {
        score += EXACT_PHRASE_BONUS;
        matched_fragment = Some(query_lower.trim().to_string());
    }

    let words: Vec<&str> = query_lower.split_whitespace().collect();
    if words.len() >= FRAGMENT_WINDOW {
        for window in words.windows(FRAGMENT_WINDOW) {
            let fragment = window.join(" ");
            if content_lower.contains(&fragment) {
                score += FRAGMENT_BONUS;
                if matched_fragment.is_none() {
                    matched_fragment = Some(fragment);
                }
            }
        }
    }

    (score, matched_fragment)
}

/// Counts non-overlapping occurrences of `pattern` in `text`.
fn count_occurrences(text: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut start = 0;
    while let Some(pos) = text[start..].find(pattern) {
        count += 1;
        start += pos + pattern.len();
    }
    count
}
