//! Near-miss keyword matching via bounded Levenshtein distance.
//!
//! Catches single-character typos and simple inflections ("deployment" vs
//! "deployments") that exact substring counting misses. Exact matches are
//! excluded here; they are scored separately by the ranker.

/// Keywords shorter than this produce too many false positives and are
/// skipped entirely.
const MIN_KEYWORD_LEN: usize = 4;

/// Maximum edit distance for a word to count as a fuzzy match.
const MAX_DISTANCE: usize = 1;

/// Finds distinct whitespace-separated words in `content` within edit
/// distance 1 of `keyword`. Both inputs are expected lowercase.
///
/// Words whose length differs from the keyword's by more than one character
/// cannot be within distance 1 and are skipped before the DP runs.
pub fn fuzzy_matches(content: &str, keyword: &str) -> Vec<String> {
    let keyword_len = keyword.chars().count();
    if keyword_len < MIN_KEYWORD_LEN {
        return Vec::new();
    }

    let mut matches: Vec<String> = Vec::new();
    for word in content.split_whitespace() {
        if word.chars().count().abs_diff(keyword_len) > 1 {
            continue;
        }
        if word == keyword {
            continue;
        }
        if matches.iter().any(|m| m == word) {
            continue;
        }
        if edit_distance(word, keyword) <= MAX_DISTANCE {
            matches.push(word.to_string());
        }
    }
    matches
}

/// Levenshtein edit distance with unit insert/delete/substitute costs,
/// computed over a single reusable row.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut costs: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        // `last` holds the previous row's value at the previous column.
        let mut last = i;
        costs[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let next = if ca == cb {
                last
            } else {
                last.min(costs[j]).min(costs[j + 1]) + 1
            };
            last = costs[j + 1];
            costs[j + 1] = next;
        }
    }
    costs[b.len()]
}
