//! Direct-answer extraction from retrieved document content.
//!
//! Before the generative model is consulted, each retrieved document is
//! split into paragraphs and scored against the query. A paragraph that
//! clears the confidence threshold becomes the answer verbatim, with an
//! attribution header and a citation trailer, and the generative call is
//! skipped entirely. Table content never reaches this path; rows only feed
//! the generative fallback.

use crate::models::DocumentContext;

/// Paragraphs shorter than this (after trimming) carry too little context to
/// stand alone as an answer.
const MIN_PARAGRAPH_LEN: usize = 50;

/// Bonus when the paragraph contains the full query verbatim.
const FULL_QUERY_BONUS: f64 = 0.6;
/// Weight of the matched-keyword fraction.
const KEYWORD_FRACTION_WEIGHT: f64 = 0.3;
/// Bonus when a definitional pattern follows a keyword; awarded once.
const COPULA_BONUS: f64 = 0.2;

const COPULA_PATTERNS: &[&str] = &[" is", " are", " means", " refers to"];

/// A paragraph confident enough to answer the query directly.
#[derive(Debug, Clone)]
pub struct DirectAnswer {
    /// The synthesized answer text, attribution and citation included.
    pub text: String,
    /// Filename of the document the paragraph came from.
    pub filename: String,
    pub confidence: f64,
}

/// Scans the ranked documents for the single best-scoring paragraph and
/// synthesizes an answer from it when its confidence reaches `threshold`.
pub fn extract_direct_answer(
    documents: &[DocumentContext],
    query: &str,
    keywords: &[String],
    threshold: f64,
) -> Option<DirectAnswer> {
    let query_lower = query.to_lowercase();

    let mut best: Option<(&DocumentContext, &str, f64)> = None;
    for doc in documents {
        for paragraph in split_paragraphs(&doc.content) {
            if paragraph.chars().count() < MIN_PARAGRAPH_LEN {
                continue;
            }
            let confidence = score_paragraph(&paragraph.to_lowercase(), &query_lower, keywords);
            if best.map_or(true, |(_, _, top)| confidence > top) {
                best = Some((doc, paragraph, confidence));
            }
        }
    }

    match best {
        Some((doc, paragraph, confidence)) if confidence >= threshold => Some(DirectAnswer {
            text: synthesize(doc, paragraph),
            filename: doc.filename.clone(),
            confidence,
        }),
        _ => None,
    }
}

/// Splits text into blank-line-delimited paragraphs, trimmed, empties
/// dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            let paragraph = text[start..offset].trim();
            if !paragraph.is_empty() {
                paragraphs.push(paragraph);
            }
            start = offset + line.len();
        }
        offset += line.len();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        paragraphs.push(tail);
    }
    paragraphs
}

/// Confidence of a single paragraph: full-query containment, keyword
/// coverage, and a one-shot definitional-pattern bonus.
fn score_paragraph(paragraph_lower: &str, query_lower: &str, keywords: &[String]) -> f64 {
    let mut score = 0.0;

    if !query_lower.trim().is_empty() && paragraph_lower.contains(query_lower.trim()) {
        score += FULL_QUERY_BONUS;
    }

    if !keywords.is_empty() {
        let matched = keywords
            .iter()
            .filter(|k| paragraph_lower.contains(k.as_str()))
            .count();
        score += matched as f64 / keywords.len() as f64 * KEYWORD_FRACTION_WEIGHT;
    }

    'copula: for keyword in keywords {
        for pattern in COPULA_PATTERNS {
            if paragraph_lower.contains(&format!("{}{}", keyword, pattern)) {
                score += COPULA_BONUS;
                break 'copula;
            }
        }
    }

    score
}

/// Formats the winning paragraph with attribution and citation lines.
fn synthesize(doc: &DocumentContext, paragraph: &str) -> String {
    let mut answer = String::new();
    answer.push_str(&format!(
        "Based on the information from \"{}\":\n\n",
        doc.filename
    ));
    answer.push_str(paragraph);
    answer.push_str(&format!("\n\n(Source: {}", doc.filename));
    if let Some(pages) = doc.page_count {
        answer.push_str(&format!(", Page/Slide: {}", pages));
    }
    answer.push(')');
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::extract_keywords;
    use crate::models::DocType;
    use chrono::Utc;

    fn doc(filename: &str, content: &str, page_count: Option<usize>) -> DocumentContext {
        DocumentContext {
            filename: filename.to_string(),
            doc_type: DocType::Text,
            content: content.to_string(),
            page_count,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn split_paragraphs_on_blank_lines() {
        let text = "first paragraph\nstill first\n\nsecond paragraph\n\n  \nthird";
        let paragraphs = split_paragraphs(text);
        assert_eq!(
            paragraphs,
            vec!["first paragraph\nstill first", "second paragraph", "third"]
        );
    }

    #[test]
    fn split_paragraphs_handles_whitespace_only_separators() {
        let text = "alpha\n   \nbeta";
        assert_eq!(split_paragraphs(text), vec!["alpha", "beta"]);
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n\n").is_empty());
    }

    #[test]
    fn full_query_plus_keywords_clears_threshold() {
        let query = "What is a regression harness?";
        let keywords = extract_keywords(query);
        let content = "Unrelated intro paragraph that is long enough to be considered.\n\n\
                       A regression harness is a fixture that replays recorded traffic. \
                       What is a regression harness? It validates ranking changes before rollout.";
        let answer = extract_direct_answer(&[doc("qa.txt", content, None)], query, &keywords, 0.7)
            .expect("expected a direct answer");
        // 0.6 (full query) + 0.3 (all keywords) + 0.2 (\"harness is\") = 1.1
        assert!(answer.confidence >= 0.7);
        assert!(answer.text.contains("Based on the information from \"qa.txt\""));
        assert!(answer.text.contains("(Source: qa.txt)"));
    }

    #[test]
    fn paragraph_without_keywords_scores_zero() {
        let query = "What is a regression harness?";
        let keywords = extract_keywords(query);
        let content = "This paragraph talks about lunch menus and nothing else of note here.";
        assert!(
            extract_direct_answer(&[doc("menu.txt", content, None)], query, &keywords, 0.7)
                .is_none()
        );
    }

    #[test]
    fn short_paragraphs_are_skipped() {
        let query = "What is a regression harness?";
        let keywords = extract_keywords(query);
        // Contains everything needed but is under the minimum length.
        let content = "what is a regression harness? it is.";
        assert!(
            extract_direct_answer(&[doc("short.txt", content, None)], query, &keywords, 0.7)
                .is_none()
        );
    }

    #[test]
    fn best_paragraph_across_documents_wins() {
        let query = "how does the billing export work";
        let keywords = extract_keywords(query);
        let weak = doc(
            "a.txt",
            "The billing team maintains several dashboards for revenue reporting purposes.",
            None,
        );
        let strong = doc(
            "b.txt",
            "The export job explains how does the billing export work end to end: \
             billing rows stream to object storage nightly.",
            Some(3),
        );
        let answer =
            extract_direct_answer(&[weak, strong], query, &keywords, 0.7).expect("direct answer");
        assert_eq!(answer.filename, "b.txt");
        assert!(answer.text.contains("(Source: b.txt, Page/Slide: 3)"));
    }

    #[test]
    fn copula_bonus_awarded_once() {
        let query = "define the widget registry service";
        let keywords = extract_keywords(query);
        // Two copula patterns present; the bonus must not stack.
        let paragraph = "the widget is small and the registry is large, both living in one place"
            .to_lowercase();
        let score = score_paragraph(&paragraph, &query.to_lowercase(), &keywords);
        // keywords: define, widget, registry, service -> 2/4 matched = 0.15, plus one 0.2 bonus
        assert!((score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn empty_query_never_gets_full_query_bonus() {
        let keywords: Vec<String> = Vec::new();
        let content = "a paragraph that is certainly long enough to pass the length filter here";
        assert!(extract_direct_answer(&[doc("x.txt", content, None)], "", &keywords, 0.7).is_none());
    }
}
