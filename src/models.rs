//! Core data types for the prompting pipeline.
//!
//! Requests and responses cross the HTTP boundary and derive serde; the
//! context types are internal to the retrieval pipeline and live in the
//! content caches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming query with optional explicit source references and sampling
/// parameters. Empty reference lists mean "discover relevant sources".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    /// Document filenames to use verbatim, bypassing relevance ranking.
    #[serde(default)]
    pub document_refs: Vec<String>,
    /// Table names to use verbatim, bypassing relevance ranking.
    #[serde(default)]
    pub table_refs: Vec<String>,
    /// Sampling temperature override for the generative model.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Overall latency budget in milliseconds; past it the request is
    /// abandoned with a degraded answer.
    #[serde(default)]
    pub budget_ms: Option<u64>,
}

/// The answered query: final text plus the sources that supplied context.
#[derive(Debug, Clone, Serialize)]
pub struct PromptResponse {
    pub prompt: String,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
    pub document_sources: Vec<DocumentSource>,
    pub table_sources: Vec<TableSource>,
}

/// A document that contributed context to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSource {
    pub filename: String,
    pub doc_type: DocType,
    pub page_count: Option<usize>,
}

/// A table that contributed context to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct TableSource {
    pub table_name: String,
    pub query: String,
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Pdf,
    Slides,
    Word,
    Text,
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocType::Pdf => "PDF",
            DocType::Slides => "SLIDES",
            DocType::Word => "WORD",
            DocType::Text => "TEXT",
        };
        write!(f, "{}", name)
    }
}

/// Extracted document content. Identity is the filename; the value is
/// immutable once created and only ever replaced wholesale on re-extraction.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub filename: String,
    pub doc_type: DocType,
    pub content: String,
    /// Page or slide count, when the format exposes one.
    pub page_count: Option<usize>,
    pub extracted_at: DateTime<Utc>,
}

impl DocumentContext {
    /// Summary entry for the response's source list.
    pub fn as_source(&self) -> DocumentSource {
        DocumentSource {
            filename: self.filename.clone(),
            doc_type: self.doc_type,
            page_count: self.page_count,
        }
    }
}

/// Retrieved table content. A failed query keeps the table in context with
/// `error` populated and no rows, rather than dropping it.
#[derive(Debug, Clone)]
pub struct TableContext {
    pub table_name: String,
    pub query: String,
    pub description: String,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub row_count: usize,
    pub error: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

impl TableContext {
    /// Serializes the retrieved rows for relevance scoring and prompt
    /// assembly, one JSON object per line.
    pub fn serialized_rows(&self) -> String {
        self.rows
            .iter()
            .map(|row| serde_json::to_string(row).unwrap_or_else(|_| String::from("{}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Summary entry for the response's source list.
    pub fn as_source(&self) -> TableSource {
        TableSource {
            table_name: self.table_name.clone(),
            query: self.query.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_rows_one_object_per_line() {
        let mut row_a = serde_json::Map::new();
        row_a.insert("id".to_string(), serde_json::json!(1));
        let mut row_b = serde_json::Map::new();
        row_b.insert("id".to_string(), serde_json::json!(2));

        let ctx = TableContext {
            table_name: "orders".to_string(),
            query: "SELECT * FROM orders LIMIT 100".to_string(),
            description: "All data from table: orders".to_string(),
            rows: vec![row_a, row_b],
            row_count: 2,
            error: None,
            extracted_at: Utc::now(),
        };
        let serialized = ctx.serialized_rows();
        assert_eq!(serialized.lines().count(), 2);
        assert!(serialized.contains("\"id\":1"));
    }

    #[test]
    fn request_defaults_deserialize() {
        let req: PromptRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.prompt, "hi");
        assert!(req.document_refs.is_empty());
        assert!(req.table_refs.is_empty());
        assert!(req.temperature.is_none());
        assert!(req.budget_ms.is_none());
    }
}
