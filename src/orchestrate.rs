//! End-to-end query orchestration.
//!
//! Each request moves through: response-cache check → source discovery →
//! content retrieval → direct-answer attempt → generative fallback →
//! response-cache write. A cache hit short-circuits everything; a confident
//! direct answer short-circuits the generative call.
//!
//! Document and table discovery run concurrently and are both joined before
//! any context is assembled; the generative fallback never sees partial
//! context. Per-source failures are absorbed inside the stores' fan-outs;
//! from here on, a missing source simply is not in the context.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::answer::extract_direct_answer;
use crate::cache::BoundedCache;
use crate::config::Config;
use crate::documents::DocumentStore;
use crate::generate::TextGenerator;
use crate::keywords::extract_keywords;
use crate::models::{
    DocumentContext, DocumentSource, PromptRequest, PromptResponse, TableContext, TableSource,
};
use crate::normalize::normalize_prompt;
use crate::tables::TableStore;

/// A computed answer memoized under its normalized prompt key.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub answer: String,
    pub document_sources: Vec<DocumentSource>,
    pub table_sources: Vec<TableSource>,
    pub created_at: DateTime<Utc>,
}

pub struct Orchestrator {
    documents: Arc<DocumentStore>,
    tables: Arc<TableStore>,
    generator: Arc<dyn TextGenerator>,
    response_cache: BoundedCache<CachedAnswer>,
    max_sources: usize,
    direct_answer_threshold: f64,
    default_temperature: f64,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        documents: Arc<DocumentStore>,
        tables: Arc<TableStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let ttl = config.cache.ttl_secs.map(Duration::from_secs);
        Self {
            documents,
            tables,
            generator,
            response_cache: BoundedCache::new(config.cache.response_capacity, ttl),
            max_sources: config.retrieval.max_sources,
            direct_answer_threshold: config.retrieval.direct_answer_threshold,
            default_temperature: config.generation.temperature,
        }
    }

    /// Answers a request, honoring its latency budget when one is supplied.
    /// Never returns an error: degraded outcomes become explanatory answers.
    pub async fn answer(&self, request: &PromptRequest) -> PromptResponse {
        let Some(budget) = request.budget_ms else {
            return self.answer_inner(request).await;
        };

        match tokio::time::timeout(Duration::from_millis(budget), self.answer_inner(request)).await
        {
            Ok(response) => response,
            Err(_) => {
                warn!(
                    "abandoning request after {}ms budget: {}",
                    budget, request.prompt
                );
                degraded_response(
                    request,
                    "The request exceeded its latency budget before an answer could be produced.",
                )
            }
        }
    }

    async fn answer_inner(&self, request: &PromptRequest) -> PromptResponse {
        let key = normalize_prompt(&request.prompt);

        if let Some(cached) = self.response_cache.lookup(&key) {
            info!("using cached response for prompt: {}", request.prompt);
            return PromptResponse {
                prompt: request.prompt.clone(),
                answer: cached.answer,
                answered_at: Utc::now(),
                document_sources: cached.document_sources,
                table_sources: cached.table_sources,
            };
        }

        info!("generating new response for prompt: {}", request.prompt);
        let keywords = extract_keywords(&request.prompt);

        let (doc_names, table_names) = self.select_sources(request, &keywords).await;
        if !doc_names.is_empty() || !table_names.is_empty() {
            info!(
                "using {} document(s) and {} table(s) for prompt: {}",
                doc_names.len(),
                table_names.len(),
                request.prompt
            );
        }

        let (doc_contexts, table_contexts) = tokio::join!(
            self.documents.extract_many(&doc_names),
            self.tables.extract_many(&table_names),
        );

        let document_sources: Vec<DocumentSource> =
            doc_contexts.iter().map(|ctx| ctx.as_source()).collect();
        let table_sources: Vec<TableSource> =
            table_contexts.iter().map(|ctx| ctx.as_source()).collect();

        if let Some(direct) = extract_direct_answer(
            &doc_contexts,
            &request.prompt,
            &keywords,
            self.direct_answer_threshold,
        ) {
            info!(
                "answered directly from document {} (confidence {:.2})",
                direct.filename, direct.confidence
            );
            return self.finish(request, &key, direct.text, document_sources, table_sources);
        }

        let grounded = build_grounded_prompt(&doc_contexts, &table_contexts, &request.prompt);
        let temperature = request.temperature.unwrap_or(self.default_temperature);

        match self.generator.generate(&grounded, temperature).await {
            Ok(answer) => self.finish(request, &key, answer, document_sources, table_sources),
            Err(e) => {
                error!("generative model call failed: {:#}", e);
                // Placeholder answers are deliberately not cached: the next
                // identical query should retry the model.
                degraded_response(
                    request,
                    "The language model could not produce an answer for this request. \
                     Please try again later.",
                )
            }
        }
    }

    /// Stores the computed answer under the normalized key and builds the
    /// response.
    fn finish(
        &self,
        request: &PromptRequest,
        key: &str,
        answer: String,
        document_sources: Vec<DocumentSource>,
        table_sources: Vec<TableSource>,
    ) -> PromptResponse {
        self.response_cache.store(
            key,
            CachedAnswer {
                answer: answer.clone(),
                document_sources: document_sources.clone(),
                table_sources: table_sources.clone(),
                created_at: Utc::now(),
            },
        );

        PromptResponse {
            prompt: request.prompt.clone(),
            answer,
            answered_at: Utc::now(),
            document_sources,
            table_sources,
        }
    }

    /// Explicit references are used verbatim; otherwise documents and tables
    /// are discovered concurrently by relevance ranking.
    async fn select_sources(
        &self,
        request: &PromptRequest,
        keywords: &[String],
    ) -> (Vec<String>, Vec<String>) {
        if !request.document_refs.is_empty() || !request.table_refs.is_empty() {
            return (request.document_refs.clone(), request.table_refs.clone());
        }

        let (docs, tables) = tokio::join!(
            self.documents
                .find_relevant(&request.prompt, keywords, self.max_sources),
            self.tables
                .find_relevant(&request.prompt, keywords, self.max_sources),
        );

        let docs = docs.unwrap_or_else(|e| {
            warn!("document discovery failed: {:#}", e);
            Vec::new()
        });
        let tables = tables.unwrap_or_else(|e| {
            warn!("table discovery failed: {:#}", e);
            Vec::new()
        });
        (docs, tables)
    }

    /// Preloads both content caches. Returns (documents, tables) preloaded.
    pub async fn warm(&self) -> (usize, usize) {
        info!("preloading content caches");
        let (docs, tables) = tokio::join!(self.documents.warm(), self.tables.warm());
        let docs = docs.unwrap_or_else(|e| {
            warn!("error preloading document cache: {:#}", e);
            0
        });
        let tables = tables.unwrap_or_else(|e| {
            warn!("error preloading table cache: {:#}", e);
            0
        });
        info!("preloaded {} document(s) and {} table(s)", docs, tables);
        (docs, tables)
    }
}

fn degraded_response(request: &PromptRequest, message: &str) -> PromptResponse {
    PromptResponse {
        prompt: request.prompt.clone(),
        answer: message.to_string(),
        answered_at: Utc::now(),
        document_sources: Vec::new(),
        table_sources: Vec::new(),
    }
}

/// Assembles the grounded prompt for the generative fallback: retrieved
/// context blocks, grounding instructions, and the user's question.
fn build_grounded_prompt(
    documents: &[DocumentContext],
    tables: &[TableContext],
    user_prompt: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an AI assistant that provides helpful and accurate information. \
         Use the following context to answer the user's question:\n\n",
    );

    if !documents.is_empty() {
        prompt.push_str("DOCUMENT CONTEXT:\n");
        for doc in documents {
            prompt.push_str(&format!("Document: {}\n", doc.filename));
            prompt.push_str(&format!("Type: {}\n", doc.doc_type));
            prompt.push_str(&format!("Content:\n{}\n\n", doc.content));
        }
    }

    if !tables.is_empty() {
        prompt.push_str("DATABASE CONTEXT:\n");
        for table in tables {
            prompt.push_str(&format!("Table: {}\n", table.table_name));
            prompt.push_str(&format!("Description: {}\n", table.description));
            prompt.push_str(&format!("Row count: {}\n", table.row_count));
            if let Some(ref error) = table.error {
                prompt.push_str(&format!("Error: {}\n", error));
            }
            prompt.push_str(&format!("Data:\n{}\n\n", table.serialized_rows()));
        }
    }

    prompt.push_str("IMPORTANT INSTRUCTIONS:\n");
    prompt.push_str("1. Answer the user's question based ONLY on the provided context above.\n");
    prompt.push_str(
        "2. If the information needed to answer the question is not in the context, \
         explicitly state: \"I don't have enough information in the referenced materials \
         to answer this question.\"\n",
    );
    prompt.push_str(
        "3. Do not make up or infer information that is not explicitly stated in the context.\n",
    );
    prompt.push_str("4. If you're unsure about any part of your answer, indicate your uncertainty.\n");
    prompt.push_str("5. Always cite the specific document or database source for your information.\n");

    prompt.push_str(&format!("\nUser: {}", user_prompt));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;

    fn doc(filename: &str, content: &str) -> DocumentContext {
        DocumentContext {
            filename: filename.to_string(),
            doc_type: DocType::Text,
            content: content.to_string(),
            page_count: None,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn grounded_prompt_includes_contexts_and_instructions() {
        let docs = vec![doc("runbook.md", "restart the worker with systemctl")];
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), serde_json::json!(7));
        let tables = vec![TableContext {
            table_name: "jobs".to_string(),
            query: "SELECT * FROM jobs LIMIT 100".to_string(),
            description: "All data from table: jobs".to_string(),
            rows: vec![row],
            row_count: 1,
            error: None,
            extracted_at: Utc::now(),
        }];

        let prompt = build_grounded_prompt(&docs, &tables, "how do I restart the worker?");
        assert!(prompt.contains("DOCUMENT CONTEXT:"));
        assert!(prompt.contains("Document: runbook.md"));
        assert!(prompt.contains("DATABASE CONTEXT:"));
        assert!(prompt.contains("Table: jobs"));
        assert!(prompt.contains("Row count: 1"));
        assert!(prompt.contains("based ONLY on the provided context"));
        assert!(prompt.ends_with("User: how do I restart the worker?"));
    }

    #[test]
    fn grounded_prompt_reports_table_errors() {
        let tables = vec![TableContext {
            table_name: "ghosts".to_string(),
            query: "SELECT * FROM ghosts LIMIT 100".to_string(),
            description: "All data from table: ghosts".to_string(),
            rows: Vec::new(),
            row_count: 0,
            error: Some("no such table: ghosts".to_string()),
            extracted_at: Utc::now(),
        }];

        let prompt = build_grounded_prompt(&[], &tables, "anything");
        assert!(prompt.contains("Error: no such table: ghosts"));
        assert!(!prompt.contains("DOCUMENT CONTEXT:"));
    }
}
