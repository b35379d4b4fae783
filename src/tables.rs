//! Row-store collaborator: table listing, capped retrieval, and relevance
//! discovery over a SQLite database.
//!
//! Retrieval is capped at `retrieval.max_rows` when the query is not already
//! bounded. A failed query does not drop the table from context; the error
//! is recorded on the context entry so the generative prompt can state that
//! the table exists but could not be read.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures_util::future::join_all;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo};
use tracing::{debug, warn};

use crate::cache::{memoized, BoundedCache};
use crate::config::Config;
use crate::models::TableContext;
use crate::rank::{rank_sources, RankCandidate};

pub struct TableStore {
    pool: SqlitePool,
    max_rows: usize,
    cache: BoundedCache<TableContext>,
}

impl TableStore {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let ttl = config.cache.ttl_secs.map(Duration::from_secs);
        Self {
            pool,
            max_rows: config.retrieval.max_rows,
            cache: BoundedCache::new(config.cache.content_capacity, ttl),
        }
    }

    /// Lists user tables in deterministic order.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Returns the retrieved context for one table, querying on first access
    /// and serving from the content cache afterwards. Query failures are
    /// recorded on the context rather than returned as errors.
    pub async fn extract_context(&self, table_name: &str) -> Result<TableContext> {
        memoized(&self.cache, table_name, || async {
            Ok(self.extract_uncached(table_name).await)
        })
        .await
    }

    async fn extract_uncached(&self, table_name: &str) -> TableContext {
        let query = format!("SELECT * FROM {} LIMIT {}", table_name, self.max_rows);
        let mut context = TableContext {
            table_name: table_name.to_string(),
            query: query.clone(),
            description: format!("All data from table: {}", table_name),
            rows: Vec::new(),
            row_count: 0,
            error: None,
            extracted_at: Utc::now(),
        };

        if !is_valid_identifier(table_name) {
            context.error = Some(format!("invalid table name: {}", table_name));
            return context;
        }

        debug!("querying table: {}", table_name);
        match sqlx::query(&query).fetch_all(&self.pool).await {
            Ok(rows) => {
                context.row_count = rows.len();
                context.rows = rows.iter().map(row_to_json).collect();
            }
            Err(e) => {
                warn!("error querying table {}: {}", table_name, e);
                context.error = Some(e.to_string());
            }
        }
        context
    }

    /// Retrieves many tables concurrently; output keeps input order. Tables
    /// whose queries fail stay in the output with `error` set.
    pub async fn extract_many(&self, table_names: &[String]) -> Vec<TableContext> {
        let tasks = table_names.iter().map(|name| async move {
            match self.extract_context(name).await {
                Ok(context) => Some(context),
                Err(e) => {
                    warn!("skipping unavailable table {}: {:#}", name, e);
                    None
                }
            }
        });
        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Ranks every known table against the query, scoring the table name and
    /// its serialized rows, and returns the top table names.
    pub async fn find_relevant(
        &self,
        query: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<String>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let all = self.list_tables().await?;
        let contexts = self.extract_many(&all).await;

        let candidates: Vec<RankCandidate> = contexts
            .iter()
            .map(|ctx| RankCandidate {
                id: ctx.table_name.clone(),
                name: ctx.table_name.clone(),
                content: ctx.serialized_rows(),
            })
            .collect();

        Ok(rank_sources(&candidates, query, keywords, limit)
            .into_iter()
            .map(|scored| scored.source_id)
            .collect())
    }

    /// Retrieves every known table into the content cache. Returns the
    /// number preloaded.
    pub async fn warm(&self) -> Result<usize> {
        let all = self.list_tables().await?;
        let contexts = self.extract_many(&all).await;
        Ok(contexts.len())
    }
}

/// Table names are interpolated into SQL and must be bare identifiers.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decodes a dynamically-typed SQLite row into a JSON object keyed by
/// column name.
fn row_to_json(row: &SqliteRow) -> serde_json::Map<String, serde_json::Value> {
    let mut record = serde_json::Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = match column.type_info().name() {
            "INTEGER" => row
                .try_get::<Option<i64>, _>(index)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "REAL" => row
                .try_get::<Option<f64>, _>(index)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "BLOB" => row
                .try_get::<Option<Vec<u8>>, _>(index)
                .ok()
                .flatten()
                .map(|bytes| serde_json::Value::from(format!("<{} bytes>", bytes.len())))
                .unwrap_or(serde_json::Value::Null),
            // TEXT, NUMERIC, and anything else: fall back to string decoding.
            _ => row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
        };
        record.insert(column.name().to_string(), value);
    }
    record
}
