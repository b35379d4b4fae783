//! Document registry: listing, cached extraction, and relevance discovery
//! over a filesystem root.
//!
//! Identity is the root-relative path. Extraction runs once per document per
//! process (unless the entry is evicted); the extracted context is immutable
//! and only replaced wholesale. Batch operations tolerate individual
//! failures: a document that cannot be read or parsed is logged and dropped,
//! never aborting the batch.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::{memoized, BoundedCache};
use crate::config::Config;
use crate::extract;
use crate::models::DocumentContext;
use crate::rank::{rank_sources, RankCandidate};

pub struct DocumentStore {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    cache: BoundedCache<DocumentContext>,
}

impl DocumentStore {
    pub fn new(config: &Config) -> Result<Self> {
        let include = build_globset(&config.documents.include_globs)?;
        let exclude = build_globset(&config.documents.exclude_globs)?;
        let ttl = config.cache.ttl_secs.map(Duration::from_secs);

        Ok(Self {
            root: config.documents.root.clone(),
            include,
            exclude,
            cache: BoundedCache::new(config.cache.content_capacity, ttl),
        })
    }

    /// Lists all documents under the root matching the configured globs,
    /// as root-relative paths in deterministic order.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            bail!("documents root does not exist: {}", self.root.display());
        }

        let mut filenames = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if self.exclude.is_match(&rel_str) || !self.include.is_match(&rel_str) {
                continue;
            }
            filenames.push(rel_str);
        }

        filenames.sort();
        Ok(filenames)
    }

    /// Returns the extracted context for one document, extracting on first
    /// access and serving from the content cache afterwards.
    pub async fn extract_context(&self, filename: &str) -> Result<DocumentContext> {
        memoized(&self.cache, filename, || self.extract_uncached(filename)).await
    }

    async fn extract_uncached(&self, filename: &str) -> Result<DocumentContext> {
        let path = self.root.join(filename);
        if !path.exists() {
            bail!("document not found: {}", filename);
        }

        debug!("extracting document: {}", filename);
        let extracted = tokio::task::spawn_blocking(move || extract::extract_document(&path))
            .await
            .context("extraction task failed")??;

        Ok(DocumentContext {
            filename: filename.to_string(),
            doc_type: extracted.doc_type,
            content: extracted.text,
            page_count: extracted.unit_count,
            extracted_at: Utc::now(),
        })
    }

    /// Extracts many documents concurrently. Failed documents are logged and
    /// excluded; output keeps input order.
    pub async fn extract_many(&self, filenames: &[String]) -> Vec<DocumentContext> {
        let tasks = filenames.iter().map(|filename| async move {
            match self.extract_context(filename).await {
                Ok(context) => Some(context),
                Err(e) => {
                    warn!("skipping unavailable document {}: {:#}", filename, e);
                    None
                }
            }
        });
        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Ranks every known document against the query and returns the top
    /// filenames. Returns nothing when the query has no usable keywords.
    pub async fn find_relevant(
        &self,
        query: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<String>> {
        if keywords.is_empty() {
            warn!("no meaningful keywords extracted from query: {:?}", query);
            return Ok(Vec::new());
        }

        let all = self.list_documents()?;
        let contexts = self.extract_many(&all).await;

        let candidates: Vec<RankCandidate> = contexts
            .iter()
            .map(|ctx| RankCandidate {
                id: ctx.filename.clone(),
                name: ctx.filename.clone(),
                content: ctx.content.clone(),
            })
            .collect();

        Ok(rank_sources(&candidates, query, keywords, limit)
            .into_iter()
            .map(|scored| scored.source_id)
            .collect())
    }

    /// Extracts every known document into the content cache. Returns the
    /// number preloaded.
    pub async fn warm(&self) -> Result<usize> {
        let all = self.list_documents()?;
        let contexts = self.extract_many(&all).await;
        Ok(contexts.len())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CacheConfig, Config, DbConfig, DocumentsConfig, GenerationConfig, RetrievalConfig,
        ServerConfig,
    };
    use crate::keywords::extract_keywords;

    fn test_config(root: &std::path::Path) -> Config {
        Config {
            documents: DocumentsConfig {
                root: root.to_path_buf(),
                include_globs: vec!["**/*.txt".to_string(), "**/*.md".to_string()],
                exclude_globs: vec!["**/drafts/**".to_string()],
            },
            db: DbConfig {
                path: root.join("rag.sqlite"),
            },
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn lists_matching_documents_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), "beta").unwrap();
        std::fs::write(dir.path().join("alpha.md"), "alpha").unwrap();
        std::fs::write(dir.path().join("ignored.bin"), "binary").unwrap();
        std::fs::create_dir_all(dir.path().join("drafts")).unwrap();
        std::fs::write(dir.path().join("drafts/wip.txt"), "draft").unwrap();

        let store = DocumentStore::new(&test_config(dir.path())).unwrap();
        let docs = store.list_documents().unwrap();
        assert_eq!(docs, vec!["alpha.md", "beta.txt"]);
    }

    #[tokio::test]
    async fn extraction_is_cached_per_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "original content of the note").unwrap();

        let store = DocumentStore::new(&test_config(dir.path())).unwrap();
        let first = store.extract_context("note.txt").await.unwrap();
        assert_eq!(first.content, "original content of the note");

        // A rewrite is not observed until the entry is invalidated.
        std::fs::write(&path, "rewritten").unwrap();
        let second = store.extract_context("note.txt").await.unwrap();
        assert_eq!(second.content, "original content of the note");
    }

    #[tokio::test]
    async fn extract_many_tolerates_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha content").unwrap();
        std::fs::write(dir.path().join("c.txt"), "gamma content").unwrap();

        let store = DocumentStore::new(&test_config(dir.path())).unwrap();
        let contexts = store
            .extract_many(&[
                "a.txt".to_string(),
                "missing.txt".to_string(),
                "c.txt".to_string(),
            ])
            .await;

        let names: Vec<&str> = contexts.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn find_relevant_ranks_by_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("deploy.md"),
            "The deployment runbook covers the deployment pipeline and rollbacks in detail.",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("lunch.md"),
            "The cafeteria menu rotates weekly and has nothing to do with software.",
        )
        .unwrap();

        let store = DocumentStore::new(&test_config(dir.path())).unwrap();
        let query = "how does the deployment pipeline work";
        let keywords = extract_keywords(query);
        let relevant = store.find_relevant(query, &keywords, 5).await.unwrap();
        assert_eq!(relevant, vec!["deploy.md"]);
    }

    #[tokio::test]
    async fn find_relevant_without_keywords_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "content").unwrap();

        let store = DocumentStore::new(&test_config(dir.path())).unwrap();
        let relevant = store.find_relevant("the a to", &[], 5).await.unwrap();
        assert!(relevant.is_empty());
    }
}
