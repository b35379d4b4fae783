use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Root directory scanned for documents.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.pptx".to_string(),
        "**/*.docx".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum sources of each kind returned by relevance ranking.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    /// Confidence a paragraph must reach to answer without the model.
    #[serde(default = "default_direct_answer_threshold")]
    pub direct_answer_threshold: f64,
    /// Row cap applied to unbounded table queries.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            direct_answer_threshold: default_direct_answer_threshold(),
            max_rows: default_max_rows(),
        }
    }
}

fn default_max_sources() -> usize {
    5
}
fn default_direct_answer_threshold() -> f64 {
    0.7
}
fn default_max_rows() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Generation requests are abandoned past this bound.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum cached answers.
    #[serde(default = "default_response_capacity")]
    pub response_capacity: usize,
    /// Maximum cached document/table contexts (each kind).
    #[serde(default = "default_content_capacity")]
    pub content_capacity: usize,
    /// Optional age bound in seconds; expired entries read as misses.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_capacity: default_response_capacity(),
            content_capacity: default_content_capacity(),
            ttl_secs: None,
        }
    }
}

fn default_response_capacity() -> usize {
    256
}
fn default_content_capacity() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.max_sources < 1 {
        anyhow::bail!("retrieval.max_sources must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.retrieval.direct_answer_threshold) {
        anyhow::bail!("retrieval.direct_answer_threshold must be in [0.0, 1.0]");
    }

    if config.retrieval.max_rows < 1 {
        anyhow::bail!("retrieval.max_rows must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    if config.generation.timeout_secs == 0 {
        anyhow::bail!("generation.timeout_secs must be > 0");
    }

    if config.cache.response_capacity < 1 || config.cache.content_capacity < 1 {
        anyhow::bail!("cache capacities must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse(
            r#"
            [documents]
            root = "./documents"

            [db]
            path = "./data/rag.sqlite"

            [server]
            bind = "127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.max_sources, 5);
        assert!((config.retrieval.direct_answer_threshold - 0.7).abs() < 1e-9);
        assert_eq!(config.retrieval.max_rows, 100);
        assert_eq!(config.generation.model, "llama3");
        assert!((config.generation.temperature - 0.7).abs() < 1e-9);
        assert_eq!(config.cache.response_capacity, 256);
        assert!(config.cache.ttl_secs.is_none());
        assert_eq!(config.documents.include_globs.len(), 5);
    }

    #[test]
    fn overrides_are_honored() {
        let config = parse(
            r#"
            [documents]
            root = "/srv/docs"
            include_globs = ["**/*.pdf"]

            [db]
            path = "/srv/rag.sqlite"

            [retrieval]
            max_sources = 3
            max_rows = 25

            [generation]
            model = "mistral"
            timeout_secs = 60

            [cache]
            response_capacity = 16
            ttl_secs = 3600

            [server]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.max_sources, 3);
        assert_eq!(config.retrieval.max_rows, 25);
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.cache.response_capacity, 16);
        assert_eq!(config.cache.ttl_secs, Some(3600));
        assert_eq!(config.documents.include_globs, vec!["**/*.pdf"]);
    }
}
