//! Generative-model collaborator.
//!
//! [`TextGenerator`] is the seam between the retrieval pipeline and the
//! model backend: the orchestrator holds a trait object so tests can swap in
//! counting or failing fakes. [`OllamaGenerator`] is the production
//! implementation, posting to an Ollama-compatible `/api/generate` endpoint.
//!
//! Every call is bounded by the configured timeout. Failures (timeout,
//! unreachable host, malformed reply) surface as errors here; the
//! orchestrator converts them into a user-visible placeholder answer rather
//! than failing the request.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::GenerationConfig;

/// Produces text from a prompt at a given sampling temperature.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String>;
}

/// Client for an Ollama-compatible generation API.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "temperature": temperature,
            "stream": false,
            "max_tokens": self.max_tokens,
            "num_predict": self.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("generation request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("generation API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("generation response was not valid JSON")?;

        // Older and newer API revisions differ on the reply field name.
        if let Some(text) = json.get("response").and_then(|v| v.as_str()) {
            return Ok(text.to_string());
        }
        if let Some(text) = json.get("text").and_then(|v| v.as_str()) {
            return Ok(text.to_string());
        }
        bail!("unexpected generation response format: {}", json);
    }
}
