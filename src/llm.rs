//! Client for the local LLM generation endpoint.
//!
//! The [`Generator`] trait is the seam between the pipeline and the model
//! server: it turns a prompt into generated text. [`OllamaGenerator`] is the
//! HTTP implementation; tests substitute their own.
//!
//! [`LlmClient`] builds the two fixed prompts (summarize, answer) on top of
//! any generator.
//!
//! # Wire contract
//!
//! ```text
//! POST {llm.url}
//! { "model": "llama2", "prompt": "...", "options": { "num_predict": 256 }, "stream": false }
//!
//! 200 { "response": "..." }
//! ```
//!
//! Each call is a single attempt. There is no retry, so a transient failure
//! of the model server surfaces directly to the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::error::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no response within {0}s")]
    Timeout(u64),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(secs) => Error::UpstreamTimeout(secs),
            other => Error::Upstream(other.to_string()),
        }
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, recorded next to cached summaries.
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: GenerateOptions,
    stream: bool,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

/// [`Generator`] backed by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn classify(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
            stream: false,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending generation request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        parse_generate_response(&body)
    }
}

/// Pulls the `response` field out of a generation reply.
///
/// A reply that is valid JSON but lacks the field yields an empty string
/// rather than an error.
fn parse_generate_response(body: &str) -> Result<String, LlmError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;

    match json.get("response").and_then(|r| r.as_str()) {
        Some(text) => Ok(text.to_string()),
        None => {
            tracing::warn!("generation response has no `response` field, returning empty text");
            Ok(String::new())
        }
    }
}

pub fn summarize_prompt(text: &str) -> String {
    format!(
        "Summarize the following document in a concise paragraph:\n\n{}",
        text
    )
}

pub fn answer_prompt(text: &str, question: &str) -> String {
    format!(
        "You are an expert PDF assistant. Given the following document, answer the user's question as helpfully as possible.\n\nDocument:\n{}\n\nQuestion: {}\n\nAnswer:",
        text, question
    )
}

/// Summarization and question answering over a [`Generator`].
#[derive(Clone)]
pub struct LlmClient {
    generator: Arc<dyn Generator>,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(generator: Arc<dyn Generator>, max_tokens: u32) -> Self {
        Self {
            generator,
            max_tokens,
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub async fn summarize(&self, text: &str) -> crate::error::Result<String> {
        let prompt = summarize_prompt(text);
        Ok(self.generator.generate(&prompt, self.max_tokens).await?)
    }

    pub async fn answer(&self, text: &str, question: &str) -> crate::error::Result<String> {
        let prompt = answer_prompt(text, question);
        Ok(self.generator.generate(&prompt, self.max_tokens).await?)
    }
}
