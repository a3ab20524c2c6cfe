//! Free-form text queries
//!
//! A [`TextQuery`] backend is chosen once at startup and injected into the
//! HTTP handlers. The chart pipeline never depends on it: a disabled or
//! failing backend only affects the query endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::QueryConfig;

/// Errors returned by a [`TextQuery`] backend
#[derive(Debug, Error)]
pub enum QueryError {
    /// The capability is switched off; callers show this as a warning.
    #[error("text query service is not enabled")]
    Disabled,

    /// The backend was reached but could not produce an answer.
    #[error("text query service failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Failed(err.to_string())
    }
}

#[async_trait]
pub trait TextQuery: Send + Sync {
    fn name(&self) -> &str;

    /// Send one question and wait for the answer. No retries.
    async fn ask(&self, question: &str) -> Result<String, QueryError>;
}

/// Backend used when no service is configured
pub struct DisabledQuery;

#[async_trait]
impl TextQuery for DisabledQuery {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn ask(&self, _question: &str) -> Result<String, QueryError> {
        Err(QueryError::Disabled)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated
    fn into_text(self) -> Result<String, QueryError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(QueryError::Failed("empty response".to_string()));
        }
        Ok(text)
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl TextQuery for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn ask(&self, question: &str) -> Result<String, QueryError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: question }],
            }],
        };

        debug!("Sending text query to {}", self.endpoint());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Failed(format!("status {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.into_text()
    }
}

/// Pick the query backend from configuration. Falls back to
/// [`DisabledQuery`] when no key is set or the client cannot be built.
pub fn select_backend(config: &QueryConfig) -> Arc<dyn TextQuery> {
    let Some(api_key) = config.api_key() else {
        warn!("No text query API key configured, query endpoint disabled");
        return Arc::new(DisabledQuery);
    };

    match GeminiClient::new(api_key.to_string(), config.model.clone(), config.base_url.clone()) {
        Ok(client) => {
            info!("Text queries enabled (model: {})", config.model);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Text query backend unavailable: {:#}", e);
            Arc::new(DisabledQuery)
        }
    }
}
