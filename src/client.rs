use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::workload::PromptClass;

/// Sampling temperature for every benchmark request. Kept low so runs are
/// comparable.
pub const TEMPERATURE: f32 = 0.1;

/// Upper bound on generated tokens per benchmark request.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}")]
    BadStatus { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Transport(String),
}

impl ClientError {
    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(timeout)
        } else if error.is_connect() {
            ClientError::Unreachable(error.to_string())
        } else if error.is_decode() {
            ClientError::Parse(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }
}

// Request types for the /api/generate endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            num_predict: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Response of a non-streaming generation call. Absent metric fields read as
/// zero and an absent body as empty text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    /// Tokens generated
    #[serde(default)]
    pub eval_count: u64,
    /// Generation time in nanoseconds
    #[serde(default)]
    pub eval_duration: u64,
    /// Prompt processing time in nanoseconds
    #[serde(default)]
    pub prompt_eval_duration: u64,
}

// Models list response (/api/tags)
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// Configuration for creating an Ollama client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Timeout for a generation request
    pub timeout: Duration,
    /// Timeout for reachability checks and model listing
    pub probe_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    /// Creates a client for an Ollama-compatible backend.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use local_llm_bench::client::{ClientConfig, OllamaClient};
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     timeout: Duration::from_secs(300),
    ///     probe_timeout: Duration::from_secs(5),
    /// };
    ///
    /// let client = OllamaClient::new(config).unwrap();
    /// ```
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true when the backend answers the model listing endpoint with
    /// 200 OK within the probe timeout.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status() == StatusCode::OK;
                if !ok {
                    log::debug!("Reachability check returned {}", response.status());
                }
                ok
            }
            Err(e) => {
                log::debug!("Reachability check failed: {}", e);
                false
            }
        }
    }

    /// Names of the models currently available on the backend. Any failure
    /// yields an empty list.
    pub async fn list_models(&self) -> Vec<String> {
        match self.fetch_tags().await {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                log::debug!("Model listing failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, ClientError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.probe_timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::BadStatus { status, body });
        }

        response
            .json::<TagsResponse>()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.probe_timeout))
    }

    pub fn create_request(&self, model: &str, class: PromptClass) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            prompt: class.prompt().to_string(),
            stream: false,
            options: GenerateOptions::default(),
        }
    }

    /// Issue a non-streaming generation request and wait for the full body.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ClientError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(ClientError::BadStatus { status, body });
        }

        // Read the body first so a stalled transfer is classified as a timeout
        // rather than a parse failure.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout))?;

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }
}
