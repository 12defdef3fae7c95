use async_trait::async_trait;
use paperseek_common::{PaperSeekError, Result};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm_trait::LlmClient;
use crate::types::{EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse};

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
    max_retries: u32,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // vision models can be slow on CPU
            .build()
            .map_err(|e| PaperSeekError::llm(format!("Failed to create HTTP client: {}", e)))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self {
            base_url,
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Override retry count (minimum 1 attempt)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `op` up to `max_retries` times with exponential backoff
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        what, attempt, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PaperSeekError::llm(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| PaperSeekError::llm(format!("Ollama API error: {}", e)))?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PaperSeekError::llm(format!("Failed to parse response: {}", e)))?;

        if result.response.is_empty() {
            return Err(PaperSeekError::llm("Empty response from Ollama"));
        }

        Ok(result.response)
    }

    async fn try_embed(&self, request: &EmbedRequest) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PaperSeekError::llm(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| PaperSeekError::llm(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await.map_err(|e| {
            PaperSeekError::llm(format!("Failed to parse embedding response: {}", e))
        })?;

        if result.embedding.is_empty() {
            return Err(PaperSeekError::llm("Empty embedding from Ollama"));
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, mut request: GenerateRequest) -> Result<String> {
        request.stream = Some(false);
        debug!(
            "Sending generate request to Ollama - Model: {}, Images: {}",
            request.model,
            request.images.as_ref().map_or(0, |i| i.len())
        );

        let request = &request;
        let response = self
            .with_retry("Ollama generate", move || self.try_generate(request))
            .await?;
        debug!("Received response from Ollama - Length: {}", response.len());
        Ok(response)
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };
        debug!("Generating embedding - Model: {}, Text length: {}", model, text.len());

        let request = &request;
        let embedding = self
            .with_retry("Ollama embedding", move || self.try_embed(request))
            .await?;
        debug!("Received embedding - Dimension: {}", embedding.len());
        Ok(embedding)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PaperSeekError::llm(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }
}
