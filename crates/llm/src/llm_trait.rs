use async_trait::async_trait;
use paperseek_common::Result;

use crate::types::GenerateRequest;

/// Common trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text from a prompt
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Generate embedding for text
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;

    /// Test connection/availability
    async fn test_connection(&self) -> Result<bool>;
}
