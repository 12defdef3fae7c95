//! PaperSeek LLM Integration
//!
//! Ollama API client, page metadata extraction and text embedding

mod client;
mod embed;
mod extract;
mod llm_trait;
mod prompts;
mod types;

pub use client::OllamaClient;
pub use embed::{l2_normalize, TextEmbedder};
pub use extract::{parse_metadata_response, MetadataExtractor, PageInput};
pub use llm_trait::LlmClient;
pub use prompts::METADATA_SYSTEM_PROMPT;
pub use types::{EmbedRequest, EmbedResponse, GenerateOptions, GenerateRequest, GenerateResponse};
