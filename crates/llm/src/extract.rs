//! Paper metadata extraction through a vision-capable model
//!
//! The model is asked for a JSON object and the reply is parsed strictly into
//! a [`Record`]; anything that is not that object is an extraction error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use paperseek_common::{PaperSeekError, Record, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::prompts::{text_prompt, IMAGE_PROMPT, METADATA_SYSTEM_PROMPT};
use crate::types::{GenerateOptions, GenerateRequest};

/// First page of a document, as handed to the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInput {
    /// Encoded page image (JPEG/PNG bytes)
    Image(Vec<u8>),

    /// Text already pulled from the page
    Text(String),
}

impl PageInput {
    pub fn from_image_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            PaperSeekError::invalid_input(format!("Cannot read image {}: {}", path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(PaperSeekError::invalid_input(format!(
                "Image file is empty: {}",
                path.display()
            )));
        }
        Ok(Self::Image(bytes))
    }

    pub fn from_text_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PaperSeekError::invalid_input(format!("Cannot read text {}: {}", path.display(), e))
        })?;
        Ok(Self::Text(text))
    }

    fn into_request(self, model: &str) -> GenerateRequest {
        let mut request = match self {
            PageInput::Image(bytes) => {
                let mut request = GenerateRequest::new(model, IMAGE_PROMPT);
                request.images = Some(vec![BASE64.encode(bytes)]);
                request
            }
            PageInput::Text(text) => GenerateRequest::new(model, text_prompt(&text)),
        };
        request.system = Some(METADATA_SYSTEM_PROMPT.to_string());
        request.format = Some("json".to_string());
        request.options = Some(GenerateOptions {
            temperature: Some(0.0),
            ..Default::default()
        });
        request
    }
}

/// Extracts title, authors and abstract from a page
pub struct MetadataExtractor {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl MetadataExtractor {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub async fn extract(&self, page: PageInput) -> Result<Record> {
        let request = page.into_request(&self.model);
        let response = self.client.generate(request).await?;
        debug!("Extraction response length: {}", response.len());

        let record = parse_metadata_response(&response)?;
        info!("Extracted metadata: title='{}'", record.title);
        Ok(record)
    }
}

/// Parse a model reply into a record
///
/// Accepts a bare JSON object, optionally inside one markdown code fence.
pub fn parse_metadata_response(response: &str) -> Result<Record> {
    let body = strip_code_fence(response.trim());

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PaperSeekError::extraction(format!("Response is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(PaperSeekError::extraction("Response is not a JSON object"));
    }

    let record: Record = serde_json::from_value(value)
        .map_err(|e| PaperSeekError::extraction(format!("Unexpected metadata shape: {}", e)))?;

    if record.blank_fields().len() == 3 {
        return Err(PaperSeekError::extraction("No metadata found in response"));
    }
    Ok(record)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // drop the info string ("json") on the opening fence line
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a canned reply and remembers the last request
    struct RecordingClient {
        reply: String,
        last: Mutex<Option<GenerateRequest>>,
    }

    impl RecordingClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            *self.last.lock().unwrap() = Some(request);
            Ok(self.reply.clone())
        }

        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
            Err(PaperSeekError::llm("not used"))
        }

        async fn test_connection(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_parse_plain_object() {
        let record = parse_metadata_response(
            r#"{"title": "Deep Residual Learning", "authors": ["K. He", "X. Zhang"], "abstract": "Deeper networks..."}"#,
        )
        .unwrap();
        assert_eq!(record.title, "Deep Residual Learning");
        assert_eq!(record.authors, "K. He, X. Zhang");
        assert_eq!(record.abstract_text, "Deeper networks...");
    }

    #[test]
    fn test_parse_fenced_object() {
        let response = "```json\n{\"title\": \"T\", \"authors\": \"A\", \"abstract\": \"X\"}\n```";
        let record = parse_metadata_response(response).unwrap();
        assert_eq!(record, Record::new("T", "A", "X"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        // python-style dict literal must not be accepted
        let err = parse_metadata_response("{'title': 'T', 'authors': 'A', 'abstract': 'X'}")
            .unwrap_err();
        assert!(matches!(err, PaperSeekError::Extraction(_)));

        assert!(parse_metadata_response("[1, 2, 3]").is_err());
        assert!(parse_metadata_response("The title is T").is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_field_types() {
        assert!(parse_metadata_response(r#"{"title": 5, "authors": "A", "abstract": "X"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_metadata() {
        assert!(parse_metadata_response(r#"{"title": "", "authors": [], "abstract": " "}"#).is_err());
    }

    #[tokio::test]
    async fn test_extract_sends_image_as_base64_json_request() {
        let client = RecordingClient::new(r#"{"title": "T", "authors": "A", "abstract": "X"}"#);
        let extractor = MetadataExtractor::new(client.clone(), "llava");

        let record = extractor
            .extract(PageInput::Image(vec![0xFF, 0xD8, 0xFF]))
            .await
            .unwrap();
        assert_eq!(record.title, "T");

        let request = client.last.lock().unwrap().take().unwrap();
        assert_eq!(request.model, "llava");
        assert_eq!(request.format.as_deref(), Some("json"));
        assert_eq!(request.images, Some(vec!["/9j/".to_string()]));
        assert_eq!(request.system.as_deref(), Some(METADATA_SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn test_extract_text_page() {
        let client = RecordingClient::new(r#"{"title": "T", "authors": "A", "abstract": "X"}"#);
        let extractor = MetadataExtractor::new(client.clone(), "llama3.2");

        extractor
            .extract(PageInput::Text("Attention Is All You Need".to_string()))
            .await
            .unwrap();

        let request = client.last.lock().unwrap().take().unwrap();
        assert!(request.images.is_none());
        assert!(request.prompt.contains("Attention Is All You Need"));
    }

    #[test]
    fn test_page_input_from_missing_file() {
        assert!(matches!(
            PageInput::from_image_file(Path::new("/nonexistent/page.jpg")),
            Err(PaperSeekError::InvalidInput(_))
        ));
    }
}
