pub mod gemini;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub use self::gemini::GeminiClient;

/// Inline binary payload (image, audio) sent alongside a prompt, base64
/// encoded as the API expects it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: Blob::new(mime_type, data),
        }
    }
}

/// Failure classes of the provider, decided once at this boundary. Callers
/// match on the variant instead of re-inspecting provider message text.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,
    #[error("provider quota exhausted: {0}")]
    QuotaExceeded(String),
    #[error("media format not supported by the provider: {0}")]
    UnsupportedFormat(String),
    #[error("payload too large for the provider: {0}")]
    PayloadTooLarge(String),
    #[error("provider rejected the request: {0}")]
    InvalidRequest(String),
    #[error("upstream call did not produce a fragment in time")]
    Timeout,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected response from provider: {0}")]
    UnexpectedResponse(String),
}

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, GeminiError>> + Send>>;

/// Seam between the HTTP handlers and the hosted model. The real
/// implementation talks to the Gemini REST API; tests inject a fake.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single-shot completion: prompt (plus optional inline parts) in, full
    /// response text out.
    async fn complete(&self, parts: Vec<Part>) -> Result<String, GeminiError>;

    /// Streaming completion: resolves to a lazy sequence of text fragments
    /// once the upstream call is accepted.
    async fn complete_stream(&self, parts: Vec<Part>) -> Result<TokenStream, GeminiError>;

    /// Speech-to-text over an uploaded audio payload.
    async fn transcribe(&self, prompt: &str, audio: Blob) -> Result<String, GeminiError>;

    /// Human-readable engine label reported in transcription metadata.
    fn transcribe_engine(&self) -> String;
}
