use futures::StreamExt;
use log::{info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{Blob, ChatProvider, GeminiError, Part, TokenStream};
use crate::cli::Args;
use async_trait::async_trait;

const API_VERSION: &str = "v1beta";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl GenerateContentRequest {
    fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let joined: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[derive(Deserialize)]
struct GoogleErrorPayload {
    error: GoogleErrorDetails,
}

#[derive(Deserialize)]
struct GoogleErrorDetails {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a non-success provider response onto the typed error enum. This is
/// the only place that inspects provider status codes and message text.
fn classify_api_error(status: StatusCode, body: &[u8]) -> GeminiError {
    let (message, api_status) = match serde_json::from_slice::<GoogleErrorPayload>(body) {
        Ok(payload) => (payload.error.message, payload.error.status),
        Err(_) => (String::from_utf8_lossy(body).into_owned(), None),
    };
    let lowered = message.to_lowercase();

    if status == StatusCode::TOO_MANY_REQUESTS
        || api_status.as_deref() == Some("RESOURCE_EXHAUSTED")
        || lowered.contains("quota")
    {
        return GeminiError::QuotaExceeded(message);
    }
    if status == StatusCode::PAYLOAD_TOO_LARGE
        || lowered.contains("too large")
        || lowered.contains("exceeds the maximum size")
    {
        return GeminiError::PayloadTooLarge(message);
    }
    if status.is_client_error() {
        if lowered.contains("unsupported") || lowered.contains("mime") {
            return GeminiError::UnsupportedFormat(message);
        }
        return GeminiError::InvalidRequest(message);
    }
    GeminiError::UnexpectedResponse(format!("HTTP {}: {}", status.as_u16(), message))
}

fn parse_stream_line(line: &str) -> Option<String> {
    let data = line.trim_end().strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(chunk) => chunk.text(),
        Err(e) => {
            warn!("Skipping unparseable provider stream chunk: {}", e);
            None
        }
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    chat_model: String,
    transcribe_model: String,
    base_url: String,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        chat_model: String,
        transcribe_model: String,
        base_url: String,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            chat_model,
            transcribe_model,
            base_url,
            request_timeout,
        }
    }

    pub fn from_args(args: &Args) -> Self {
        Self::new(
            args.gemini_api_key.clone(),
            args.chat_model.clone(),
            args.transcribe_model.clone(),
            args.gemini_base_url.clone(),
            Duration::from_secs(args.upstream_timeout_secs),
        )
    }

    fn key(&self) -> Result<&str, GeminiError> {
        self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)
    }

    fn endpoint(&self, model: &str, operation: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            API_VERSION,
            model,
            operation
        )
    }

    async fn generate(&self, model: &str, parts: Vec<Part>) -> Result<String, GeminiError> {
        let key = self.key()?;
        let url = format!("{}?key={}", self.endpoint(model, "generateContent"), key);
        info!("GeminiClient::generate() → model={}", model);

        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&GenerateContentRequest::from_parts(parts))
            .send()
            .await
            .map_err(wrap_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(wrap_transport_error)?;
        if !status.is_success() {
            return Err(classify_api_error(status, &bytes));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GeminiError::UnexpectedResponse(format!("invalid JSON body: {}", e)))?;
        parsed
            .text()
            .ok_or_else(|| GeminiError::UnexpectedResponse("response carried no text".to_string()))
    }
}

fn wrap_transport_error(e: reqwest::Error) -> GeminiError {
    if e.is_timeout() {
        GeminiError::Timeout
    } else {
        GeminiError::Http(e)
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn complete(&self, parts: Vec<Part>) -> Result<String, GeminiError> {
        self.generate(&self.chat_model, parts).await
    }

    async fn complete_stream(&self, parts: Vec<Part>) -> Result<TokenStream, GeminiError> {
        let key = self.key()?;
        let url = format!(
            "{}?alt=sse&key={}",
            self.endpoint(&self.chat_model, "streamGenerateContent"),
            key
        );
        info!("GeminiClient::complete_stream() → model={}", self.chat_model);

        let response = self
            .http
            .post(&url)
            .json(&GenerateContentRequest::from_parts(parts))
            .send()
            .await
            .map_err(wrap_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let bytes = response.bytes().await.map_err(wrap_transport_error)?;
            return Err(classify_api_error(status, &bytes));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes_stream.next().await {
                match chunk {
                    Ok(buf) => {
                        buffer.extend_from_slice(&buf);
                        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                            let Ok(line) = String::from_utf8(line_bytes) else {
                                continue;
                            };
                            if let Some(fragment) = parse_stream_line(&line) {
                                if !fragment.is_empty() && tx.send(Ok(fragment)).await.is_err() {
                                    // Receiver dropped, nobody is relaying anymore.
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(wrap_transport_error(e))).await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn transcribe(&self, prompt: &str, audio: Blob) -> Result<String, GeminiError> {
        let parts = vec![
            Part::text(prompt),
            Part::InlineData { inline_data: audio },
        ];
        self.generate(&self.transcribe_model, parts).await
    }

    fn transcribe_engine(&self) -> String {
        format!("Gemini ({})", self.transcribe_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_data_serializes_to_camel_case_wire_shape() {
        let part = Part::inline_data("image/jpeg", "AAAA");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"inlineData": {"mimeType": "image/jpeg", "data": "AAAA"}})
        );
    }

    #[test]
    fn request_body_nests_parts_under_contents() {
        let body = GenerateContentRequest::from_parts(vec![Part::text("hallo")]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"parts": [{"text": "hallo"}]}]})
        );
    }

    #[test]
    fn quota_errors_classify_as_quota_exceeded() {
        let body = br#"{"error":{"code":429,"message":"Quota exceeded for requests","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_api_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, GeminiError::QuotaExceeded(_)));
    }

    #[test]
    fn quota_text_wins_even_on_generic_status() {
        let body = br#"{"error":{"message":"You exceeded your current quota"}}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, GeminiError::QuotaExceeded(_)));
    }

    #[test]
    fn unsupported_mime_classifies_as_unsupported_format() {
        let body = br#"{"error":{"message":"Unsupported MIME type: audio/x-midi"}}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, GeminiError::UnsupportedFormat(_)));
    }

    #[test]
    fn oversized_payload_classifies_as_payload_too_large() {
        let body = br#"{"error":{"message":"Request payload size exceeds the maximum size"}}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, GeminiError::PayloadTooLarge(_)));
    }

    #[test]
    fn other_client_errors_classify_as_invalid_request() {
        let body = br#"{"error":{"message":"Invalid argument"}}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, GeminiError::InvalidRequest(_)));
    }

    #[test]
    fn non_json_server_errors_fall_through_with_raw_detail() {
        let err = classify_api_error(StatusCode::BAD_GATEWAY, b"upstream exploded");
        match err {
            GeminiError::UnexpectedResponse(detail) => {
                assert!(detail.contains("502"));
                assert!(detail.contains("upstream exploded"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn stream_line_parser_extracts_candidate_text() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hallo"}]}}]}"#;
        assert_eq!(parse_stream_line(line), Some("Hallo".to_string()));
        assert_eq!(parse_stream_line("data: "), None);
        assert_eq!(parse_stream_line("not a data line"), None);
    }

    #[test]
    fn missing_key_is_reported_before_any_request() {
        let client = GeminiClient::new(
            None,
            "gemini-test".into(),
            "gemini-test".into(),
            "http://localhost:1".into(),
            Duration::from_secs(1),
        );
        assert!(matches!(client.key(), Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let client = GeminiClient::new(
            Some(String::new()),
            "gemini-test".into(),
            "gemini-test".into(),
            "http://localhost:1".into(),
            Duration::from_secs(1),
        );
        assert!(matches!(client.key(), Err(GeminiError::MissingApiKey)));
    }
}
