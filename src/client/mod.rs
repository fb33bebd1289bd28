use futures::StreamExt;
use log::{info, warn};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::models::chat::Conversation;
use crate::models::toets::ToetsConfig;
use crate::prompts;
use crate::sse::{SseDecoder, StreamEvent};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server antwoordde met status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{message}")]
    Stream {
        message: String,
        /// Text accumulated before the failure; shown as the final result.
        partial: String,
    },
    #[error(transparent)]
    InvalidToets(#[from] crate::models::toets::ToetsConfigError),
}

/// Outcome of a streamed exchange. `finished` is false when the stream was
/// cancelled or ended without a done event; `text` always holds whatever
/// arrived, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub text: String,
    pub finished: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadedDocument {
    pub content: String,
    pub filename: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub transcription: String,
    pub file_name: String,
    pub engine: String,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the chat service. Holds no conversation state itself;
/// pair it with a [`Conversation`] per chat panel.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_from_response(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "Er is een fout opgetreden".to_string(),
        };
        ClientError::Status { status, message }
    }

    /// Single-shot chat call.
    pub async fn send_chat(&self, message: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json::<ChatResponseBody>().await?.response)
    }

    /// Streaming chat call. Tokens are reported through `on_token` as they
    /// arrive; cancelling the token stops reading and finalizes whatever
    /// has accumulated instead of discarding it.
    pub async fn stream_chat(
        &self,
        message: &str,
        mut on_token: impl FnMut(&str),
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/api/chat-stream"))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut accumulated = String::new();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stream cancelled after {} chars", accumulated.chars().count());
                    return Ok(StreamOutcome { text: accumulated, finished: false });
                }
                chunk = body.next() => chunk,
            };

            let stream_ended = chunk.is_none();
            let events = match chunk {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => {
                    warn!("Stream transport error: {}", e);
                    return Err(ClientError::Stream {
                        message: e.to_string(),
                        partial: accumulated,
                    });
                }
                None => decoder.finish().into_iter().collect(),
            };

            for event in events {
                match event {
                    StreamEvent::Token { token, .. } => {
                        on_token(&token);
                        accumulated.push_str(&token);
                    }
                    StreamEvent::Done => {
                        return Ok(StreamOutcome {
                            text: accumulated,
                            finished: true,
                        });
                    }
                    StreamEvent::Error { message } => {
                        return Err(ClientError::Stream {
                            message,
                            partial: accumulated,
                        });
                    }
                }
            }

            if stream_ended {
                // Body exhausted without a terminal event.
                return Ok(StreamOutcome {
                    text: accumulated,
                    finished: false,
                });
            }
        }
    }

    /// Runs one streamed exchange against a conversation: pushes the user
    /// message, streams the reply, and always leaves a message in the
    /// transcript: the full reply, the preserved partial, or an
    /// assistant-style error.
    pub async fn chat_round(
        &self,
        conversation: &mut Conversation,
        message: &str,
        on_token: impl FnMut(&str),
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        conversation.push_user(message);
        match self.stream_chat(message, on_token, cancel).await {
            Ok(outcome) => {
                conversation.push_assistant(outcome.text);
                Ok(())
            }
            Err(ClientError::Stream { message, partial }) => {
                if !partial.is_empty() {
                    conversation.push_assistant(partial.clone());
                }
                conversation.push_error(&message);
                Err(ClientError::Stream { message, partial })
            }
            Err(e) => {
                conversation.push_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Asks a question grounded in extracted document text, or falls back
    /// to the general prompt when no document is available.
    pub async fn ask_about_document(
        &self,
        document: Option<&str>,
        vraag: &str,
    ) -> Result<String, ClientError> {
        let prompt = match document {
            Some(text) => prompts::document_grounded_prompt(text, vraag),
            None => prompts::general_fallback_prompt(vraag),
        };
        self.send_chat(&prompt).await
    }

    /// Streams a generated quiz for the given configuration.
    pub async fn generate_toets(
        &self,
        config: &ToetsConfig,
        on_token: impl FnMut(&str),
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ClientError> {
        config.validate()?;
        self.stream_chat(&config.build_prompt(), on_token, cancel)
            .await
    }

    /// Fetches a document from the server's static documents path and runs
    /// it through the upload endpoint to get its text. This is how a chat
    /// panel loads its grounding document at startup.
    pub async fn load_document(&self, filename: &str) -> Result<UploadedDocument, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/documents/{}", filename)))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                message: format!("Document '{}' niet gevonden", filename),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        self.upload_document(filename, bytes).await
    }

    pub async fn upload_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedDocument, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/upload-docx"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn transcribe_audio(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Transcription, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/transcribe-audio"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}
