use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::llm::GeminiError;

/// User-facing error body. `error` is Dutch and shown verbatim; `hint` and
/// `details` are optional extras for remediation and debugging.
#[derive(Serialize, Debug)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub fn reply(status: StatusCode, error: ApiError) -> Response {
    (status, Json(error)).into_response()
}

pub fn bad_request(message: &str) -> Response {
    reply(StatusCode::BAD_REQUEST, ApiError::new(message))
}

/// Maps the gateway's typed error onto an HTTP status plus Dutch body.
pub fn provider_error_response(err: &GeminiError) -> Response {
    match err {
        GeminiError::MissingApiKey => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("API configuratie ontbreekt. Check Environment Variables.")
                .with_hint("Voeg GEMINI_API_KEY toe aan je environment variables"),
        ),
        GeminiError::QuotaExceeded(detail) => reply(
            StatusCode::TOO_MANY_REQUESTS,
            ApiError::new("Gemini API quota overschreden. Probeer later opnieuw.")
                .with_details(detail.clone()),
        ),
        GeminiError::UnsupportedFormat(detail) => reply(
            StatusCode::BAD_REQUEST,
            ApiError::new("Formaat wordt niet ondersteund door Gemini. Probeer MP3, WAV of AAC.")
                .with_details(detail.clone()),
        ),
        GeminiError::PayloadTooLarge(detail) => reply(
            StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::new("Bestand te groot voor Gemini (max 20MB).").with_details(detail.clone()),
        ),
        GeminiError::InvalidRequest(detail) => reply(
            StatusCode::BAD_REQUEST,
            ApiError::new("Ongeldige aanvraag voor Gemini.").with_details(detail.clone()),
        ),
        GeminiError::Timeout => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("Gemini reageerde niet op tijd. Probeer het later opnieuw."),
        ),
        GeminiError::Http(_) | GeminiError::UnexpectedResponse(_) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("Er is een fout opgetreden bij het verwerken van je bericht")
                .with_details(err.to_string()),
        ),
    }
}
