use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{error, info};
use regex::Regex;
use serde::Serialize;

use super::error::{self, ApiError};
use super::AppState;
use crate::extract::{self, DocumentKind};
use crate::llm::Blob;
use crate::prompts;

/// Audio formats the provider accepts, matched on MIME type or extension.
const ALLOWED_AUDIO_MIME: [&str; 7] = [
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/aiff",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
];

fn audio_extension_allowed(filename: &str) -> bool {
    Regex::new(r"(?i)\.(mp3|wav|aiff|aac|ogg|flac|mpeg|mpga)$")
        .expect("static pattern")
        .is_match(filename)
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(error::bad_request(&format!(
                    "Ongeldige upload: {}",
                    e.body_text()
                )))
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(error::bad_request(&format!(
                    "Kan bestand niet lezen: {}",
                    e.body_text()
                )))
            }
        };
        return Ok(Some(UploadedFile {
            filename,
            content_type,
            bytes,
        }));
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub content: String,
    pub filename: String,
    pub file_type: &'static str,
    pub size: usize,
}

pub async fn upload_document_handler(mut multipart: Multipart) -> Response {
    let file = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return error::bad_request("Geen bestand ontvangen"),
        Err(response) => return response,
    };

    let Some(kind) = DocumentKind::detect(&file.filename, file.content_type.as_deref()) else {
        return error::bad_request("Alleen .docx en .pdf bestanden zijn toegestaan");
    };

    match extract::extract_text(&file.bytes, kind) {
        Ok(content) => {
            info!(
                "Extracted {} chars from {} ({})",
                content.chars().count(),
                file.filename,
                kind.label()
            );
            Json(UploadResponse {
                content,
                filename: file.filename,
                file_type: kind.label(),
                size: file.bytes.len(),
            })
            .into_response()
        }
        Err(e) => {
            error!("Extraction failed for {}: {}", file.filename, e);
            error::reply(
                StatusCode::BAD_REQUEST,
                ApiError::new("Kan document niet verwerken").with_details(e.to_string()),
            )
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResponse {
    pub success: bool,
    pub transcription: String,
    pub file_name: String,
    pub file_size: usize,
    pub engine: String,
    pub message: &'static str,
}

pub async fn transcribe_audio_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let file = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return error::bad_request("Geen audio bestand ontvangen"),
        Err(response) => return response,
    };

    let mime_allowed = file
        .content_type
        .as_deref()
        .map(|m| ALLOWED_AUDIO_MIME.contains(&m))
        .unwrap_or(false);
    if !mime_allowed && !audio_extension_allowed(&file.filename) {
        return error::bad_request(
            "Niet ondersteund audio formaat. Ondersteunde formaten: MP3, WAV, AIFF, AAC, OGG, FLAC",
        );
    }

    // Size ceiling is enforced here; the provider is never called for
    // oversized uploads.
    if file.bytes.len() > state.args.max_audio_bytes {
        return error::reply(
            StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::new(format!(
                "Audio bestand te groot. Maximum grootte is {}MB.",
                state.args.max_audio_bytes / (1024 * 1024)
            )),
        );
    }

    info!(
        "🎵 Starting audio transcription... file={} size={} mime={:?}",
        file.filename,
        file.bytes.len(),
        file.content_type
    );

    let mime = file
        .content_type
        .clone()
        .unwrap_or_else(|| "audio/mpeg".to_string());
    let audio = Blob::new(mime, BASE64.encode(&file.bytes));

    match state
        .provider
        .transcribe(prompts::TRANSCRIPTION_PROMPT, audio)
        .await
    {
        Ok(transcription) => {
            info!(
                "✅ Audio transcription successful, {} chars for {}",
                transcription.chars().count(),
                file.filename
            );
            Json(TranscriptionResponse {
                success: true,
                transcription,
                file_name: file.filename,
                file_size: file.bytes.len(),
                engine: state.provider.transcribe_engine(),
                message: "Audio succesvol getranscribeerd met Gemini AI",
            })
            .into_response()
        }
        Err(e) => {
            error!("Audio transcription failed for {}: {}", file.filename, e);
            error::provider_error_response(&e)
        }
    }
}
