use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{error, AppState};
use crate::llm::Part;
use crate::sse::{encode_payload, StreamEvent};

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub(super) struct ChatRequest {
    message: String,
    images: Vec<String>,
}

/// Validates the request body by hand so every rejection carries the Dutch
/// message the UI shows verbatim.
pub(super) fn parse_chat_request(body: &Value, max_chars: usize) -> Result<ChatRequest, Response> {
    let message = match body.get("message") {
        None | Some(Value::Null) => return Err(error::bad_request("Bericht is vereist")),
        Some(Value::String(s)) => {
            if s.is_empty() {
                return Err(error::bad_request("Bericht is vereist"));
            }
            s.clone()
        }
        Some(_) => {
            return Err(error::bad_request(&format!(
                "Bericht moet een string zijn van maximaal {} karakters",
                max_chars
            )))
        }
    };
    if message.chars().count() > max_chars {
        return Err(error::bad_request(&format!(
            "Bericht moet een string zijn van maximaal {} karakters",
            max_chars
        )));
    }

    let mut images = Vec::new();
    match body.get("images") {
        Some(Value::Array(list)) => {
            for item in list {
                match item {
                    Value::String(raw) => images.push(normalize_image(raw)?),
                    _ => {
                        return Err(error::bad_request(
                            "Afbeeldingen moeten base64 strings zijn",
                        ))
                    }
                }
            }
        }
        _ => {
            // Single-image field kept for older clients.
            if let Some(Value::String(raw)) = body.get("image") {
                images.push(normalize_image(raw)?);
            }
        }
    }

    Ok(ChatRequest { message, images })
}

fn normalize_image(raw: &str) -> Result<String, Response> {
    let payload = match raw.find(";base64,") {
        Some(idx) if raw.starts_with("data:") => &raw[idx + ";base64,".len()..],
        _ => raw,
    };
    if BASE64.decode(payload).is_err() {
        return Err(error::bad_request("Afbeelding is geen geldige base64 data"));
    }
    Ok(payload.to_string())
}

fn request_parts(request: &ChatRequest) -> Vec<Part> {
    let mut parts = vec![Part::text(request.message.as_str())];
    for image in &request.images {
        parts.push(Part::inline_data("image/jpeg", image.clone()));
    }
    parts
}

pub async fn chat_handler(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let request = match parse_chat_request(&body, state.args.max_message_chars) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.provider.complete(request_parts(&request)).await {
        Ok(text) => Json(ChatResponse { response: text }).into_response(),
        Err(e) => {
            error!("Chat completion failed: {}", e);
            error::provider_error_response(&e)
        }
    }
}

/// Streams the completion as SSE. Validation and the upstream call happen
/// before the stream opens so those failures still get a real HTTP status;
/// after that every outcome is an in-band event.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let request = match parse_chat_request(&body, state.args.max_message_chars) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        "Opening chat stream ({} chars, {} image(s))",
        request.message.chars().count(),
        request.images.len()
    );

    let upstream = match state.provider.complete_stream(request_parts(&request)).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to open upstream stream: {}", e);
            return error::provider_error_response(&e);
        }
    };

    let fragment_timeout = Duration::from_secs(state.args.upstream_timeout_secs);
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(32);

    tokio::spawn(async move {
        let mut upstream = upstream;
        loop {
            let event = match tokio::time::timeout(fragment_timeout, upstream.next()).await {
                Err(_) => {
                    error!(
                        "Upstream produced no fragment within {}s",
                        fragment_timeout.as_secs()
                    );
                    StreamEvent::error("Tijdslimiet overschreden bij het wachten op Gemini")
                }
                Ok(None) => StreamEvent::Done,
                Ok(Some(Ok(fragment))) => StreamEvent::token(fragment),
                Ok(Some(Err(e))) => {
                    error!("Streaming error: {}", e);
                    StreamEvent::error(e.to_string())
                }
            };
            let terminal = event.is_terminal();

            // A failed send means the client hung up; nothing to report.
            if tx
                .send(Ok(Event::default().data(encode_payload(&event))))
                .await
                .is_err()
            {
                info!("Client disconnected, dropping rest of stream");
                break;
            }
            if terminal {
                break;
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}
