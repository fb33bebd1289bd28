pub mod chat;
pub mod error;
pub mod upload;

use crate::cli::Args;
use crate::llm::ChatProvider;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use log::info;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ChatProvider>,
    pub args: Args,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave headroom above the audio ceiling so oversized uploads reach the
    // handler's own size check instead of dying in the extractor.
    let body_limit = state.args.max_audio_bytes + 4 * 1024 * 1024;

    Router::new()
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/chat-stream", post(chat::chat_stream_handler))
        .route("/api/upload-docx", post(upload::upload_document_handler))
        .route("/api/transcribe-audio", post(upload::transcribe_audio_handler))
        .nest_service("/documents", ServeDir::new(&state.args.documents_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

pub struct Server {
    addr: String,
    state: AppState,
}

impl Server {
    pub fn new(args: Args, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            addr: args.server_addr.clone(),
            state: AppState { provider, args },
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = router(self.state.clone());
        info!("Starting HTTP API server on: http://{}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
