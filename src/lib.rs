pub mod cli;
pub mod client;
pub mod extract;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod server;
pub mod speech;
pub mod sse;

use cli::Args;
use llm::GeminiClient;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model);
    info!("Transcribe Model: {}", args.transcribe_model);
    info!("Gemini Base URL: {}", args.gemini_base_url);
    info!("Documents Dir: {}", args.documents_dir);
    info!("Max Message Chars: {}", args.max_message_chars);
    info!("Max Audio Bytes: {}", args.max_audio_bytes);
    info!("Upstream Timeout: {}s", args.upstream_timeout_secs);
    info!(
        "Gemini API Key: {}",
        if args.gemini_api_key.as_deref().unwrap_or("").is_empty() {
            "NOT SET"
        } else {
            "configured"
        }
    );
    info!("-------------------------");

    let provider = Arc::new(GeminiClient::from_args(&args));
    let server = Server::new(args, provider);
    server.run().await
}
