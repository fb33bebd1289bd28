use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// API key for the Gemini API. When unset, chat requests fail with a
    /// configuration error instead of crashing the server.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Model name for chat completion.
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.5-flash-preview-05-20")]
    pub chat_model: String,

    /// Model name for audio transcription.
    #[arg(long, env = "TRANSCRIBE_MODEL", default_value = "gemini-2.5-flash")]
    pub transcribe_model: String,

    /// Base URL for the Gemini API.
    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_base_url: String,

    /// Directory with static documents, served under /documents.
    #[arg(long, env = "DOCUMENTS_DIR", default_value = "public/documents")]
    pub documents_dir: String,

    /// Maximum accepted chat message length in characters.
    #[arg(long, env = "MAX_MESSAGE_CHARS", default_value = "4000")]
    pub max_message_chars: usize,

    /// Maximum accepted audio upload size in bytes (provider limit is 20MB).
    #[arg(long, env = "MAX_AUDIO_BYTES", default_value = "20971520")]
    pub max_audio_bytes: usize,

    /// Seconds to wait for the next upstream fragment before failing a stream.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "120")]
    pub upstream_timeout_secs: u64,
}
