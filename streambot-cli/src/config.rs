use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use streambot_shared::ChatOptions;
use url::Url;

/// Terminal chat client for a streaming completion backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "streambot", version, about)]
pub struct Config {
    /// Backend base URL; requests go to `<base>/api/chat/stream`.
    #[arg(long, env = "STREAMBOT_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: Url,

    #[arg(long, env = "STREAMBOT_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    #[arg(long, env = "STREAMBOT_MAX_TOKENS", default_value_t = 512)]
    pub max_tokens: u32,

    #[arg(long, env = "STREAMBOT_TOP_P")]
    pub top_p: Option<f32>,

    /// Overall limit for one request, body included.
    #[arg(long, env = "STREAMBOT_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Logs go to a file so they don't corrupt the TUI.
    #[arg(long, env = "STREAMBOT_LOG_FILE", default_value = "streambot.log")]
    pub log_file: PathBuf,
}

impl Config {
    /// Parses the command line after loading `.env`, if there is one.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: self.top_p,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
