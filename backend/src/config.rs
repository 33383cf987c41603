//! # Configuration
//!
//! Runtime settings for the server. Every flag can also be supplied through
//! the environment variable named next to it, so the binary can be configured
//! the same way from a shell, a container or a `.env`-style launcher.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as TokenDuration;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "statement-analyzer", version, about = "Bank statement analysis API")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    pub bind_addr: SocketAddr,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:statements.db")]
    pub database_url: String,

    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in hours (at most one year)
    #[arg(
        long,
        env = "TOKEN_TTL_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(1..=8760)
    )]
    pub token_ttl_hours: i64,

    /// bcrypt work factor for password hashes
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,

    /// API key for the Gemini generative language API
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-pro")]
    pub gemini_model: String,

    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_base_url: String,

    /// Timeout for a single model call, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,

    /// Scratch directory for uploaded files while they are being read
    #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Largest accepted upload, in megabytes
    #[arg(
        long,
        env = "MAX_UPLOAD_MB",
        default_value_t = 16,
        value_parser = clap::value_parser!(u64).range(1..=1024)
    )]
    pub max_upload_mb: u64,

    /// Number of statement characters sent to the model for extraction
    #[arg(long, env = "PROMPT_TEXT_LIMIT", default_value_t = 5000)]
    pub prompt_text_limit: usize,

    /// Transactions per categorization request
    #[arg(long, env = "CATEGORIZE_BATCH_SIZE", default_value_t = 20)]
    pub categorize_batch_size: usize,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Built frontend to serve for non-API paths
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn token_ttl(&self) -> TokenDuration {
        TokenDuration::hours(self.token_ttl_hours)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb * 1024 * 1024) as usize
    }
}
