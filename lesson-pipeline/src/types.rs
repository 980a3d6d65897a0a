use serde::Deserialize;
use std::time::Duration;
// Use the interfaces crate for core types
pub use interfaces::defs::{AggregatedContent, Article, ContentOrigin, Difficulty, Insight, Lesson};
pub use interfaces::defs::{FailureReport, FailureReporter, LessonArchive, LessonNotifier};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Total attempts per request, the first one included.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Lesson-Pipeline/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_redirects: 5,
            accept_invalid_certs: false,
        }
    }
}

impl FetchConfig {
    /// Settings for syndication feeds, which are often served behind odd certificates.
    pub fn relaxed(&self) -> Self {
        Self {
            accept_invalid_certs: true,
            ..self.clone()
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No response from {url} after {attempts} attempts")]
    NoResponse { url: String, attempts: u32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid lesson: {0}")]
    InvalidLesson(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        PipelineError::General(format!("{:#}", e))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
