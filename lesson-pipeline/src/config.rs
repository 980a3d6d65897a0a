use crate::types::{FetchConfig, PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::{info, warn};

/// Process-wide configuration. Built once in `main` and shared read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracks: Vec<TrackConfig>,
    pub fetch: FetchConfig,
    pub apis: ApiConfig,
    pub aggregation: AggregationConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracks: default_tracks(),
            fetch: FetchConfig::default(),
            apis: ApiConfig::default(),
            aggregation: AggregationConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            delivery: DeliveryConfig::default(),
            secrets: Secrets::default(),
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file, then apply environment secrets and overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.secrets = Secrets::from_env();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Ok(recipient) = env::var("LESSON_RECIPIENT") {
            self.delivery.recipient = Some(recipient);
        }
        if let Ok(operator) = env::var("OPERATOR_EMAIL") {
            self.delivery.operator = Some(operator);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(PipelineError::Config("at least one track must be configured".to_string()));
        }
        for track in &self.tracks {
            if track.name.trim().is_empty() {
                return Err(PipelineError::Config("track names must not be empty".to_string()));
            }
        }
        if self.fetch.max_retries == 0 {
            return Err(PipelineError::Config("fetch.max_retries must be at least 1".to_string()));
        }
        if self.secrets.news_api_key.is_none() && self.secrets.serp_api_key.is_none() {
            warn!("No search API credentials configured; only feeds will be used");
        }
        Ok(())
    }

    pub fn track(&self, name: &str) -> Option<&TrackConfig> {
        self.tracks.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackConfig {
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub feeds: Vec<String>,
}

impl TrackConfig {
    /// Subtopic of the day, rotating by day-of-year.
    pub fn subtopic_for(&self, date: NaiveDate) -> String {
        if self.subtopics.is_empty() {
            return self.name.clone();
        }
        let index = date.ordinal0() as usize % self.subtopics.len();
        self.subtopics[index].clone()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub news_api: NewsApiConfig,
    pub serp_api: SerpApiConfig,
    pub composer: ComposerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub endpoint: String,
    pub language: String,
    pub page_size: u32,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://newsapi.org/v2/everything".to_string(),
            language: "en".to_string(),
            page_size: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerpApiConfig {
    pub endpoint: String,
    pub engine: String,
    pub num_results: u32,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search.json".to_string(),
            engine: "google".to_string(),
            num_results: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1800,
        }
    }
}

/// Bounds on external calls made per track on a cache miss.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub max_queries: usize,
    pub max_feeds: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_queries: 2,
            max_feeds: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 6 * 60 * 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://lessons.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub recipient: Option<String>,
    pub operator: Option<String>,
    pub sender: String,
    pub subject_prefix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            operator: None,
            sender: "Daily Lessons <lessons@localhost>".to_string(),
            subject_prefix: "Daily Lesson".to_string(),
        }
    }
}

/// Credentials, read from the environment only.
#[derive(Clone, Default)]
pub struct Secrets {
    pub news_api_key: Option<String>,
    pub serp_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub smtp_uri: Option<String>,
    pub smtp_password: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            news_api_key: non_empty_env("NEWS_API_KEY"),
            serp_api_key: non_empty_env("SERP_API_KEY"),
            llm_api_key: non_empty_env("LLM_API_KEY"),
            smtp_uri: non_empty_env("SMTP_URI"),
            smtp_password: non_empty_env("SMTP_PASSWORD"),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("news_api_key", &mask(&self.news_api_key))
            .field("serp_api_key", &mask(&self.serp_api_key))
            .field("llm_api_key", &mask(&self.llm_api_key))
            .field("smtp_uri", &mask(&self.smtp_uri))
            .field("smtp_password", &mask(&self.smtp_password))
            .finish()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn track(name: &str, subtopics: &[&str], queries: &[&str], feeds: &[&str]) -> TrackConfig {
    TrackConfig {
        name: name.to_string(),
        subtopics: owned(subtopics),
        queries: owned(queries),
        feeds: owned(feeds),
    }
}

pub fn default_tracks() -> Vec<TrackConfig> {
    vec![
        track(
            "Data Science & ML",
            &[
                "Feature Engineering",
                "Model Evaluation Metrics",
                "Gradient Boosting",
                "Transformers & Attention",
                "MLOps Pipelines",
                "Time Series Forecasting",
            ],
            &["machine learning", "data science", "generative AI"],
            &[
                "https://www.kdnuggets.com/feed",
                "https://machinelearningmastery.com/feed/",
                "https://blog.research.google/feeds/posts/default",
            ],
        ),
        track(
            "Cloud & DevOps",
            &[
                "Infrastructure as Code",
                "Kubernetes Operators",
                "Observability",
                "CI/CD Strategies",
                "Serverless Patterns",
            ],
            &["kubernetes", "cloud computing", "devops"],
            &[
                "https://aws.amazon.com/blogs/aws/feed/",
                "https://kubernetes.io/feed.xml",
            ],
        ),
        track(
            "Cybersecurity",
            &[
                "Zero Trust Architecture",
                "Threat Modeling",
                "Supply Chain Security",
                "Identity & Access Management",
                "Incident Response",
            ],
            &["cybersecurity", "ransomware", "vulnerability"],
            &[
                "https://krebsonsecurity.com/feed/",
                "https://feeds.feedburner.com/TheHackersNews",
            ],
        ),
    ]
}
