use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A normalized article produced by any content source.
///
/// The canonical `url` is the identity key used for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub headline: String,
    pub takeaway: String,
    pub source: String,
}

/// Trend keywords and insight records gathered for one track.
///
/// Live aggregation and the curated fallback both produce this exact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedContent {
    pub trends: Vec<String>,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ROTATION: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// Level rotates weekly so a whole ISO week shares one difficulty.
    pub fn for_date(date: NaiveDate) -> Self {
        let week = date.iso_week().week() as usize;
        Self::ROTATION[week % Self::ROTATION.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ROTATION
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the content behind a lesson came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentOrigin {
    Live,
    Curated,
}

impl ContentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentOrigin::Live => "live",
            ContentOrigin::Curated => "curated",
        }
    }
}

/// A generated lesson. Created once and appended to history; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub date: NaiveDate,
    pub track: String,
    pub subtopic: String,
    pub level: Difficulty,
    pub title: String,
    pub hook: String,
    pub content_html: String,
    pub tags: Vec<String>,
    pub word_count: usize,
    pub origin: ContentOrigin,
    pub created_at: DateTime<Utc>,
}

/// Emitted when both the live and the curated generation tier failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub date: NaiveDate,
    pub track: String,
    pub subtopic: String,
    pub primary_error: String,
    pub fallback_error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl FailureReport {
    pub fn summary_line(&self) -> String {
        match &self.fallback_error {
            Some(fallback) => format!(
                "{} / {}: primary failed ({}); fallback failed ({})",
                self.track, self.subtopic, self.primary_error, fallback
            ),
            None => format!(
                "{} / {}: {}",
                self.track, self.subtopic, self.primary_error
            ),
        }
    }
}

/// Append-only lesson history.
#[async_trait]
pub trait LessonArchive: Send + Sync {
    async fn append(&self, lesson: &Lesson) -> Result<()>;

    /// Every stored lesson, oldest first.
    async fn history(&self) -> Result<Vec<Lesson>>;
}

/// Delivers a finished lesson to the configured recipient.
#[async_trait]
pub trait LessonNotifier: Send + Sync {
    async fn deliver(&self, lesson: &Lesson) -> Result<()>;
}

/// Operator channel for unrecoverable per-track failures.
#[async_trait]
pub trait FailureReporter: Send + Sync {
    async fn report(&self, report: &FailureReport) -> Result<()>;
}
