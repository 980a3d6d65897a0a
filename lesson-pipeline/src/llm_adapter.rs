use crate::config::ComposerConfig;
use crate::fetcher::Fetcher;
use crate::types::{AggregatedContent, Difficulty, PipelineError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const MAX_TAGS: usize = 5;

/// Everything the composer needs to write one lesson.
#[derive(Debug, Clone, Copy)]
pub struct LessonRequest<'a> {
    pub track: &'a str,
    pub subtopic: &'a str,
    pub level: Difficulty,
    pub date: NaiveDate,
    pub content: &'a AggregatedContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSection {
    pub heading: String,
    pub body: String,
}

/// The structured lesson returned by the composition API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedLesson {
    pub title: String,
    pub hook: String,
    pub tags: Vec<String>,
    pub sections: Vec<LessonSection>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub challenge: Option<String>,
}

/// Trait for generative-text backends that compose lessons
#[async_trait]
pub trait LessonComposer: Send + Sync {
    /// Get the name of this composer
    fn adapter_name(&self) -> String;

    /// Compose a lesson; any transport, parse or validation problem is an error.
    async fn compose(&self, request: &LessonRequest<'_>) -> Result<ComposedLesson>;
}

pub fn system_prompt() -> &'static str {
    "You are an expert technical educator writing a five-minute daily micro-lesson. \
     Reply with a single JSON object and nothing else."
}

pub fn build_prompt(request: &LessonRequest<'_>) -> String {
    let trends = if request.content.trends.is_empty() {
        "none reported".to_string()
    } else {
        request.content.trends.join(", ")
    };

    let insights = request
        .content
        .insights
        .iter()
        .enumerate()
        .map(|(i, insight)| {
            format!("{}. {} ({}): {}", i + 1, insight.headline, insight.source, insight.takeaway)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Track: {track}\n\
         Subtopic: {subtopic}\n\
         Level: {level}\n\
         Date: {date}\n\n\
         Current trends: {trends}\n\
         Recent headlines:\n{insights}\n\n\
         Write a {level} micro-lesson on \"{subtopic}\" that connects to the current trends where it fits.\n\
         Return JSON with exactly these keys:\n\
         - \"title\": string\n\
         - \"hook\": one or two sentences that motivate the topic\n\
         - \"tags\": array of up to {max_tags} short strings\n\
         - \"sections\": array of 3-4 objects {{\"heading\": string, \"body\": string}}\n\
         - \"key_takeaways\": array of 3 strings\n\
         - \"challenge\": a short hands-on exercise\n\
         Keep the whole lesson under 450 words.",
        track = request.track,
        subtopic = request.subtopic,
        level = request.level,
        date = request.date,
        trends = trends,
        insights = insights,
        max_tags = MAX_TAGS,
    )
}

/// Parse and validate the composer's reply text.
///
/// Tolerates a surrounding Markdown code fence. `title`, `hook` and at least
/// one section must be non-empty; tags are trimmed and capped.
pub fn parse_composed_lesson(raw: &str) -> Result<ComposedLesson> {
    let body = strip_code_fence(raw);
    let mut lesson: ComposedLesson = serde_json::from_str(body)
        .map_err(|e| PipelineError::InvalidLesson(format!("response is not a lesson object: {}", e)))?;

    if lesson.title.trim().is_empty() {
        return Err(PipelineError::InvalidLesson("empty title".to_string()));
    }
    if lesson.hook.trim().is_empty() {
        return Err(PipelineError::InvalidLesson("empty hook".to_string()));
    }
    lesson.sections.retain(|s| !s.heading.trim().is_empty() || !s.body.trim().is_empty());
    if lesson.sections.is_empty() {
        return Err(PipelineError::InvalidLesson("no content sections".to_string()));
    }

    lesson.tags = lesson
        .tags
        .iter()
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .collect();

    Ok(lesson)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Composer for OpenAI-compatible chat-completion endpoints.
pub struct ChatCompletionsComposer {
    fetcher: Arc<Fetcher>,
    config: ComposerConfig,
    api_key: Option<String>,
}

impl ChatCompletionsComposer {
    pub fn new(fetcher: Arc<Fetcher>, config: ComposerConfig, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            config,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn request_body(&self, request: &LessonRequest<'_>) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": build_prompt(request) },
            ],
        })
    }

    pub fn extract_content(body: &str) -> Result<String> {
        let completion: ChatCompletion = serde_json::from_str(body)
            .map_err(|e| PipelineError::Parse(format!("Unexpected completion response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidLesson("completion had no content".to_string()))
    }
}

#[async_trait]
impl LessonComposer for ChatCompletionsComposer {
    fn adapter_name(&self) -> String {
        format!("chat-completions ({})", self.config.model)
    }

    async fn compose(&self, request: &LessonRequest<'_>) -> Result<ComposedLesson> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::MissingCredential("LLM_API_KEY".to_string()))?;

        let url = Url::parse(&self.config.endpoint)?;
        let body = self.request_body(request);

        debug!("Composing {} lesson on {} / {}", request.level, request.track, request.subtopic);

        let response = self
            .fetcher
            .post_json(&url, Some(api_key), &body)
            .await
            .ok_or_else(|| PipelineError::NoResponse {
                url: crate::fetcher::log_label(&url),
                attempts: self.fetcher.retry_policy().max_attempts,
            })?;

        let text = response.text().await?;
        let content = Self::extract_content(&text)?;
        let lesson = parse_composed_lesson(&content)?;

        info!("Composed lesson '{}' with {} sections", lesson.title, lesson.sections.len());
        Ok(lesson)
    }
}
