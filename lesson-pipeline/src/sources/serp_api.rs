use crate::config::SerpApiConfig;
use crate::fetcher::Fetcher;
use crate::traits::{ArticleSource, SourceKind};
use crate::types::{Article, PipelineError, Result};
use crate::utils::{text, time};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

const MAX_SUMMARY_CHARS: usize = 400;

#[derive(Debug, Deserialize)]
struct SerpResponse {
    organic_results: Option<Vec<OrganicResult>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
    source: Option<String>,
    date: Option<String>,
}

/// Web search through a SerpAPI-style endpoint.
pub struct SerpApiSource {
    fetcher: Arc<Fetcher>,
    config: SerpApiConfig,
    api_key: Option<String>,
}

impl SerpApiSource {
    pub fn new(fetcher: Arc<Fetcher>, config: SerpApiConfig, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            config,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn request_url(&self, query: &str, api_key: &str) -> Result<Url> {
        let num = self.config.num_results.to_string();
        let url = Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("engine", self.config.engine.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", api_key),
            ],
        )?;
        Ok(url)
    }

    /// Map a response body into articles. A body carrying an `error` field is rejected;
    /// a body without results is an empty list.
    pub fn parse_response(body: &str) -> Result<Vec<Article>> {
        let response: SerpResponse = serde_json::from_str(body)
            .map_err(|e| PipelineError::Parse(format!("Unexpected web-search response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(PipelineError::Parse(format!("Web-search API error: {}", error)));
        }

        let articles = response
            .organic_results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
                let url = raw.link.filter(|l| !l.trim().is_empty())?;
                Some(Article {
                    title,
                    summary: text::smart_truncate(raw.snippet.as_deref().unwrap_or("").trim(), MAX_SUMMARY_CHARS),
                    url,
                    source: raw.source.filter(|s| !s.is_empty()),
                    // Relative dates ("3 days ago") are not kept.
                    published_at: raw.date.as_deref().and_then(time::parse_timestamp),
                })
            })
            .collect();

        Ok(articles)
    }
}

#[async_trait]
impl ArticleSource for SerpApiSource {
    fn source_name(&self) -> String {
        "web-search".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Query
    }

    async fn fetch_articles(&self, query: &str) -> Option<Vec<Article>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                warn!("Web-search credential not configured, skipping query '{}'", query);
                return None;
            }
        };

        let url = match self.request_url(query, api_key) {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not build web-search request for '{}': {}", query, e);
                return None;
            }
        };

        let body = self.fetcher.get_text(&url).await?;

        match Self::parse_response(&body) {
            Ok(articles) => {
                info!("Web search '{}' returned {} results", query, articles.len());
                Some(articles)
            }
            Err(e) => {
                warn!("Discarding web-search response for '{}': {}", query, e);
                None
            }
        }
    }
}
