use crate::config::NewsApiConfig;
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
struct NewsApiResponse {
    // Required: an error body without this array is a malformed response.
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<NewsApiSourceRef>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSourceRef {
    name: Option<String>,
}

/// Keyword search against a NewsAPI-style `everything` endpoint.
pub struct NewsApiSource {
    fetcher: Arc<Fetcher>,
    config: NewsApiConfig,
    api_key: Option<String>,
}

impl NewsApiSource {
    pub fn new(fetcher: Arc<Fetcher>, config: NewsApiConfig, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            config,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn request_url(&self, query: &str, api_key: &str) -> Result<Url> {
        let page_size = self.config.page_size.to_string();
        let url = Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("q", query),
                ("language", self.config.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("apiKey", api_key),
            ],
        )?;
        Ok(url)
    }

    /// Map a response body into articles. Entries without a title or URL are dropped.
    pub fn parse_response(body: &str) -> Result<Vec<Article>> {
        let response: NewsApiResponse = serde_json::from_str(body)
            .map_err(|e| PipelineError::Parse(format!("Unexpected keyword-search response: {}", e)))?;

        let articles = response
            .articles
            .into_iter()
            .filter_map(|raw| {
                let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
                let url = raw.url.filter(|u| !u.trim().is_empty())?;
                Some(Article {
                    title,
                    summary: text::smart_truncate(raw.description.as_deref().unwrap_or("").trim(), MAX_SUMMARY_CHARS),
                    url,
                    source: raw.source.and_then(|s| s.name).filter(|n| !n.is_empty()),
                    published_at: raw.published_at.as_deref().and_then(time::parse_timestamp),
                })
            })
            .collect();

        Ok(articles)
    }
}

#[async_trait]
impl ArticleSource for NewsApiSource {
    fn source_name(&self) -> String {
        "keyword-search".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Query
    }

    async fn fetch_articles(&self, query: &str) -> Option<Vec<Article>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                warn!("Keyword-search credential not configured, skipping query '{}'", query);
                return None;
            }
        };

        let url = match self.request_url(query, api_key) {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not build keyword-search request for '{}': {}", query, e);
                return None;
            }
        };

        let body = self.fetcher.get_text(&url).await?;

        match Self::parse_response(&body) {
            Ok(articles) => {
                info!("Keyword search '{}' returned {} articles", query, articles.len());
                Some(articles)
            }
            Err(e) => {
                warn!("Discarding keyword-search response for '{}': {}", query, e);
                None
            }
        }
    }
}
