use crate::fetcher::{log_label, Fetcher};
use crate::parser::FeedParser;
use crate::traits::{ArticleSource, SourceKind};
use crate::types::Article;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Syndication feed reader for RSS and Atom documents.
pub struct RssFeedSource {
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
}

impl RssFeedSource {
    /// `fetcher` should be built from `FetchConfig::relaxed()`.
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
        }
    }

    pub fn with_parser(mut self, parser: FeedParser) -> Self {
        self.parser = parser;
        self
    }
}

#[async_trait]
impl ArticleSource for RssFeedSource {
    fn source_name(&self) -> String {
        "syndication".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    async fn fetch_articles(&self, feed_url: &str) -> Option<Vec<Article>> {
        let url = match Url::parse(feed_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid feed URL {}: {}", feed_url, e);
                return None;
            }
        };

        info!("Pulling feed: {}", log_label(&url));
        let content = self.fetcher.get_text(&url).await?;

        match self.parser.parse_articles(&content, feed_url) {
            Ok(articles) => Some(articles),
            Err(e) => {
                warn!("Discarding feed {}: {}", log_label(&url), e);
                None
            }
        }
    }
}
