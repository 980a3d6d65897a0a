use crate::types::Article;
use async_trait::async_trait;

/// What a source expects as its fetch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Free-text search query.
    Query,
    /// Syndication feed URL.
    Feed,
}

/// Trait for pulling articles from an external source (search APIs, feeds)
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Human-readable name for this source, used in logs
    fn source_name(&self) -> String;

    fn kind(&self) -> SourceKind;

    /// Fetch normalized articles for a query or feed URL.
    ///
    /// `None` means the source had nothing to contribute: missing credential,
    /// exhausted retries or an unreadable response. It is never an error.
    async fn fetch_articles(&self, target: &str) -> Option<Vec<Article>>;
}
