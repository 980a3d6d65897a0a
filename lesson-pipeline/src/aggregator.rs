use crate::cache::ContentCache;
use crate::config::{AggregationConfig, TrackConfig};
use crate::fallback;
use crate::traits::{ArticleSource, SourceKind};
use crate::trends::{self, TREND_VOCABULARY};
use crate::types::{AggregatedContent, Article};
use tracing::{info, warn};

/// Merges every source's articles for a track into [`AggregatedContent`],
/// falling back to curated content when nothing usable comes back.
pub struct TrendAggregator {
    sources: Vec<Box<dyn ArticleSource>>,
    cache: ContentCache,
    limits: AggregationConfig,
}

impl TrendAggregator {
    pub fn new(sources: Vec<Box<dyn ArticleSource>>, cache: ContentCache, limits: AggregationConfig) -> Self {
        for source in &sources {
            info!("Registered {:?} source: {}", source.kind(), source.source_name());
        }
        Self { sources, cache, limits }
    }

    /// Cached content for the track, or a fresh aggregation that is then cached.
    pub async fn content_for(&self, track: &TrackConfig) -> AggregatedContent {
        if let Some(content) = self.cache.get(&track.name).await {
            return content;
        }

        let articles = self.collect_articles(track).await;
        let content = Self::build_content(&track.name, articles);

        self.cache.put(&track.name, &content).await;
        content
    }

    /// Query each source for the track's first queries and feeds, in order,
    /// and merge the results by URL.
    pub async fn collect_articles(&self, track: &TrackConfig) -> Vec<Article> {
        let mut collected: Vec<Article> = Vec::new();

        for query in track.queries.iter().take(self.limits.max_queries) {
            collected.extend(self.fetch_from(SourceKind::Query, query).await);
        }

        for feed in track.feeds.iter().take(self.limits.max_feeds) {
            collected.extend(self.fetch_from(SourceKind::Feed, feed).await);
        }

        let merged = trends::dedupe_by_url(collected);
        info!("Collected {} unique articles for {}", merged.len(), track.name);
        merged
    }

    async fn fetch_from(&self, kind: SourceKind, target: &str) -> Vec<Article> {
        let mut articles = Vec::new();
        for source in self.sources.iter().filter(|s| s.kind() == kind) {
            match source.fetch_articles(target).await {
                Some(found) => articles.extend(found),
                None => warn!("{} contributed nothing for '{}'", source.source_name(), target),
            }
        }
        articles
    }

    /// Trends and insights from live articles, or the curated set when there are none.
    pub fn build_content(topic: &str, articles: Vec<Article>) -> AggregatedContent {
        if articles.is_empty() {
            warn!("No live articles for {}, using curated fallback", topic);
            return fallback::curated_content(topic);
        }

        AggregatedContent {
            trends: trends::extract_trends(&articles, TREND_VOCABULARY),
            insights: trends::select_insights(&articles),
        }
    }
}
