use crate::types::{Article, PipelineError, Result};
use crate::utils::{text, url};
use feed_rs::model::{Entry, FeedType};
use feed_rs::parser;
use std::cmp::Reverse;
use tracing::{debug, info};

pub const DEFAULT_MAX_ENTRIES: usize = 5;
const MAX_SUMMARY_CHARS: usize = 400;

/// The two supported syndication dialects, told apart by the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDialect {
    /// `<rss>` / `<rdf:RDF>` documents made of `<item>` elements.
    ItemBased,
    /// `<feed>` documents made of `<entry>` elements.
    EntryBased,
}

impl FeedDialect {
    pub fn from_feed_type(feed_type: &FeedType) -> Option<Self> {
        match feed_type {
            FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => Some(FeedDialect::ItemBased),
            FeedType::Atom => Some(FeedDialect::EntryBased),
            FeedType::JSON => None,
        }
    }
}

pub struct FeedParser {
    max_entries: usize,
}

impl FeedParser {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Parse a feed document into at most `max_entries` of its most recent,
    /// titled entries.
    pub fn parse_articles(&self, content: &str, feed_url: &str) -> Result<Vec<Article>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

        let dialect = FeedDialect::from_feed_type(&feed.feed_type).ok_or_else(|| {
            PipelineError::Parse(format!("Unsupported feed dialect: {:?}", feed.feed_type))
        })?;

        let source_label = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| url::extract_domain(feed_url));

        let mut entries = feed.entries;
        // Stable sort, so undated entries keep document order behind the dated ones.
        entries.sort_by_key(|entry| Reverse(entry.published.or(entry.updated)));

        let articles: Vec<Article> = entries
            .into_iter()
            .filter_map(|entry| Self::convert_entry(entry, source_label.as_deref()))
            .take(self.max_entries)
            .collect();

        info!("Parsed {:?} feed {} into {} articles", dialect, feed_url, articles.len());
        Ok(articles)
    }

    fn convert_entry(entry: Entry, source_label: Option<&str>) -> Option<Article> {
        let title = entry
            .title
            .map(|t| text::extract_text_from_html(&t.content))
            .filter(|t| !t.is_empty());

        let title = match title {
            Some(title) => title,
            None => {
                debug!("Skipping untitled feed entry {}", entry.id);
                return None;
            }
        };

        let link = entry
            .links
            .iter()
            .find(|link| link.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|link| link.href.clone())
            .or_else(|| url::is_http_url(&entry.id).then(|| entry.id.clone()));

        let link = match link {
            Some(link) => link,
            None => {
                debug!("Skipping feed entry without a link: {}", title);
                return None;
            }
        };

        let raw_summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();
        let summary = text::smart_truncate(&text::extract_text_from_html(&raw_summary), MAX_SUMMARY_CHARS);

        Some(Article {
            title,
            summary,
            url: link,
            source: source_label.map(str::to_string),
            published_at: entry.published.or(entry.updated),
        })
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}
