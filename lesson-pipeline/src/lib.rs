pub mod types;
pub mod utils;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod sources;
pub mod trends;
pub mod fallback;
pub mod cache;
pub mod aggregator;
pub mod llm_adapter;
pub mod digest;
pub mod pipeline;
pub mod state;
pub mod dashboard;

pub use types::*;
pub use config::{AppConfig, TrackConfig};
pub use fetcher::{Fetcher, RetryPolicy};
pub use parser::FeedParser;
pub use traits::{ArticleSource, SourceKind};
pub use sources::{NewsApiSource, RssFeedSource, SerpApiSource};
pub use cache::{CacheStore, ContentCache, MemoryCache};
pub use aggregator::TrendAggregator;
pub use llm_adapter::{ChatCompletionsComposer, ComposedLesson, LessonComposer, LessonRequest};
pub use pipeline::{GenerationOutcome, LessonGenerator, LessonPipeline, RunSummary};
pub use state::SqliteStore;
pub use dashboard::{build_dashboard, DashboardView};
