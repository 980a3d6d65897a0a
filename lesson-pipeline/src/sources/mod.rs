pub mod news_api;
pub mod rss_feed;
pub mod serp_api;

pub use news_api::NewsApiSource;
pub use rss_feed::RssFeedSource;
pub use serp_api::SerpApiSource;
