mod common;

use common::{article, init_tracing, track, StaticSource};
use lesson_pipeline::config::AggregationConfig;
use lesson_pipeline::trends::{dedupe_by_url, extract_trends, select_insights, TREND_VOCABULARY};
use lesson_pipeline::{
    fallback, AggregatedContent, Article, ArticleSource, CacheStore, ContentCache, MemoryCache, Result, SourceKind,
    TrendAggregator,
};
use std::sync::Arc;

fn aggregator(sources: Vec<Box<dyn ArticleSource>>) -> (TrendAggregator, Arc<MemoryCache>) {
    let store = Arc::new(MemoryCache::new());
    let cache = ContentCache::new(store.clone(), 3600);
    (TrendAggregator::new(sources, cache, AggregationConfig::default()), store)
}

fn json_keys(content: &AggregatedContent) -> Vec<String> {
    let value = serde_json::to_value(content).expect("serializable");
    let mut keys: Vec<String> = value.as_object().expect("object").keys().cloned().collect();
    keys.sort();
    keys
}

#[test]
fn test_dedup_keeps_last_record_per_url() {
    let articles = vec![
        article("first", "", "https://x/1"),
        article("other", "", "https://x/2"),
        article("second", "", "https://x/1"),
        article("third", "", "https://x/1"),
    ];

    let merged = dedupe_by_url(articles);

    assert_eq!(merged.len(), 2);
    let x1: Vec<&Article> = merged.iter().filter(|a| a.url == "https://x/1").collect();
    assert_eq!(x1.len(), 1);
    assert_eq!(x1[0].title, "third");
}

#[tokio::test]
async fn test_mixed_duplicate_sources_keep_later_record() {
    init_tracing();

    let source_a = StaticSource::new(
        "A",
        SourceKind::Query,
        Some(vec![article("From A", "", "https://x/1")]),
    );
    let source_b = StaticSource::new(
        "B",
        SourceKind::Query,
        Some(vec![article("From B", "", "https://x/1")]),
    );
    let (aggregator, _) = aggregator(vec![Box::new(source_a), Box::new(source_b)]);

    let merged = aggregator.collect_articles(&track("Topic", &["q1"], &[])).await;

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].title, "From B");
}

#[tokio::test]
async fn test_empty_sources_use_curated_fallback() {
    init_tracing();

    let (aggregator, _) = aggregator(vec![
        Box::new(StaticSource::new("keyword", SourceKind::Query, Some(Vec::new()))),
        Box::new(StaticSource::new("web", SourceKind::Query, None)),
        Box::new(StaticSource::new("feeds", SourceKind::Feed, Some(Vec::new()))),
    ]);

    let content = aggregator
        .content_for(&track("Data Science & ML", &["ml"], &["https://feeds.example.com/ml"]))
        .await;

    assert_eq!(content.trends, vec!["AutoML", "Explainable AI (XAI)", "Edge ML"]);
    let headlines: Vec<&str> = content.insights.iter().map(|i| i.headline.as_str()).collect();
    assert_eq!(
        headlines,
        vec!["Fundamentals outlast frameworks", "Small daily practice compounds", "Learn by building"]
    );
    assert!(fallback::is_curated("Data Science & ML", &content));
}

#[test]
fn test_unlisted_topic_gets_generic_trends() {
    let content = fallback::curated_content("Underwater Basket Weaving");
    assert_eq!(content.trends, fallback::curated_trends("Anything Else"));
    assert_eq!(content.insights.len(), 3);
}

#[test]
fn test_live_and_curated_content_share_a_shape() {
    let articles: Vec<Article> = (0..6)
        .map(|i| article(&format!("Kubernetes story {}", i), "serverless notes", &format!("https://k/{}", i)))
        .collect();

    let live = TrendAggregator::build_content("Cloud & DevOps", articles);
    let curated = TrendAggregator::build_content("Cloud & DevOps", Vec::new());

    assert_eq!(json_keys(&live), vec!["insights", "trends"]);
    assert_eq!(json_keys(&live), json_keys(&curated));
    assert!(live.insights.len() <= 3);
    assert!(curated.insights.len() <= 3);
    assert!(!fallback::is_curated("Cloud & DevOps", &live));
}

#[test]
fn test_trend_ranking_is_deterministic() {
    let articles = vec![
        article("Rust and Python", "python tooling", "https://a/1"),
        article("Python everywhere", "", "https://a/2"),
        article("Kubernetes meets Rust", "", "https://a/3"),
        article("Quantum news", "and some kubernetes", "https://a/4"),
        article("Privacy rules", "regulation ahead", "https://a/5"),
        article("Nothing relevant", "trusted builds", "https://a/6"),
    ];

    let first = extract_trends(&articles, TREND_VOCABULARY);
    let second = extract_trends(&articles, TREND_VOCABULARY);
    assert_eq!(first, second);

    // Kubernetes, Rust and Python tie at 2 and keep vocabulary order;
    // Privacy precedes Regulation and Quantum in the vocabulary too.
    assert_eq!(first, vec!["Kubernetes", "Rust", "Python", "Privacy", "Regulation"]);
}

#[test]
fn test_plural_mentions_count_toward_terms() {
    let articles = vec![
        article("New LLMs top benchmarks", "Open-source LLMs close the gap", "https://p/1"),
        article("Why LLMs hallucinate", "", "https://p/2"),
        article("Ransomware gangs shift tactics", "", "https://p/3"),
        article("Shipping an AI agent", "", "https://p/4"),
    ];

    let trends = extract_trends(&articles, TREND_VOCABULARY);
    assert_eq!(trends, vec!["LLM", "AI Agents", "Ransomware"]);
}

#[test]
fn test_ties_follow_vocabulary_order() {
    let articles = vec![article("beta and alpha", "gamma", "https://t/1")];

    assert_eq!(extract_trends(&articles, &["gamma", "alpha", "beta"]), vec!["gamma", "alpha", "beta"]);
    assert_eq!(extract_trends(&articles, &["beta", "gamma", "alpha"]), vec!["beta", "gamma", "alpha"]);
    assert!(extract_trends(&articles, &["delta"]).is_empty());
}

#[test]
fn test_at_most_five_trends() {
    let text = TREND_VOCABULARY.join(" ");
    let articles = vec![article(&text, "", "https://all/1")];

    let trends = extract_trends(&articles, TREND_VOCABULARY);
    assert_eq!(trends.len(), 5);
    assert_eq!(trends[0], TREND_VOCABULARY[0]);
}

#[test]
fn test_insights_default_source() {
    let mut with_source = article("Headline one", "Summary one", "https://i/1");
    with_source.source = Some("Wire".to_string());
    let articles = vec![
        with_source,
        article("Headline two", "", "https://i/2"),
        article("Headline three", "Summary three", "https://i/3"),
        article("Headline four", "Summary four", "https://i/4"),
    ];

    let insights = select_insights(&articles);

    assert_eq!(insights.len(), 3);
    assert_eq!(insights[0].source, "Wire");
    assert_eq!(insights[1].source, "Web");
    assert_eq!(insights[1].takeaway, "");
    assert_eq!(insights[2].headline, "Headline three");
}

#[tokio::test]
async fn test_calls_are_bounded_to_two_queries_and_two_feeds() {
    init_tracing();

    let keyword = StaticSource::new("keyword", SourceKind::Query, Some(Vec::new()));
    let web = StaticSource::new("web", SourceKind::Query, None);
    let feeds = StaticSource::new("feeds", SourceKind::Feed, Some(Vec::new()));
    let (keyword_calls, web_calls, feed_calls) = (keyword.calls(), web.calls(), feeds.calls());

    let (aggregator, _) = aggregator(vec![Box::new(keyword), Box::new(web), Box::new(feeds)]);
    let topic = track(
        "Cybersecurity",
        &["zero trust", "ransomware", "phishing"],
        &["https://f/1", "https://f/2", "https://f/3"],
    );

    aggregator.collect_articles(&topic).await;

    assert_eq!(*keyword_calls.lock().unwrap(), vec!["zero trust", "ransomware"]);
    assert_eq!(*web_calls.lock().unwrap(), vec!["zero trust", "ransomware"]);
    assert_eq!(*feed_calls.lock().unwrap(), vec!["https://f/1", "https://f/2"]);
}

#[tokio::test]
async fn test_cached_content_skips_sources() -> Result<()> {
    init_tracing();

    let source = StaticSource::new(
        "keyword",
        SourceKind::Query,
        Some(vec![article("LLM agents arrive", "AI Agents everywhere", "https://c/1")]),
    );
    let calls = source.calls();
    let (aggregator, store) = aggregator(vec![Box::new(source)]);
    let topic = track("Data Science & ML", &["agents"], &[]);

    let first = aggregator.content_for(&topic).await;
    let second = aggregator.content_for(&topic).await;

    assert_eq!(first, second);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(first.trends, vec!["LLM", "AI Agents"]);

    let key = ContentCache::key_for("Data Science & ML");
    assert_eq!(key, "trends:data-science-ml");
    assert!(store.get(&key).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_undecodable_cache_entry_is_a_miss() -> Result<()> {
    init_tracing();

    let source = StaticSource::new("keyword", SourceKind::Query, Some(Vec::new()));
    let calls = source.calls();
    let (aggregator, store) = aggregator(vec![Box::new(source)]);
    let topic = track("Cloud & DevOps", &["gitops"], &[]);

    store
        .put(&ContentCache::key_for("Cloud & DevOps"), "{not json", 3600)
        .await?;

    let content = aggregator.content_for(&topic).await;

    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(fallback::is_curated("Cloud & DevOps", &content));
    Ok(())
}
