//! Hand-authored content used when live acquisition comes back empty, and as
//! the second generation tier.

use crate::types::{AggregatedContent, Insight};

const GENERIC_TRENDS: &[&str] = &[
    "AI-Assisted Development",
    "Cloud Cost Optimization",
    "Platform Engineering",
];

const CURATED_TRENDS: &[(&str, &[&str])] = &[
    (
        "Data Science & ML",
        &["AutoML", "Explainable AI (XAI)", "Edge ML"],
    ),
    (
        "Cloud & DevOps",
        &["GitOps", "Platform Engineering", "FinOps"],
    ),
    (
        "Cybersecurity",
        &["Zero Trust", "Software Supply Chain Security", "Passkeys"],
    ),
    (
        "Web Development",
        &["Server Components", "Edge Rendering", "WebAssembly"],
    ),
];

const GENERIC_INSIGHTS: &[(&str, &str)] = &[
    (
        "Fundamentals outlast frameworks",
        "Tools change every year; the underlying concepts you practise today keep paying off.",
    ),
    (
        "Small daily practice compounds",
        "Ten focused minutes a day beats an occasional marathon session for long-term retention.",
    ),
    (
        "Learn by building",
        "Applying a concept to a tiny project of your own is the fastest way to find the gaps in your understanding.",
    ),
];

const CURATED_SOURCE: &str = "Curated";

/// Trend phrases for a track, or the generic set for unlisted tracks.
pub fn curated_trends(topic: &str) -> Vec<String> {
    CURATED_TRENDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic.trim()))
        .map(|(_, trends)| *trends)
        .unwrap_or(GENERIC_TRENDS)
        .iter()
        .map(|t| t.to_string())
        .collect()
}

pub fn curated_insights() -> Vec<Insight> {
    GENERIC_INSIGHTS
        .iter()
        .map(|(headline, takeaway)| Insight {
            headline: headline.to_string(),
            takeaway: takeaway.to_string(),
            source: CURATED_SOURCE.to_string(),
        })
        .collect()
}

pub fn curated_content(topic: &str) -> AggregatedContent {
    AggregatedContent {
        trends: curated_trends(topic),
        insights: curated_insights(),
    }
}

/// Whether `content` is exactly the curated set for `topic`.
pub fn is_curated(topic: &str, content: &AggregatedContent) -> bool {
    *content == curated_content(topic)
}
