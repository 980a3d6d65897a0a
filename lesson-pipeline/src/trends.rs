use crate::types::{Article, Insight};
use std::collections::HashMap;
use tracing::debug;

pub const MAX_TRENDS: usize = 5;
pub const MAX_INSIGHTS: usize = 3;
pub const DEFAULT_INSIGHT_SOURCE: &str = "Web";

/// Domain terms scanned for in fetched articles. Declaration order breaks ties.
pub const TREND_VOCABULARY: &[&str] = &[
    "Generative AI",
    "LLM",
    "AI Agents",
    "Machine Learning",
    "Deep Learning",
    "Computer Vision",
    "Data Engineering",
    "Vector Database",
    "Kubernetes",
    "Serverless",
    "Cloud Native",
    "DevOps",
    "Platform Engineering",
    "Observability",
    "Zero Trust",
    "Ransomware",
    "Supply Chain",
    "Vulnerability",
    "Open Source",
    "Rust",
    "Python",
    "Automation",
    "Privacy",
    "Regulation",
    "Quantum",
];

/// Merge articles by canonical URL.
///
/// A URL keeps the position of its first occurrence but the record of its
/// last occurrence.
pub fn dedupe_by_url(articles: Vec<Article>) -> Vec<Article> {
    let total = articles.len();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Article> = Vec::with_capacity(total);

    for article in articles {
        match positions.get(&article.url) {
            Some(&index) => unique[index] = article,
            None => {
                positions.insert(article.url.clone(), unique.len());
                unique.push(article);
            }
        }
    }

    if unique.len() < total {
        debug!("Removed {} duplicate articles", total - unique.len());
    }
    unique
}

/// Top vocabulary terms by the number of articles mentioning them.
///
/// At most [`MAX_TRENDS`] terms, highest count first, ties in vocabulary order.
/// Terms never mentioned are left out.
pub fn extract_trends(articles: &[Article], vocabulary: &[&str]) -> Vec<String> {
    let texts: Vec<String> = articles
        .iter()
        .map(|a| format!("{} {}", a.title, a.summary).to_lowercase())
        .collect();

    let mut counted: Vec<(usize, &str)> = vocabulary
        .iter()
        .map(|term| {
            let needle = term.to_lowercase();
            let count = texts.iter().filter(|text| contains_term(text, &needle)).count();
            (count, *term)
        })
        .filter(|(count, _)| *count > 0)
        .collect();

    // Stable: equal counts stay in vocabulary order.
    counted.sort_by(|a, b| b.0.cmp(&a.0));

    counted
        .into_iter()
        .take(MAX_TRENDS)
        .map(|(_, term)| term.to_string())
        .collect()
}

/// The first [`MAX_INSIGHTS`] articles as insight records.
pub fn select_insights(articles: &[Article]) -> Vec<Insight> {
    articles
        .iter()
        .take(MAX_INSIGHTS)
        .map(|article| Insight {
            headline: article.title.clone(),
            takeaway: article.summary.clone(),
            source: article
                .source
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INSIGHT_SOURCE.to_string()),
        })
        .collect()
}

/// Whole-word containment, so "edge" does not match inside "knowledge".
/// A plural suffix on either side still counts: "llms" matches "llm" and
/// "ai agent" matches "ai agents".
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let stem = needle.strip_suffix('s').filter(|s| !s.is_empty());
    std::iter::once(needle)
        .chain(stem)
        .any(|form| contains_word_form(haystack, form))
}

fn contains_word_form(haystack: &str, form: &str) -> bool {
    haystack.match_indices(form).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        if before.map_or(false, char::is_alphanumeric) {
            return false;
        }
        let tail = &haystack[start + form.len()..];
        ["", "s", "es"].iter().any(|suffix| {
            tail.strip_prefix(suffix)
                .map_or(false, |rest| !rest.chars().next().map_or(false, char::is_alphanumeric))
        })
    })
}
