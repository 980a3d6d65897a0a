/// Text processing utilities
pub mod text {
    /// Truncate text to at most `max_chars` characters, preferring a sentence
    /// or word boundary.
    pub fn smart_truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let cut = text
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        let truncated = &text[..cut];

        if let Some(last_sentence) = truncated.rfind(". ") {
            truncated[..last_sentence + 1].to_string()
        } else if let Some(last_space) = truncated.rfind(' ') {
            format!("{}...", &truncated[..last_space])
        } else {
            format!("{}...", truncated)
        }
    }

    /// Extract clean text content from HTML
    pub fn extract_text_from_html(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => {
                    text.push(' ');
                    (text, true)
                }
                '>' => (text, false),
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Lowercase ASCII slug, e.g. `"Data Science & ML"` -> `"data-science-ml"`.
    pub fn slugify(text: &str) -> String {
        text.to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.domain().map(|d| d.trim_start_matches("www.").to_string()))
    }

    pub fn is_http_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, Utc};

    /// Parse the timestamp formats the search APIs and feeds hand out.
    pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_rfc2822(value))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
