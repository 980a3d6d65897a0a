use crate::llm_adapter::{ComposedLesson, LessonRequest};
use crate::types::{ContentOrigin, Lesson};
use crate::utils::text;
use chrono::Utc;
use std::fmt::Write;
use uuid::Uuid;

/// Build the immutable [`Lesson`] record for a composed lesson, HTML included.
pub fn assemble_lesson(composed: &ComposedLesson, request: &LessonRequest<'_>, origin: ContentOrigin) -> Lesson {
    Lesson {
        id: Uuid::new_v4(),
        date: request.date,
        track: request.track.to_string(),
        subtopic: request.subtopic.to_string(),
        level: request.level,
        title: composed.title.clone(),
        hook: composed.hook.clone(),
        content_html: render_lesson_html(composed, request, origin),
        tags: composed.tags.clone(),
        word_count: count_words(composed),
        origin,
        created_at: Utc::now(),
    }
}

/// Words the reader actually reads: hook, section headings and bodies, takeaways
/// and challenge.
pub fn count_words(composed: &ComposedLesson) -> usize {
    let sections: usize = composed
        .sections
        .iter()
        .map(|s| text::word_count(&s.heading) + text::word_count(&s.body))
        .sum();
    let takeaways: usize = composed.key_takeaways.iter().map(|t| text::word_count(t)).sum();
    let challenge = composed.challenge.as_deref().map_or(0, text::word_count);

    text::word_count(&composed.hook) + sections + takeaways + challenge
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Body paragraphs split on blank lines.
fn paragraphs(body: &str) -> String {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Self-contained HTML for the lesson email.
pub fn render_lesson_html(composed: &ComposedLesson, request: &LessonRequest<'_>, origin: ContentOrigin) -> String {
    let mut html = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html><head><meta charset=\"utf-8\"><title>{}</title></head>", escape_html(&composed.title));
    let _ = writeln!(
        html,
        "<body style=\"font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;max-width:640px;margin:0 auto;color:#222;line-height:1.55\">"
    );
    let _ = writeln!(
        html,
        "<p style=\"color:#666;font-size:13px\">{} &middot; {} &middot; {} &middot; {}</p>",
        escape_html(request.track),
        escape_html(request.subtopic),
        request.level,
        request.date.format("%A, %B %-d, %Y")
    );
    let _ = writeln!(html, "<h1 style=\"margin-bottom:4px\">{}</h1>", escape_html(&composed.title));
    let _ = writeln!(html, "<p style=\"font-size:17px;font-style:italic\">{}</p>", escape_html(&composed.hook));

    for section in &composed.sections {
        let _ = writeln!(html, "<h2 style=\"font-size:19px\">{}</h2>", escape_html(&section.heading));
        let _ = writeln!(html, "{}", paragraphs(&section.body));
    }

    if !composed.key_takeaways.is_empty() {
        let _ = writeln!(html, "<h2 style=\"font-size:19px\">Key takeaways</h2>\n<ul>");
        for takeaway in &composed.key_takeaways {
            let _ = writeln!(html, "<li>{}</li>", escape_html(takeaway));
        }
        let _ = writeln!(html, "</ul>");
    }

    if let Some(challenge) = composed.challenge.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(
            html,
            "<div style=\"background:#f4f7fb;border-left:4px solid #3b82f6;padding:10px 14px\"><strong>Today's challenge:</strong> {}</div>",
            escape_html(challenge)
        );
    }

    if !request.content.trends.is_empty() {
        let chips = request
            .content
            .trends
            .iter()
            .map(|t| {
                format!(
                    "<span style=\"display:inline-block;background:#eef;border-radius:12px;padding:2px 10px;margin:2px\">{}</span>",
                    escape_html(t)
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(html, "<h3 style=\"font-size:15px\">Trending now</h3>\n<p>{}</p>", chips);
    }

    if !request.content.insights.is_empty() {
        let _ = writeln!(html, "<h3 style=\"font-size:15px\">In the news</h3>\n<ul>");
        for insight in &request.content.insights {
            let _ = write!(html, "<li><strong>{}</strong>", escape_html(&insight.headline));
            if !insight.takeaway.is_empty() {
                let _ = write!(html, " &mdash; {}", escape_html(&insight.takeaway));
            }
            let _ = writeln!(html, " <em>({})</em></li>", escape_html(&insight.source));
        }
        let _ = writeln!(html, "</ul>");
    }

    if !composed.tags.is_empty() {
        let tags = composed
            .tags
            .iter()
            .map(|t| format!("#{}", escape_html(t)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(html, "<p style=\"color:#666;font-size:13px\">{}</p>", tags);
    }

    let footer = match origin {
        ContentOrigin::Live => "Built from today's trending articles.",
        ContentOrigin::Curated => "Built from curated material; live sources were unavailable today.",
    };
    let _ = writeln!(html, "<hr><p style=\"color:#999;font-size:12px\">{}</p>", footer);
    let _ = writeln!(html, "</body></html>");

    html
}
