use chrono::NaiveDate;
use lesson_pipeline::digest::{assemble_lesson, count_words, escape_html, render_lesson_html};
use lesson_pipeline::llm_adapter::{build_prompt, LessonSection};
use lesson_pipeline::{fallback, AggregatedContent, ComposedLesson, ContentOrigin, Difficulty, Insight, LessonRequest};

fn composed() -> ComposedLesson {
    ComposedLesson {
        title: "Rust & <Ownership>".to_string(),
        hook: "Memory safety without a garbage collector.".to_string(),
        tags: vec!["rust".to_string(), "memory".to_string()],
        sections: vec![
            LessonSection {
                heading: "Moves".to_string(),
                body: "Values have one owner.\n\nAssignment moves them.".to_string(),
            },
            LessonSection {
                heading: "Borrows".to_string(),
                body: "References borrow without taking ownership.".to_string(),
            },
        ],
        key_takeaways: vec!["One owner at a time".to_string()],
        challenge: Some("Fix a use-after-move error.".to_string()),
    }
}

fn live_content() -> AggregatedContent {
    AggregatedContent {
        trends: vec!["Rust".to_string(), "Open Source".to_string()],
        insights: vec![Insight {
            headline: "Rust in the kernel".to_string(),
            takeaway: "Drivers go first.".to_string(),
            source: "Web".to_string(),
        }],
    }
}

fn request<'a>(content: &'a AggregatedContent) -> LessonRequest<'a> {
    LessonRequest {
        track: "Systems Programming",
        subtopic: "Ownership",
        level: Difficulty::Beginner,
        date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        content,
    }
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    assert_eq!(escape_html("plain"), "plain");
}

#[test]
fn test_word_count_covers_reader_text() {
    // hook 6 + sections (1+7, 1+5) + takeaway 5 + challenge 4
    assert_eq!(count_words(&composed()), 29);
}

#[test]
fn test_word_count_includes_section_headings() {
    let mut lesson = composed();
    let before = count_words(&lesson);
    lesson.sections[0].heading = "Moves and copies".to_string();
    assert_eq!(count_words(&lesson), before + 2);
}

#[test]
fn test_rendered_html_is_escaped_and_complete() {
    let content = live_content();
    let html = render_lesson_html(&composed(), &request(&content), ContentOrigin::Live);

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Rust &amp; &lt;Ownership&gt;"));
    assert!(!html.contains("<Ownership>"));
    assert!(html.contains("<p>Values have one owner.</p>\n<p>Assignment moves them.</p>"));
    assert!(html.contains("Key takeaways"));
    assert!(html.contains("Fix a use-after-move error."));
    assert!(html.contains("Open Source"));
    assert!(html.contains("Rust in the kernel"));
    assert!(html.contains("#memory"));
    assert!(html.contains("Tuesday, March 4, 2025"));
    assert!(html.contains("today's trending articles"));
}

#[test]
fn test_curated_footer() {
    let content = fallback::curated_content("Systems Programming");
    let html = render_lesson_html(&composed(), &request(&content), ContentOrigin::Curated);

    assert!(html.contains("curated material"));
    assert!(html.contains("Learn by building"));
}

#[test]
fn test_assembled_lesson_carries_request_fields() {
    let content = live_content();
    let lesson = assemble_lesson(&composed(), &request(&content), ContentOrigin::Live);

    assert_eq!(lesson.track, "Systems Programming");
    assert_eq!(lesson.subtopic, "Ownership");
    assert_eq!(lesson.level, Difficulty::Beginner);
    assert_eq!(lesson.title, "Rust & <Ownership>");
    assert_eq!(lesson.word_count, 29);
    assert_eq!(lesson.tags, vec!["rust", "memory"]);
    assert_eq!(lesson.origin, ContentOrigin::Live);
}

#[test]
fn test_prompt_mentions_trends_and_schema() {
    let content = live_content();
    let prompt = build_prompt(&request(&content));

    assert!(prompt.contains("Subtopic: Ownership"));
    assert!(prompt.contains("Level: Beginner"));
    assert!(prompt.contains("Rust, Open Source"));
    assert!(prompt.contains("1. Rust in the kernel (Web): Drivers go first."));
    assert!(prompt.contains("\"sections\""));
}
