#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use lesson_pipeline::config::TrackConfig;
use lesson_pipeline::llm_adapter::LessonSection;
use lesson_pipeline::{
    AggregatedContent, Article, ArticleSource, ComposedLesson, FailureReport, FailureReporter, FetchConfig,
    Lesson, LessonArchive, LessonComposer, LessonNotifier, LessonRequest, PipelineError, SourceKind,
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fast retries so failing-endpoint tests stay quick.
pub fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        user_agent: "Lesson-Pipeline-Test/1.0".to_string(),
        timeout_seconds: 5,
        max_retries: 3,
        retry_base_delay_ms: 1,
        ..FetchConfig::default()
    }
}

/// Minimal HTTP/1.1 server answering every request with one canned response.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub async fn start(status: u16, content_type: &'static str, body: &str) -> Self {
        Self::spawn(status, content_type, body, String::new()).await
    }

    /// Answers every request with a 301 pointing at `to`.
    pub async fn redirect(to: &str) -> Self {
        Self::spawn(301, "text/plain", "", format!("Location: {}\r\n", to)).await
    }

    async fn spawn(status: u16, content_type: &'static str, body: &str, extra_headers: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let hits = Arc::new(AtomicUsize::new(0));

        let body = body.to_string();
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let body = body.clone();
                let extra_headers = extra_headers.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, status, content_type, &extra_headers, &body, &counter).await;
                });
            }
        });

        Self { addr, hits }
    }

    pub async fn json(body: &str) -> Self {
        Self::start(200, "application/json", body).await
    }

    pub async fn xml(body: &str) -> Self {
        Self::start(200, "application/xml", body).await
    }

    pub async fn failing() -> Self {
        Self::start(500, "text/plain", "internal error").await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve(
    mut stream: TcpStream,
    status: u16,
    content_type: &str,
    extra_headers: &str,
    body: &str,
    hits: &AtomicUsize,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];

    // Headers, then as much body as Content-Length announces.
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&request) {
            break pos;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + 4 + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }

    hits.fetch_add(1, Ordering::SeqCst);

    let reason = match status {
        300..=399 => "Moved Permanently",
        400..=599 => "Error",
        _ => "OK",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        content_type,
        extra_headers,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

pub fn article(title: &str, summary: &str, url: &str) -> Article {
    Article {
        title: title.to_string(),
        summary: summary.to_string(),
        url: url.to_string(),
        source: None,
        published_at: None,
    }
}

pub fn track(name: &str, queries: &[&str], feeds: &[&str]) -> TrackConfig {
    TrackConfig {
        name: name.to_string(),
        subtopics: vec!["Foundations".to_string(), "Practice".to_string()],
        queries: queries.iter().map(|s| s.to_string()).collect(),
        feeds: feeds.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Source double returning a fixed result and recording every target it was asked for.
pub struct StaticSource {
    name: String,
    kind: SourceKind,
    result: Option<Vec<Article>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticSource {
    pub fn new(name: &str, kind: SourceKind, result: Option<Vec<Article>>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded targets.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch_articles(&self, target: &str) -> Option<Vec<Article>> {
        self.calls.lock().unwrap().push(target.to_string());
        self.result.clone()
    }
}

pub fn sample_composed(title: &str) -> ComposedLesson {
    ComposedLesson {
        title: title.to_string(),
        hook: "Why this matters today.".to_string(),
        tags: vec!["learning".to_string()],
        sections: vec![
            LessonSection {
                heading: "The idea".to_string(),
                body: "A short explanation of the core idea.".to_string(),
            },
            LessonSection {
                heading: "In practice".to_string(),
                body: "How teams apply it.".to_string(),
            },
        ],
        key_takeaways: vec!["Start small".to_string()],
        challenge: Some("Try it on a toy project.".to_string()),
    }
}

/// Composer double that plays back scripted results, then succeeds.
pub struct ScriptedComposer {
    script: Mutex<VecDeque<Result<ComposedLesson, String>>>,
    seen: Arc<Mutex<Vec<AggregatedContent>>>,
}

impl ScriptedComposer {
    pub fn new(script: Vec<Result<ComposedLesson, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn always_failing() -> Self {
        let failures = (0..32).map(|i| Err(format!("composer outage #{}", i))).collect();
        Self::new(failures)
    }

    /// Content handed to each compose call, in order.
    pub fn seen(&self) -> Arc<Mutex<Vec<AggregatedContent>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl LessonComposer for ScriptedComposer {
    fn adapter_name(&self) -> String {
        "scripted".to_string()
    }

    async fn compose(&self, request: &LessonRequest<'_>) -> lesson_pipeline::Result<ComposedLesson> {
        self.seen.lock().unwrap().push(request.content.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(lesson)) => Ok(lesson),
            Some(Err(message)) => Err(PipelineError::InvalidLesson(message)),
            None => Ok(sample_composed(&format!("{} lesson", request.subtopic))),
        }
    }
}

#[derive(Default)]
pub struct RecordingArchive {
    pub lessons: Mutex<Vec<Lesson>>,
}

#[async_trait]
impl LessonArchive for RecordingArchive {
    async fn append(&self, lesson: &Lesson) -> anyhow::Result<()> {
        self.lessons.lock().unwrap().push(lesson.clone());
        Ok(())
    }

    async fn history(&self) -> anyhow::Result<Vec<Lesson>> {
        Ok(self.lessons.lock().unwrap().clone())
    }
}

/// Notifier double; fails for one named track when asked to.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<Lesson>>,
    pub fail_for_track: Option<String>,
}

#[async_trait]
impl LessonNotifier for RecordingNotifier {
    async fn deliver(&self, lesson: &Lesson) -> anyhow::Result<()> {
        if self.fail_for_track.as_deref() == Some(lesson.track.as_str()) {
            anyhow::bail!("mailbox unavailable");
        }
        self.delivered.lock().unwrap().push(lesson.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<FailureReport>>,
}

#[async_trait]
impl FailureReporter for RecordingReporter {
    async fn report(&self, report: &FailureReport) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}
