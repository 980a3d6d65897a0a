use crate::cache::{expiry_from_now, CacheStore};
use crate::types::{ContentOrigin, Difficulty, Lesson, LessonArchive, PipelineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite persistence: the append-only lesson history and the content cache.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One long-lived connection: runs are sequential and `sqlite::memory:`
        // databases live only as long as their connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.setup_schema().await?;
        info!("Opened lesson store at {}", database_url);
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lessons (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                track TEXT NOT NULL,
                subtopic TEXT NOT NULL,
                level TEXT NOT NULL,
                title TEXT NOT NULL,
                hook TEXT NOT NULL,
                content_html TEXT NOT NULL,
                tags TEXT NOT NULL,
                word_count INTEGER NOT NULL,
                origin TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn append_lesson(&self, lesson: &Lesson) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO lessons
                (id, date, track, subtopic, level, title, hook, content_html, tags, word_count, origin, created_at)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(lesson.id.to_string())
        .bind(lesson.date)
        .bind(&lesson.track)
        .bind(&lesson.subtopic)
        .bind(lesson.level.as_str())
        .bind(&lesson.title)
        .bind(&lesson.hook)
        .bind(&lesson.content_html)
        .bind(serde_json::to_string(&lesson.tags)?)
        .bind(lesson.word_count as i64)
        .bind(lesson.origin.as_str())
        .bind(lesson.created_at)
        .execute(&self.pool)
        .await?;

        info!("Appended lesson '{}' ({} / {}) to history", lesson.title, lesson.track, lesson.date);
        Ok(())
    }

    /// All lessons, oldest first.
    pub async fn lessons(&self) -> Result<Vec<Lesson>> {
        let rows = sqlx::query("SELECT * FROM lessons ORDER BY date, created_at")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(lesson_from_row).collect()
    }

    pub async fn lesson_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM lessons")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }
}

fn lesson_from_row(row: &SqliteRow) -> Result<Lesson> {
    let id: String = row.try_get("id")?;
    let level: String = row.try_get("level")?;
    let origin: String = row.try_get("origin")?;
    let tags: String = row.try_get("tags")?;
    let word_count: i64 = row.try_get("word_count")?;
    let date: NaiveDate = row.try_get("date")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Lesson {
        id: Uuid::parse_str(&id).map_err(|e| PipelineError::Parse(format!("bad lesson id {}: {}", id, e)))?,
        date,
        track: row.try_get("track")?,
        subtopic: row.try_get("subtopic")?,
        level: Difficulty::parse(&level)
            .ok_or_else(|| PipelineError::Parse(format!("unknown level '{}'", level)))?,
        title: row.try_get("title")?,
        hook: row.try_get("hook")?,
        content_html: row.try_get("content_html")?,
        tags: serde_json::from_str(&tags)?,
        word_count: word_count.max(0) as usize,
        origin: match origin.as_str() {
            "curated" => ContentOrigin::Curated,
            _ => ContentOrigin::Live,
        },
        created_at,
    })
}

#[async_trait]
impl LessonArchive for SqliteStore {
    async fn append(&self, lesson: &Lesson) -> anyhow::Result<()> {
        Ok(self.append_lesson(lesson).await?)
    }

    async fn history(&self) -> anyhow::Result<Vec<Lesson>> {
        Ok(self.lessons().await?)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, expires_at FROM cache_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let expires_at: i64 = row.try_get("expires_at")?;
        if expires_at > Utc::now().timestamp() {
            Ok(Some(row.try_get("value")?))
        } else {
            debug!("Dropping expired cache entry {}", key);
            sqlx::query("DELETE FROM cache_entries WHERE key = ?1")
                .bind(key)
                .execute(&self.pool)
                .await?;
            Ok(None)
        }
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key)
            DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expiry_from_now(ttl_seconds).timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
