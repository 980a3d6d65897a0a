use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::defs::FailureReport;
use crate::defs::FailureReporter;
use crate::defs::Lesson;
use crate::defs::LessonNotifier;

/// Notifier that only logs. Used for dry runs and when no mail transport is configured.
pub struct LogOnlyNotifier;

#[async_trait]
impl LessonNotifier for LogOnlyNotifier {
    async fn deliver(&self, lesson: &Lesson) -> Result<()> {
        info!(
            "[dry-run] lesson '{}' ({} / {}, {}, {} words) not emailed",
            lesson.title, lesson.track, lesson.subtopic, lesson.level, lesson.word_count
        );
        Ok(())
    }
}

#[async_trait]
impl FailureReporter for LogOnlyNotifier {
    async fn report(&self, report: &FailureReport) -> Result<()> {
        // Nothing to send to, the log line is the report.
        warn!("[dry-run] failure report for {}: {}", report.date, report.summary_line());
        Ok(())
    }
}
