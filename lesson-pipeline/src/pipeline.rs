use crate::aggregator::TrendAggregator;
use crate::config::{AppConfig, TrackConfig};
use crate::digest::assemble_lesson;
use crate::fallback;
use crate::llm_adapter::{LessonComposer, LessonRequest};
use crate::types::{
    AggregatedContent, ContentOrigin, Difficulty, FailureReport, FailureReporter, Lesson,
    LessonArchive, LessonNotifier, PipelineError, Result,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of generating one track's lesson across both content tiers.
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated(Lesson),
    /// Both tiers failed; carries the cause of each.
    Abandoned { primary: String, fallback: String },
}

/// Two-tier lesson generation: live aggregated content first, then the
/// curated set exactly once more.
pub struct LessonGenerator {
    aggregator: Arc<TrendAggregator>,
    composer: Arc<dyn LessonComposer>,
}

impl LessonGenerator {
    pub fn new(aggregator: Arc<TrendAggregator>, composer: Arc<dyn LessonComposer>) -> Self {
        info!("Lesson generator using composer {}", composer.adapter_name());
        Self { aggregator, composer }
    }

    pub async fn generate(
        &self,
        track: &TrackConfig,
        subtopic: &str,
        level: Difficulty,
        date: NaiveDate,
    ) -> GenerationOutcome {
        let live = self.aggregator.content_for(track).await;
        let origin = if fallback::is_curated(&track.name, &live) {
            ContentOrigin::Curated
        } else {
            ContentOrigin::Live
        };

        let primary = match self.compose_tier(track, subtopic, level, date, &live, origin).await {
            Ok(lesson) => return GenerationOutcome::Generated(lesson),
            Err(e) => e,
        };
        warn!(
            "Primary generation failed for {} / {}: {}; retrying with curated content",
            track.name, subtopic, primary
        );

        // Curated content straight from the static set, bypassing cache and sources.
        let curated = fallback::curated_content(&track.name);
        match self
            .compose_tier(track, subtopic, level, date, &curated, ContentOrigin::Curated)
            .await
        {
            Ok(lesson) => GenerationOutcome::Generated(lesson),
            Err(e) => {
                error!("Fallback generation failed for {} / {}: {}", track.name, subtopic, e);
                GenerationOutcome::Abandoned {
                    primary: primary.to_string(),
                    fallback: e.to_string(),
                }
            }
        }
    }

    async fn compose_tier(
        &self,
        track: &TrackConfig,
        subtopic: &str,
        level: Difficulty,
        date: NaiveDate,
        content: &AggregatedContent,
        origin: ContentOrigin,
    ) -> Result<Lesson> {
        let request = LessonRequest {
            track: &track.name,
            subtopic,
            level,
            date,
            content,
        };
        let composed = self.composer.compose(&request).await?;
        Ok(assemble_lesson(&composed, &request, origin))
    }
}

/// Per-run tally of tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// The daily run: generate, archive and deliver one lesson per track.
pub struct LessonPipeline {
    config: Arc<AppConfig>,
    generator: LessonGenerator,
    archive: Arc<dyn LessonArchive>,
    notifier: Arc<dyn LessonNotifier>,
    reporter: Arc<dyn FailureReporter>,
}

impl LessonPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        generator: LessonGenerator,
        archive: Arc<dyn LessonArchive>,
        notifier: Arc<dyn LessonNotifier>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        Self {
            config,
            generator,
            archive,
            notifier,
            reporter,
        }
    }

    /// Run every configured track (or only `only_track`) for `date`, in order.
    ///
    /// Per-track failures are reported and never stop the remaining tracks.
    pub async fn run_for_date(&self, date: NaiveDate, only_track: Option<&str>) -> Result<RunSummary> {
        let tracks: Vec<&TrackConfig> = match only_track {
            Some(name) => {
                let track = self
                    .config
                    .track(name)
                    .ok_or_else(|| PipelineError::Config(format!("unknown track '{}'", name)))?;
                vec![track]
            }
            None => self.config.tracks.iter().collect(),
        };

        let level = Difficulty::for_date(date);
        info!("Starting lesson run for {} at {} level ({} tracks)", date, level, tracks.len());

        let mut summary = RunSummary::default();
        for track in tracks {
            if self.run_track(track, level, date).await {
                summary.delivered.push(track.name.clone());
            } else {
                summary.failed.push(track.name.clone());
            }
        }

        info!(
            "Lesson run for {} finished: {} delivered, {} failed",
            date,
            summary.delivered.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    async fn run_track(&self, track: &TrackConfig, level: Difficulty, date: NaiveDate) -> bool {
        let subtopic = track.subtopic_for(date);
        info!("Generating {} lesson for {} / {}", level, track.name, subtopic);

        let lesson = match self.generator.generate(track, &subtopic, level, date).await {
            GenerationOutcome::Generated(lesson) => lesson,
            GenerationOutcome::Abandoned { primary, fallback } => {
                self.report(FailureReport {
                    date,
                    track: track.name.clone(),
                    subtopic,
                    primary_error: primary,
                    fallback_error: Some(fallback),
                    occurred_at: Utc::now(),
                })
                .await;
                return false;
            }
        };

        if let Err(e) = self.archive.append(&lesson).await {
            error!("Failed to record lesson for {}: {}", track.name, e);
            self.report(FailureReport {
                date,
                track: track.name.clone(),
                subtopic: subtopic.clone(),
                primary_error: format!("history append failed: {}", e),
                fallback_error: None,
                occurred_at: Utc::now(),
            })
            .await;
        }

        match self.notifier.deliver(&lesson).await {
            Ok(()) => {
                info!(
                    "Delivered '{}' for {} ({} words, {} content)",
                    lesson.title,
                    track.name,
                    lesson.word_count,
                    lesson.origin.as_str()
                );
                true
            }
            Err(e) => {
                error!("Failed to deliver lesson for {}: {}", track.name, e);
                self.report(FailureReport {
                    date,
                    track: track.name.clone(),
                    subtopic,
                    primary_error: format!("delivery failed: {}", e),
                    fallback_error: None,
                    occurred_at: Utc::now(),
                })
                .await;
                false
            }
        }
    }

    async fn report(&self, report: FailureReport) {
        warn!("Reporting failure: {}", report.summary_line());
        if let Err(e) = self.reporter.report(&report).await {
            error!("Failed to send failure report for {}: {}", report.track, e);
        }
    }
}
