//! Read-only progress view over the lesson history.

use crate::types::{ContentOrigin, Lesson};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStats {
    pub track: String,
    pub lessons: usize,
    pub words: usize,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonSummary {
    pub date: NaiveDate,
    pub track: String,
    pub subtopic: String,
    pub level: String,
    pub title: String,
    pub word_count: usize,
    pub tags: Vec<String>,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub generated_for: NaiveDate,
    pub total_lessons: usize,
    pub total_words: usize,
    pub current_streak_days: u32,
    pub fallback_lessons: usize,
    pub tracks: Vec<TrackStats>,
    pub levels: BTreeMap<String, usize>,
    /// Newest first.
    pub recent: Vec<LessonSummary>,
}

pub fn build_dashboard(history: &[Lesson], today: NaiveDate, recent: usize) -> DashboardView {
    let mut tracks: BTreeMap<&str, TrackStats> = BTreeMap::new();
    let mut levels: BTreeMap<String, usize> = BTreeMap::new();

    for lesson in history {
        let stats = tracks.entry(lesson.track.as_str()).or_insert_with(|| TrackStats {
            track: lesson.track.clone(),
            lessons: 0,
            words: 0,
            last_date: lesson.date,
        });
        stats.lessons += 1;
        stats.words += lesson.word_count;
        stats.last_date = stats.last_date.max(lesson.date);

        *levels.entry(lesson.level.to_string()).or_insert(0) += 1;
    }

    let mut newest_first: Vec<&Lesson> = history.iter().collect();
    newest_first.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));

    DashboardView {
        generated_for: today,
        total_lessons: history.len(),
        total_words: history.iter().map(|l| l.word_count).sum(),
        current_streak_days: current_streak(history, today),
        fallback_lessons: history.iter().filter(|l| l.origin == ContentOrigin::Curated).count(),
        tracks: tracks.into_values().collect(),
        levels,
        recent: newest_first.into_iter().take(recent).map(summarize).collect(),
    }
}

/// Consecutive days with at least one lesson, ending today or yesterday.
pub fn current_streak(history: &[Lesson], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = history.iter().map(|l| l.date).collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        day = day - Duration::days(1);
    }
    streak
}

fn summarize(lesson: &Lesson) -> LessonSummary {
    LessonSummary {
        date: lesson.date,
        track: lesson.track.clone(),
        subtopic: lesson.subtopic.clone(),
        level: lesson.level.to_string(),
        title: lesson.title.clone(),
        word_count: lesson.word_count,
        tags: lesson.tags.clone(),
        origin: lesson.origin.as_str().to_string(),
    }
}
