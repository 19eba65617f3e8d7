//! Streaks, consistency and focus totals, computed from the merged local snapshot.
//! Everything here is a pure function of its inputs and the day passed in as `today`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use training_utils::{FocusTag, SessionAnnotation, day::trailing_window};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub current: u32,
    pub best: u32,
}

pub fn compute_streaks(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> Streaks {
    Streaks {
        current: current_streak(days, today),
        best: best_streak(days),
    }
}

/// Consecutive trained days ending today. Not having trained yet today doesn't break the
/// streak, so the count may end yesterday instead.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let start = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|yesterday| days.contains(yesterday))
    };

    let mut streak = 0;
    let mut day = start;
    while let Some(d) = day.filter(|d| days.contains(d)) {
        streak += 1;
        day = d.checked_sub_days(Days::new(1));
    }
    streak
}

/// The longest run of consecutive trained days anywhere in the history.
pub fn best_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous.and_then(|p| p.succ_opt()) {
            Some(expected) if expected == day => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Percentage of the trailing `window_days` days (ending today) that were trained, rounded.
pub fn compute_consistency(days: &BTreeSet<NaiveDate>, today: NaiveDate, window_days: u32) -> u8 {
    let Some(window) = trailing_window(today, window_days) else {
        return 0;
    };
    let trained = days.range(window).count();
    let score = (100.0 * trained as f64 / f64::from(window_days)).round();
    score.clamp(0.0, 100.0) as u8
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusBreakdown {
    pub tag_counts: BTreeMap<FocusTag, u32>,
    pub total_minutes: u32,
    pub annotated_days: u32,
}

/// Tag counts and minutes trained over the trailing window.
pub fn focus_breakdown(
    annotations: &BTreeMap<NaiveDate, SessionAnnotation>,
    today: NaiveDate,
    window_days: u32,
) -> FocusBreakdown {
    let mut breakdown = FocusBreakdown::default();
    let Some(window) = trailing_window(today, window_days) else {
        return breakdown;
    };

    for annotation in annotations.range(window).map(|(_, annotation)| annotation) {
        breakdown.annotated_days += 1;
        breakdown.total_minutes += annotation.duration_minutes.unwrap_or(0);
        let tags: BTreeSet<FocusTag> = annotation.focus_tags.iter().copied().collect();
        for tag in tags {
            *breakdown.tag_counts.entry(tag).or_default() += 1;
        }
    }
    breakdown
}
