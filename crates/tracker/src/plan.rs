//! Study plan arithmetic: levels, expected curve and estimates

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{PLAN_DAYS, Skill, SkillProgress};

/// CEFR-style proficiency band for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub const ALL: [Level; 6] = [Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

    /// Half-open score range `[min, max)` of this level
    pub fn range(self) -> (f64, f64) {
        match self {
            Level::A1 => (0.0, 20.0),
            Level::A2 => (20.0, 40.0),
            Level::B1 => (40.0, 55.0),
            Level::B2 => (55.0, 70.0),
            Level::C1 => (70.0, 85.0),
            Level::C2 => (85.0, 100.0),
        }
    }

    /// Level for a score; anything outside every band counts as C2
    pub fn for_progress(progress: f64) -> Self {
        Level::ALL
            .into_iter()
            .find(|level| {
                let (min, max) = level.range();
                progress >= min && progress < max
            })
            .unwrap_or(Level::C2)
    }

    pub fn code(self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Target the plan aims for by default
pub const DEFAULT_TARGET: f64 = 85.0;
/// Assumed daily gain when estimating
pub const DEFAULT_DAILY_GAIN: f64 = 2.0;
/// Ceiling of the expected-progress curve
const EXPECTED_CAP: f64 = 95.0;

/// One day of the expected-progress curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedDay {
    pub day: u32,
    pub expected_progress: u32,
}

/// Expected overall score for each plan day, starting from `start`
///
/// Gains per day: 2 in week one, 1.5 in week two, 1.2 in week three and 1
/// after that. Values are rounded and capped at 95.
pub fn expected_progress(start: f64) -> Vec<ExpectedDay> {
    let mut progress = start;
    (1..=PLAN_DAYS)
        .map(|day| {
            progress += match day {
                1..=7 => 2.0,
                8..=14 => 1.5,
                15..=21 => 1.2,
                _ => 1.0,
            };
            ExpectedDay {
                day,
                expected_progress: progress.round().clamp(0.0, EXPECTED_CAP) as u32,
            }
        })
        .collect()
}

/// Score still needed to reach `target`
pub fn remaining_progress(current: f64, target: f64) -> f64 {
    (target - current).max(0.0)
}

/// Days needed to reach `target` at `daily_gain` per day
///
/// A non-positive gain yields `None` unless nothing remains.
pub fn estimate_days_to_complete(current: f64, target: f64, daily_gain: f64) -> Option<u32> {
    let remaining = remaining_progress(current, target);
    if remaining == 0.0 {
        return Some(0);
    }
    if daily_gain <= 0.0 || !daily_gain.is_finite() {
        return None;
    }
    Some((remaining / daily_gain).ceil() as u32)
}

/// The `n` lowest-scoring skills, weakest first
pub fn weakest_skills(progress: &SkillProgress, n: usize) -> Vec<(Skill, f64)> {
    let mut skills = progress.weakest();
    skills.truncate(n);
    skills
}

/// Rounded percentage of `completed` over `total`; zero when `total` is zero
pub fn completion_rate(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}
