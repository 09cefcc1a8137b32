//! Study profile and assessment history

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Length of the study plan in days
pub const PLAN_DAYS: u32 = 30;

/// Cumulative study data for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProfile {
    /// Date of first use; never changes once set
    pub start_date: NaiveDate,
    /// Latest known streak (local estimate or server value)
    #[serde(default)]
    pub streak: u32,
    /// Cumulative study minutes
    #[serde(default)]
    pub total_time: u32,
    #[serde(default)]
    pub words_learned: u32,
}

impl StudyProfile {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            streak: 0,
            total_time: 0,
            words_learned: 0,
        }
    }

    /// Day number within the plan, clamped to 1..=30
    pub fn current_day(&self, today: NaiveDate) -> u32 {
        let elapsed = (today - self.start_date).num_days() + 1;
        elapsed.clamp(1, PLAN_DAYS as i64) as u32
    }
}

/// Assessment checkpoints within the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Initial,
    Week1,
    Week2,
    Week3,
    Final,
}

/// A saved assessment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub date: NaiveDate,
    pub timestamp: i64,
    /// Result payload as produced by the assessment UI
    pub result: Value,
}

/// Results keyed by checkpoint; unset checkpoints are `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentHistory {
    #[serde(default)]
    pub initial: Option<AssessmentResult>,
    #[serde(default)]
    pub week1: Option<AssessmentResult>,
    #[serde(default)]
    pub week2: Option<AssessmentResult>,
    #[serde(default)]
    pub week3: Option<AssessmentResult>,
    #[serde(default, rename = "final")]
    pub final_: Option<AssessmentResult>,
}

impl AssessmentHistory {
    pub fn get(&self, kind: AssessmentKind) -> Option<&AssessmentResult> {
        self.slot(kind).as_ref()
    }

    pub fn set(&mut self, kind: AssessmentKind, result: AssessmentResult) {
        *self.slot_mut(kind) = Some(result);
    }

    fn slot(&self, kind: AssessmentKind) -> &Option<AssessmentResult> {
        match kind {
            AssessmentKind::Initial => &self.initial,
            AssessmentKind::Week1 => &self.week1,
            AssessmentKind::Week2 => &self.week2,
            AssessmentKind::Week3 => &self.week3,
            AssessmentKind::Final => &self.final_,
        }
    }

    fn slot_mut(&mut self, kind: AssessmentKind) -> &mut Option<AssessmentResult> {
        match kind {
            AssessmentKind::Initial => &mut self.initial,
            AssessmentKind::Week1 => &mut self.week1,
            AssessmentKind::Week2 => &mut self.week2,
            AssessmentKind::Week3 => &mut self.week3,
            AssessmentKind::Final => &mut self.final_,
        }
    }
}
