//! Skill progress aggregate

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five tracked language skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Vocabulary,
    Listening,
    Reading,
    Writing,
    Speaking,
}

impl Skill {
    pub const ALL: [Skill; 5] = [
        Skill::Vocabulary,
        Skill::Listening,
        Skill::Reading,
        Skill::Writing,
        Skill::Speaking,
    ];

    /// Weight of this skill in the overall score
    pub fn weight(self) -> f64 {
        0.2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Skill::Vocabulary => "vocabulary",
            Skill::Listening => "listening",
            Skill::Reading => "reading",
            Skill::Writing => "writing",
            Skill::Speaking => "speaking",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw skill value into [0, 100]
///
/// Non-finite input (NaN) is treated as zero; infinities saturate.
pub fn clamp_skill_value(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Per-skill progress values plus the derived overall score
///
/// `overall` is a pure function of the five skill values. It is serialized
/// for the benefit of readers of the cache, but always recomputed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredProgress")]
pub struct SkillProgress {
    pub vocabulary: f64,
    pub listening: f64,
    pub reading: f64,
    pub writing: f64,
    pub speaking: f64,
    overall: u32,
}

/// Serialized shape; `overall` is accepted and discarded
#[derive(Deserialize)]
struct StoredProgress {
    #[serde(default)]
    vocabulary: f64,
    #[serde(default)]
    listening: f64,
    #[serde(default)]
    reading: f64,
    #[serde(default)]
    writing: f64,
    #[serde(default)]
    speaking: f64,
}

impl From<StoredProgress> for SkillProgress {
    fn from(stored: StoredProgress) -> Self {
        SkillProgress::new(
            stored.vocabulary,
            stored.listening,
            stored.reading,
            stored.writing,
            stored.speaking,
        )
    }
}

impl Default for SkillProgress {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

impl SkillProgress {
    /// Build a progress record, clamping every value
    pub fn new(vocabulary: f64, listening: f64, reading: f64, writing: f64, speaking: f64) -> Self {
        let mut progress = Self {
            vocabulary: clamp_skill_value(vocabulary),
            listening: clamp_skill_value(listening),
            reading: clamp_skill_value(reading),
            writing: clamp_skill_value(writing),
            speaking: clamp_skill_value(speaking),
            overall: 0,
        };
        progress.recompute();
        progress
    }

    pub fn get(&self, skill: Skill) -> f64 {
        match skill {
            Skill::Vocabulary => self.vocabulary,
            Skill::Listening => self.listening,
            Skill::Reading => self.reading,
            Skill::Writing => self.writing,
            Skill::Speaking => self.speaking,
        }
    }

    /// Set one skill (clamped) and recompute `overall`
    pub fn set(&mut self, skill: Skill, value: f64) {
        let value = clamp_skill_value(value);
        match skill {
            Skill::Vocabulary => self.vocabulary = value,
            Skill::Listening => self.listening = value,
            Skill::Reading => self.reading = value,
            Skill::Writing => self.writing = value,
            Skill::Speaking => self.speaking = value,
        }
        self.recompute();
    }

    /// Weighted average of all skills, rounded to the nearest integer
    pub fn overall(&self) -> u32 {
        self.overall
    }

    /// Skills ordered weakest first
    pub fn weakest(&self) -> Vec<(Skill, f64)> {
        let mut skills: Vec<(Skill, f64)> = Skill::ALL.iter().map(|&s| (s, self.get(s))).collect();
        skills.sort_by(|a, b| a.1.total_cmp(&b.1));
        skills
    }

    fn recompute(&mut self) {
        let total: f64 = Skill::ALL.iter().map(|&s| self.get(s) * s.weight()).sum();
        self.overall = total.round() as u32;
    }
}
