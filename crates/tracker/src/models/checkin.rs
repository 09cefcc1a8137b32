//! Daily check-in records and task sets

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::Skill;

/// Minimum number of completed tasks before a day can be checked in
pub const MIN_TASKS_REQUIRED: usize = 3;

/// A daily learning task
///
/// Ordering follows declaration order, which is also the order tasks are
/// serialized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Vocabulary,
    Listening,
    Reading,
    Writing,
    Test,
}

impl Task {
    pub const ALL: [Task; 5] = [
        Task::Vocabulary,
        Task::Listening,
        Task::Reading,
        Task::Writing,
        Task::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Task::Vocabulary => "vocabulary",
            Task::Listening => "listening",
            Task::Reading => "reading",
            Task::Writing => "writing",
            Task::Test => "test",
        }
    }

    /// Parse a task identifier as sent by the backend
    pub fn parse(s: &str) -> Option<Self> {
        Task::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// The skill this task trains, if it maps to exactly one
    pub fn skill(self) -> Option<Skill> {
        match self {
            Task::Vocabulary => Some(Skill::Vocabulary),
            Task::Listening => Some(Skill::Listening),
            Task::Reading => Some(Skill::Reading),
            Task::Writing => Some(Skill::Writing),
            Task::Test => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's check-in record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub tasks: BTreeSet<Task>,
    #[serde(default)]
    pub study_time: u32,
    /// Creation instant, Unix epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

impl CheckinRecord {
    /// A record that only tracks study time (not yet checked in)
    pub fn pending(timestamp: i64) -> Self {
        Self {
            completed: false,
            tasks: BTreeSet::new(),
            study_time: 0,
            timestamp,
        }
    }
}

/// All check-in records keyed by local date
pub type CheckinMap = BTreeMap<NaiveDate, CheckinRecord>;

/// Completed task sets keyed by local date
///
/// Today's tasks are whatever is stored under today's date, so a set left
/// over from a previous day is never mistaken for today's.
pub type TaskLog = BTreeMap<NaiveDate, BTreeSet<Task>>;

/// Check-in state of a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    NotStarted,
    TasksInProgress,
    Eligible,
    Completed,
}

impl DayState {
    /// Derive the state from the day's record and completed task count
    pub fn derive(record: Option<&CheckinRecord>, completed_tasks: usize) -> Self {
        if record.is_some_and(|r| r.completed) {
            DayState::Completed
        } else if completed_tasks >= MIN_TASKS_REQUIRED {
            DayState::Eligible
        } else if completed_tasks > 0 {
            DayState::TasksInProgress
        } else {
            DayState::NotStarted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_serialize_in_canonical_order() {
        let record = CheckinRecord {
            completed: true,
            tasks: [Task::Reading, Task::Vocabulary, Task::Listening]
                .into_iter()
                .collect(),
            study_time: 15,
            timestamp: 1,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json["tasks"],
            serde_json::json!(["vocabulary", "listening", "reading"])
        );
        assert_eq!(json["studyTime"], 15);
    }

    #[test]
    fn test_checkin_map_uses_date_keys() {
        let mut map = CheckinMap::new();
        map.insert(
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            CheckinRecord::pending(0),
        );
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"2026-01-05\""));

        let back: CheckinMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn test_day_state_transitions() {
        assert_eq!(DayState::derive(None, 0), DayState::NotStarted);
        assert_eq!(DayState::derive(None, 2), DayState::TasksInProgress);
        assert_eq!(DayState::derive(None, 3), DayState::Eligible);

        let mut record = CheckinRecord::pending(0);
        assert_eq!(DayState::derive(Some(&record), 1), DayState::TasksInProgress);
        record.completed = true;
        assert_eq!(DayState::derive(Some(&record), 0), DayState::Completed);
    }

    #[test]
    fn test_task_parse() {
        assert_eq!(Task::parse("test"), Some(Task::Test));
        assert_eq!(Task::parse("speaking"), None);
    }
}
