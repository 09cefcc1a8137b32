//! Domain models for learning-tracker entities

mod checkin;
mod profile;
mod skill;
mod sync_state;

pub use checkin::{CheckinMap, CheckinRecord, DayState, MIN_TASKS_REQUIRED, Task, TaskLog};
pub use profile::{AssessmentHistory, AssessmentKind, AssessmentResult, PLAN_DAYS, StudyProfile};
pub use skill::{Skill, SkillProgress, clamp_skill_value};
pub use sync_state::SyncState;
