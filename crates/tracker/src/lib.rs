//! Tracker crate - Offline-first core of the English Mastery learning tracker
//!
//! This crate provides platform-independent tracking logic including:
//! - Domain models (skill progress, check-in records, study profile)
//! - A namespaced key-value cache with SQLite and in-memory backends
//! - An authenticated client for the learning backend with token refresh
//! - A persistent queue that replays failed writes in order
//! - Progress, check-in and profile stores that write locally first
//!
//! This crate has zero UI dependencies. A UI layer drives it through
//! [`Tracker`] and receives logs through [`logging::set_log_callback`].

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod remote;
pub mod storage;
pub mod stores;
pub mod sync;
mod tracker;

pub use clock::Clock;
pub use config::TrackerConfig;
pub use context::{Context, Delivery};
pub use error::{ApiError, ApiErrorKind, CalendarError, CheckinError};
pub use models::{
    AssessmentHistory, AssessmentKind, AssessmentResult, CheckinMap, CheckinRecord, DayState,
    MIN_TASKS_REQUIRED, PLAN_DAYS, Skill, SkillProgress, StudyProfile, SyncState, Task,
};
pub use plan::{Level, completion_rate, estimate_days_to_complete, expected_progress, weakest_skills};
pub use remote::{AuthApi, CredentialStore, LearningApi, RemoteClient, SessionListener};
pub use storage::{Cache, InMemoryKvStore, KeyValueCache, SqliteKvStore};
pub use stores::{
    CalendarDay, CalendarTag, CheckinOutcome, CheckinStore, MonthlyStats, ProfileStore, ProgressStore,
    ToggleOutcome,
};
pub use sync::{DrainReport, DrainStatus, Mutation, PendingMutation, SyncPolicy, SyncQueue};
pub use tracker::{RefreshReport, Tracker};
