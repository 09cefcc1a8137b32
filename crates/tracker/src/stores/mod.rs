//! Domain stores over the shared [`Context`](crate::context::Context)
//!
//! Every mutating operation persists locally first and only then talks to
//! the backend.

mod checkin;
mod profile;
mod progress;

pub use checkin::{
    CalendarDay, CalendarTag, CheckinOutcome, CheckinStore, MonthlyStats, ToggleOutcome, streak_at,
};
pub use profile::ProfileStore;
pub use progress::ProgressStore;
