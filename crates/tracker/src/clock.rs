//! Clock abstraction for deterministic dates in stores and tests
//!
//! All "today" decisions (check-in date, streak walk, calendar tagging) go
//! through a [`Clock`] so tests can pin the date and roll it over.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared clock handle
///
/// Clones share the same source, so advancing a fixed clock is observed by
/// every store holding a copy.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    fixed: Arc<RwLock<Option<NaiveDateTime>>>,
}

impl Clock {
    /// A clock reading the system's local time
    pub fn system() -> Self {
        Self::default()
    }

    /// A clock pinned to the given local wall time
    pub fn fixed(at: NaiveDateTime) -> Self {
        Self {
            fixed: Arc::new(RwLock::new(Some(at))),
        }
    }

    /// A clock pinned to noon on the given local date
    pub fn fixed_date(date: NaiveDate) -> Self {
        Self::fixed(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    /// Current local wall time
    pub fn now(&self) -> NaiveDateTime {
        match *self.fixed.read().unwrap_or_else(PoisonError::into_inner) {
            Some(at) => at,
            None => Local::now().naive_local(),
        }
    }

    /// Today's date in the user's local timezone
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current instant as UTC
    pub fn now_utc(&self) -> DateTime<Utc> {
        match *self.fixed.read().unwrap_or_else(PoisonError::into_inner) {
            Some(at) => at.and_utc(),
            None => Utc::now(),
        }
    }

    /// Current instant as Unix epoch milliseconds
    pub fn timestamp_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }

    /// Pin the clock to a new wall time
    pub fn set(&self, at: NaiveDateTime) {
        *self.fixed.write().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on a system clock.
    pub fn advance(&self, delta: TimeDelta) {
        let mut guard = self.fixed.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(at) = guard.as_mut() {
            *at += delta;
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
