//! Daily check-ins, streaks and the monthly calendar
//!
//! Per date the check-in moves through `NotStarted -> TasksInProgress ->
//! Eligible -> Completed`. The first three are derived from today's task
//! set; `Completed` is a persisted record and is never reverted.
//!
//! Today's task set is local only. It reaches the backend solely as part of
//! a check-in.

use chrono::{Datelike, NaiveDate, TimeDelta};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::context::{Context, Delivery};
use crate::error::{ApiError, CalendarError, CheckinError};
use crate::models::{CheckinMap, CheckinRecord, DayState, MIN_TASKS_REQUIRED, Task, TaskLog};
use crate::plan::completion_rate;
use crate::remote::api::{CheckinRequest, ProgressUpdate};
use crate::storage::keys;
use crate::sync::Mutation;

use super::{ProfileStore, ProgressStore};

/// Cells in a calendar grid (6 weeks of 7 days)
const CALENDAR_CELLS: usize = 42;

/// Result of [`CheckinStore::toggle_task`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub task: Task,
    /// Whether the task is now marked done
    pub completed: bool,
    pub total_completed: usize,
    pub eligible: bool,
}

/// Result of a successful [`CheckinStore::check_in`]
#[derive(Debug, Clone, PartialEq)]
pub struct CheckinOutcome {
    pub date: NaiveDate,
    pub record: CheckinRecord,
    /// Server streak if the check-in was delivered, local estimate otherwise
    pub streak: u32,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    pub checked_days: u32,
    pub missed_days: u32,
    pub total_study_time: u32,
    pub completion_rate: u32,
}

/// Classification of a calendar cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalendarTag {
    OtherMonth,
    Today,
    Future,
    Checked,
    Missed,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    /// Day of month, also for padding cells
    pub day: u32,
    pub tag: CalendarTag,
    /// `None` for cells outside the requested month
    pub date: Option<NaiveDate>,
    pub record: Option<CheckinRecord>,
}

impl CalendarDay {
    fn padding(day: u32) -> Self {
        Self {
            day,
            tag: CalendarTag::OtherMonth,
            date: None,
            record: None,
        }
    }
}

#[derive(Clone)]
pub struct CheckinStore {
    ctx: Arc<Context>,
    /// Held across the local phase of check-in and study-time updates
    lock: Arc<Mutex<()>>,
}

impl CheckinStore {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// All local check-in records
    pub fn records(&self) -> CheckinMap {
        self.ctx.cache.read(keys::CHECKINS, CheckinMap::default())
    }

    pub fn record(&self, date: NaiveDate) -> Option<CheckinRecord> {
        self.records().remove(&date)
    }

    /// Tasks marked done today
    pub fn today_tasks(&self) -> BTreeSet<Task> {
        let today = self.ctx.clock.today();
        self.ctx
            .cache
            .read(keys::TASKS, TaskLog::default())
            .remove(&today)
            .unwrap_or_default()
    }

    /// Flip a task in today's set; local only
    pub fn toggle_task(&self, task: Task) -> ToggleOutcome {
        let today = self.ctx.clock.today();
        self.ctx
            .cache
            .update(keys::TASKS, TaskLog::default(), |log| {
                log.retain(|date, _| *date >= today);
                let tasks = log.entry(today).or_default();
                let completed = if tasks.remove(&task) {
                    false
                } else {
                    tasks.insert(task)
                };
                ToggleOutcome {
                    task,
                    completed,
                    total_completed: tasks.len(),
                    eligible: tasks.len() >= MIN_TASKS_REQUIRED,
                }
            })
    }

    pub fn day_state(&self) -> DayState {
        let today = self.ctx.clock.today();
        let records = self.records();
        DayState::derive(records.get(&today), self.today_tasks().len())
    }

    pub fn is_today_checked_in(&self) -> bool {
        self.day_state() == DayState::Completed
    }

    pub fn today_study_time(&self) -> u32 {
        self.record(self.ctx.clock.today())
            .map(|r| r.study_time)
            .unwrap_or(0)
    }

    /// Check in for today
    ///
    /// Checking in twice is rejected with `AlreadyCheckedIn` and changes
    /// nothing. The record, streak and task rewards are stored locally
    /// before the backend is contacted; an unreachable backend only defers
    /// delivery.
    pub fn check_in(&self, note: &str) -> Result<CheckinOutcome, CheckinError> {
        let today = self.ctx.clock.today();

        let (record, local_streak) = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

            if self.records().get(&today).is_some_and(|r| r.completed) {
                return Err(CheckinError::AlreadyCheckedIn { date: today });
            }

            let tasks = self.today_tasks();
            if tasks.len() < MIN_TASKS_REQUIRED {
                return Err(CheckinError::InsufficientTasks {
                    completed: tasks.len(),
                    required: MIN_TASKS_REQUIRED,
                });
            }

            let now = self.ctx.clock.timestamp_millis();
            let (record, records) = self
                .ctx
                .cache
                .update(keys::CHECKINS, CheckinMap::default(), |records| {
                    let mut record = records
                        .remove(&today)
                        .unwrap_or_else(|| CheckinRecord::pending(now));
                    record.completed = true;
                    record.tasks = tasks;
                    records.insert(today, record.clone());
                    (record, records.clone())
                });

            let streak = streak_at(&records, today);
            self.ctx.update_profile(|profile| profile.streak = streak);
            (record, streak)
        };

        info!(
            "Checked in for {} with {} tasks, local streak {}",
            today,
            record.tasks.len(),
            local_streak
        );

        ProgressStore::new(self.ctx.clone()).apply_task_rewards(&record.tasks);

        let request = CheckinRequest {
            tasks: record.tasks.iter().copied().collect(),
            study_time: record.study_time,
            note: note.to_string(),
        };
        let delivery = self.ctx.submit(Mutation::Checkin(request));
        let streak = match delivery {
            Delivery::Sent => ProfileStore::new(self.ctx.clone()).get().streak,
            Delivery::Queued { .. } | Delivery::DeadLettered { .. } => local_streak,
        };

        Ok(CheckinOutcome {
            date: today,
            record,
            streak,
            delivery,
        })
    }

    /// Log study minutes against today and the cumulative total
    pub fn add_study_time(&self, minutes: u32) -> (CheckinRecord, Option<Delivery>) {
        let today = self.ctx.clock.today();
        let now = self.ctx.clock.timestamp_millis();

        let record = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let record = self
                .ctx
                .cache
                .update(keys::CHECKINS, CheckinMap::default(), |records| {
                    let record = records
                        .entry(today)
                        .or_insert_with(|| CheckinRecord::pending(now));
                    record.study_time = record.study_time.saturating_add(minutes);
                    record.clone()
                });
            self.ctx.update_profile(|profile| {
                profile.total_time = profile.total_time.saturating_add(minutes);
            });
            record
        };

        if minutes == 0 {
            return (record, None);
        }
        let delivery = self
            .ctx
            .submit(Mutation::ProgressUpdate(ProgressUpdate::study_time(minutes)));
        (record, Some(delivery))
    }

    /// Consecutive completed days ending today, or yesterday if today is open
    pub fn compute_streak(&self) -> u32 {
        streak_at(&self.records(), self.ctx.clock.today())
    }

    /// Check-in statistics for one month
    ///
    /// Only days from the plan's start date up to today count.
    pub fn monthly_stats(&self, year: i32, month: u32) -> Result<MonthlyStats, CalendarError> {
        let first = first_of_month(year, month)?;
        let today = self.ctx.clock.today();
        let start = ProfileStore::new(self.ctx.clone()).get().start_date;
        let records = self.records();

        let mut stats = MonthlyStats {
            checked_days: 0,
            missed_days: 0,
            total_study_time: 0,
            completion_rate: 0,
        };
        for date in days_of_month(first).filter(|d| *d >= start && *d <= today) {
            match records.get(&date).filter(|r| r.completed) {
                Some(record) => {
                    stats.checked_days += 1;
                    stats.total_study_time += record.study_time;
                }
                None => stats.missed_days += 1,
            }
        }
        stats.completion_rate =
            completion_rate(stats.checked_days, stats.checked_days + stats.missed_days);
        Ok(stats)
    }

    /// 42-cell Sunday-first grid for one month
    pub fn calendar_days(&self, year: i32, month: u32) -> Result<Vec<CalendarDay>, CalendarError> {
        let first = first_of_month(year, month)?;
        let today = self.ctx.clock.today();
        let start = ProfileStore::new(self.ctx.clone()).get().start_date;
        let mut records = self.records();

        let mut days = Vec::with_capacity(CALENDAR_CELLS);

        let leading = first.weekday().num_days_from_sunday();
        let previous_last = first.pred_opt().map(|d| d.day()).unwrap_or(31);
        for offset in (0..leading).rev() {
            days.push(CalendarDay::padding(previous_last - offset));
        }

        for date in days_of_month(first) {
            let record = records.remove(&date);
            let tag = if date == today {
                CalendarTag::Today
            } else if date > today {
                CalendarTag::Future
            } else if record.as_ref().is_some_and(|r| r.completed) {
                CalendarTag::Checked
            } else if date >= start {
                CalendarTag::Missed
            } else {
                CalendarTag::Normal
            };
            days.push(CalendarDay {
                day: date.day(),
                tag,
                date: Some(date),
                record,
            });
        }

        let trailing = CALENDAR_CELLS - days.len();
        for day in 1..=trailing as u32 {
            days.push(CalendarDay::padding(day));
        }

        Ok(days)
    }

    /// Merge the backend's check-in history into the local records
    ///
    /// Remote records win for the dates they cover. The server's streak
    /// replaces the local estimate. Returns the number of merged records.
    pub fn refresh_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<usize, ApiError> {
        let history = self.ctx.learning.checkin_history(start, end)?;
        let now = self.ctx.clock.timestamp_millis();

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ctx
            .cache
            .update(keys::CHECKINS, CheckinMap::default(), |records| {
                for remote in &history.records {
                    let tasks = remote
                        .tasks
                        .iter()
                        .filter_map(|name| {
                            let task = Task::parse(name);
                            if task.is_none() {
                                warn!("Ignoring unknown task {:?} in history", name);
                            }
                            task
                        })
                        .collect();
                    let timestamp = records
                        .get(&remote.checkin_date)
                        .map(|r| r.timestamp)
                        .unwrap_or(now);
                    records.insert(
                        remote.checkin_date,
                        CheckinRecord {
                            completed: true,
                            tasks,
                            study_time: remote.study_time,
                            timestamp,
                        },
                    );
                }
            });
        self.ctx
            .update_profile(|profile| profile.streak = history.current_streak);

        info!(
            "Merged {} remote check-ins, streak {}",
            history.records.len(),
            history.current_streak
        );
        Ok(history.records.len())
    }
}

/// Streak over `records` as seen on `today`
///
/// Walks back from yesterday counting completed days, plus one if today is
/// completed. An open today never breaks the streak.
pub fn streak_at(records: &CheckinMap, today: NaiveDate) -> u32 {
    let completed = |date: NaiveDate| records.get(&date).is_some_and(|r| r.completed);

    let mut streak = u32::from(completed(today));
    let mut day = today - TimeDelta::days(1);
    while completed(day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidMonth { year, month })
}

fn days_of_month(first: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let month = first.month();
    first.iter_days().take_while(move |d| d.month() == month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::remote::{CredentialStore, Credentials, RemoteClient, ScriptedTransport};
    use crate::storage::{Cache, InMemoryKvStore};
    use crate::sync::SyncPolicy;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completed(timestamp: i64) -> CheckinRecord {
        CheckinRecord {
            completed: true,
            tasks: [Task::Vocabulary, Task::Listening, Task::Reading].into_iter().collect(),
            study_time: 10,
            timestamp,
        }
    }

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        ctx: Arc<Context>,
        clock: Clock,
        store: CheckinStore,
    }

    fn fixture(today: NaiveDate) -> Fixture {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = Cache::new(Arc::new(InMemoryKvStore::new()), "em");
        let credentials = CredentialStore::new(cache.clone());
        credentials.save(&Credentials::new("token", None));
        let client = Arc::new(RemoteClient::new("http://api.test", transport.clone(), credentials));
        let clock = Clock::fixed_date(today);
        let ctx = Arc::new(Context::new(cache, clock.clone(), client, SyncPolicy::default()));
        Fixture {
            transport,
            store: CheckinStore::new(ctx.clone()),
            ctx,
            clock,
        }
    }

    #[test]
    fn test_streak_ignores_open_today() {
        let today = date(2026, 3, 10);
        let mut records = CheckinMap::new();
        for back in 1..=4 {
            records.insert(today - TimeDelta::days(back), completed(0));
        }
        assert_eq!(streak_at(&records, today), 4);

        records.insert(today, completed(0));
        assert_eq!(streak_at(&records, today), 5);
    }

    #[test]
    fn test_streak_breaks_on_gap() {
        let today = date(2026, 3, 10);
        let mut records = CheckinMap::new();
        records.insert(date(2026, 3, 9), completed(0));
        records.insert(date(2026, 3, 7), completed(0));
        let mut pending = completed(0);
        pending.completed = false;
        records.insert(date(2026, 3, 8), pending);

        assert_eq!(streak_at(&records, today), 1);
        assert_eq!(streak_at(&CheckinMap::new(), today), 0);
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let f = fixture(date(2026, 3, 10));
        f.store.toggle_task(Task::Writing);

        let on = f.store.toggle_task(Task::Reading);
        assert!(on.completed);
        assert_eq!(on.total_completed, 2);

        let off = f.store.toggle_task(Task::Reading);
        assert!(!off.completed);
        assert_eq!(off.total_completed, 1);
        assert_eq!(f.store.today_tasks(), [Task::Writing].into_iter().collect());
    }

    #[test]
    fn test_tasks_reset_on_new_day() {
        let f = fixture(date(2026, 3, 10));
        f.store.toggle_task(Task::Writing);
        f.store.toggle_task(Task::Test);

        f.clock.advance(TimeDelta::days(1));

        assert!(f.store.today_tasks().is_empty());
        assert_eq!(f.store.day_state(), DayState::NotStarted);
        let outcome = f.store.toggle_task(Task::Vocabulary);
        assert_eq!(outcome.total_completed, 1);
    }

    #[test]
    fn test_state_machine() {
        let f = fixture(date(2026, 3, 10));
        assert_eq!(f.store.day_state(), DayState::NotStarted);

        f.store.toggle_task(Task::Vocabulary);
        f.store.toggle_task(Task::Listening);
        assert_eq!(f.store.day_state(), DayState::TasksInProgress);
        assert_eq!(
            f.store.check_in(""),
            Err(CheckinError::InsufficientTasks {
                completed: 2,
                required: 3
            })
        );

        let outcome = f.store.toggle_task(Task::Reading);
        assert!(outcome.eligible);
        assert_eq!(f.store.day_state(), DayState::Eligible);

        let result = f.store.check_in("done").unwrap();
        assert!(result.record.completed);
        assert_eq!(
            result.record.tasks,
            [Task::Vocabulary, Task::Listening, Task::Reading].into_iter().collect()
        );
        assert_eq!(f.store.day_state(), DayState::Completed);
        assert!(f.store.is_today_checked_in());
    }

    #[test]
    fn test_second_check_in_changes_nothing() {
        let today = date(2026, 3, 10);
        let f = fixture(today);
        for task in [Task::Vocabulary, Task::Listening, Task::Reading] {
            f.store.toggle_task(task);
        }
        f.store.check_in("").unwrap();
        let records = f.store.records();
        let queued = f.ctx.queue.len();

        assert_eq!(
            f.store.check_in(""),
            Err(CheckinError::AlreadyCheckedIn { date: today })
        );
        assert_eq!(f.store.records(), records);
        assert_eq!(f.ctx.queue.len(), queued);
    }

    #[test]
    fn test_server_streak_wins() {
        let today = date(2026, 3, 10);
        let f = fixture(today);
        for task in [Task::Vocabulary, Task::Listening, Task::Writing] {
            f.store.toggle_task(task);
        }
        // Progress rewards, then the check-in itself
        f.transport.push_ok(json!({}));
        f.transport.push_ok(json!({
            "id": 1,
            "checkin_date": "2026-03-10",
            "tasks": ["vocabulary", "listening", "writing"],
            "study_time": 0,
            "note": "",
            "streak_days": 12
        }));

        let outcome = f.store.check_in("").unwrap();

        assert_eq!(outcome.delivery, Delivery::Sent);
        assert_eq!(outcome.streak, 12);
        assert_eq!(ProfileStore::new(f.ctx.clone()).get().streak, 12);
    }

    #[test]
    fn test_offline_check_in_keeps_local_streak() {
        let today = date(2026, 3, 10);
        let f = fixture(today);
        f.ctx.cache.update(keys::CHECKINS, CheckinMap::default(), |records| {
            records.insert(today - TimeDelta::days(1), completed(0));
        });
        for task in [Task::Vocabulary, Task::Listening, Task::Test] {
            f.store.toggle_task(task);
        }

        let outcome = f.store.check_in("").unwrap();

        assert!(matches!(outcome.delivery, Delivery::Queued { .. }));
        assert_eq!(outcome.streak, 2);
        assert_eq!(f.store.compute_streak(), 2);
        let kinds: Vec<_> = f.ctx.queue.pending().iter().map(|m| m.mutation.kind()).collect();
        assert_eq!(kinds, vec!["progress-update", "checkin"]);
    }

    #[test]
    fn test_check_in_keeps_study_time() {
        let f = fixture(date(2026, 3, 10));
        f.store.add_study_time(25);
        for task in [Task::Vocabulary, Task::Listening, Task::Reading] {
            f.store.toggle_task(task);
        }

        let outcome = f.store.check_in("").unwrap();

        assert_eq!(outcome.record.study_time, 25);
        let checkin = f
            .ctx
            .queue
            .pending()
            .into_iter()
            .find_map(|m| match m.mutation {
                Mutation::Checkin(request) => Some(request),
                _ => None,
            })
            .unwrap();
        assert_eq!(checkin.study_time, 25);
    }

    #[test]
    fn test_add_study_time_accumulates() {
        let f = fixture(date(2026, 3, 10));
        f.store.add_study_time(10);
        let (record, delivery) = f.store.add_study_time(15);

        assert_eq!(record.study_time, 25);
        assert!(!record.completed);
        assert!(delivery.is_some());
        assert_eq!(ProfileStore::new(f.ctx.clone()).get().total_time, 25);
        assert_eq!(f.store.today_study_time(), 25);
    }

    #[test]
    fn test_monthly_stats() {
        let f = fixture(date(2026, 3, 1));
        // Fix the start date
        ProfileStore::new(f.ctx.clone()).get();
        f.clock.set(date(2026, 3, 10).and_hms_opt(9, 0, 0).unwrap());
        f.ctx.cache.update(keys::CHECKINS, CheckinMap::default(), |records| {
            records.insert(date(2026, 3, 2), completed(0));
            records.insert(date(2026, 3, 5), completed(0));
            records.insert(date(2026, 3, 10), completed(0));
        });

        let stats = f.store.monthly_stats(2026, 3).unwrap();

        assert_eq!(stats.checked_days, 3);
        assert_eq!(stats.missed_days, 7);
        assert_eq!(stats.total_study_time, 30);
        assert_eq!(stats.completion_rate, 30);
    }

    #[test]
    fn test_monthly_stats_before_start_is_empty() {
        let f = fixture(date(2026, 3, 10));
        ProfileStore::new(f.ctx.clone()).get();

        let stats = f.store.monthly_stats(2026, 2).unwrap();

        assert_eq!(
            stats,
            MonthlyStats {
                checked_days: 0,
                missed_days: 0,
                total_study_time: 0,
                completion_rate: 0
            }
        );
        assert_eq!(
            f.store.monthly_stats(2026, 13),
            Err(CalendarError::InvalidMonth {
                year: 2026,
                month: 13
            })
        );
    }

    #[test]
    fn test_calendar_grid() {
        let f = fixture(date(2026, 3, 3));
        ProfileStore::new(f.ctx.clone()).get();
        f.clock.set(date(2026, 3, 10).and_hms_opt(9, 0, 0).unwrap());
        f.ctx.cache.update(keys::CHECKINS, CheckinMap::default(), |records| {
            records.insert(date(2026, 3, 4), completed(0));
        });

        // April 2026 starts on a Wednesday
        let april = f.store.calendar_days(2026, 4).unwrap();
        assert_eq!(april.len(), 42);
        assert_eq!(april[0].day, 29);
        assert_eq!(april[2].day, 31);
        assert_eq!(april[2].tag, CalendarTag::OtherMonth);
        assert_eq!(april[3].date, Some(date(2026, 4, 1)));
        assert_eq!(april[3].tag, CalendarTag::Future);

        // March 2026 starts on a Sunday
        let march = f.store.calendar_days(2026, 3).unwrap();
        assert_eq!(march[0].date, Some(date(2026, 3, 1)));
        assert_eq!(march[0].tag, CalendarTag::Normal);
        assert_eq!(march[2].tag, CalendarTag::Missed);
        assert_eq!(march[3].tag, CalendarTag::Checked);
        assert!(march[3].record.is_some());
        assert_eq!(march[9].tag, CalendarTag::Today);
        assert_eq!(march[10].tag, CalendarTag::Future);
        assert_eq!(march[31].tag, CalendarTag::OtherMonth);
        assert_eq!(march[31].day, 1);
    }

    #[test]
    fn test_refresh_history_merges() {
        let today = date(2026, 3, 10);
        let f = fixture(today);
        f.ctx.cache.update(keys::CHECKINS, CheckinMap::default(), |records| {
            let mut open = CheckinRecord::pending(7);
            open.study_time = 5;
            records.insert(date(2026, 3, 9), open);
            records.insert(date(2026, 3, 1), completed(0));
        });
        f.transport.push_ok(json!({
            "records": [
                {"id": 1, "checkin_date": "2026-03-09", "tasks": ["vocabulary", "speaking", "test"], "study_time": 40, "note": ""}
            ],
            "total_checkins": 1,
            "current_streak": 3
        }));

        let merged = f.store.refresh_history(None, None).unwrap();

        assert_eq!(merged, 1);
        let record = f.store.record(date(2026, 3, 9)).unwrap();
        assert!(record.completed);
        assert_eq!(record.study_time, 40);
        assert_eq!(record.timestamp, 7);
        assert_eq!(record.tasks, [Task::Vocabulary, Task::Test].into_iter().collect());
        assert!(f.store.record(date(2026, 3, 1)).is_some());
        assert_eq!(ProfileStore::new(f.ctx.clone()).get().streak, 3);
    }
}
