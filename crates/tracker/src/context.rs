//! Shared handles for the stores
//!
//! One [`Context`] per tracker instance owns the cache, clock, remote
//! client and mutation queue. Stores hold an `Arc<Context>` instead of
//! reaching for globals, so tests get full isolation from a fresh context.

use log::{debug, info};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::ApiError;
use crate::models::{StudyProfile, SyncState};
use crate::remote::{LearningApi, RemoteClient};
use crate::storage::{Cache, keys};
use crate::sync::{DrainReport, DrainStatus, Mutation, MutationHandler, SyncPolicy, SyncQueue};

/// Where a submitted mutation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the backend
    Sent,
    /// Persisted in the sync queue for a later drain
    Queued { id: u64 },
    /// Gave up after the configured number of attempts
    DeadLettered { id: u64 },
}

pub struct Context {
    pub(crate) cache: Cache,
    pub(crate) clock: Clock,
    pub(crate) client: Arc<RemoteClient>,
    pub(crate) learning: LearningApi,
    pub(crate) queue: SyncQueue,
}

impl Context {
    pub fn new(cache: Cache, clock: Clock, client: Arc<RemoteClient>, policy: SyncPolicy) -> Self {
        let learning = LearningApi::new(client.clone());
        let queue = SyncQueue::new(cache.clone(), clock.clone(), policy);
        Self {
            cache,
            clock,
            client,
            learning,
            queue,
        }
    }

    /// Deliver a mutation, queueing it if the backend cannot take it now
    ///
    /// A mutation never overtakes one already queued: with a non-empty queue
    /// it is appended and the queue is drained instead of sending directly.
    pub fn submit(&self, mutation: Mutation) -> Delivery {
        if !self.queue.is_empty() {
            let id = self.queue.enqueue(mutation);
            self.drain();
            return if self.queue.pending().iter().any(|m| m.id == id) {
                Delivery::Queued { id }
            } else if self.queue.dead_letters().iter().any(|m| m.id == id) {
                Delivery::DeadLettered { id }
            } else {
                Delivery::Sent
            };
        }

        match self.apply(&mutation) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                debug!("Deferring {} after error: {}", mutation.kind(), e);
                let id = self.queue.enqueue(mutation);
                Delivery::Queued { id }
            }
        }
    }

    /// Drain the queue against the backend and record the attempt
    pub fn drain(&self) -> DrainReport {
        let report = self.queue.drain(self);
        if report.status != DrainStatus::AlreadyRunning {
            let now = self.clock.now_utc();
            let completed = report.status == DrainStatus::Completed;
            self.cache.update(keys::SYNC_STATE, SyncState::default(), |state| {
                *state = std::mem::take(state).attempted(now, report.applied, completed);
            });
        }
        report
    }

    pub fn sync_state(&self) -> SyncState {
        self.cache.read(keys::SYNC_STATE, SyncState::default())
    }

    /// Read-modify-write the study profile, creating it on first use
    pub(crate) fn update_profile<R>(&self, f: impl FnOnce(&mut StudyProfile) -> R) -> R {
        let today = self.clock.today();
        self.cache
            .update(keys::STUDY, None, |stored: &mut Option<StudyProfile>| {
                f(stored.get_or_insert_with(|| StudyProfile::new(today)))
            })
    }
}

impl MutationHandler for Context {
    fn apply(&self, mutation: &Mutation) -> Result<(), ApiError> {
        match mutation {
            Mutation::ProgressUpdate(update) => {
                self.learning.update_progress(update)?;
            }
            Mutation::Checkin(request) => {
                if let Some(response) = self.learning.checkin(request)? {
                    info!(
                        "Check-in for {} accepted, streak {}",
                        response.checkin_date, response.streak_days
                    );
                    self.update_profile(|profile| profile.streak = response.streak_days);
                }
            }
        }
        Ok(())
    }
}
