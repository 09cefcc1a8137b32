//! Persistent FIFO of pending mutations

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use super::mutation::{Mutation, MutationHandler, PendingMutation};
use crate::clock::Clock;
use crate::error::ApiError;
use crate::storage::{Cache, keys};

/// Queue behaviour on repeated failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncPolicy {
    /// After this many failed attempts the head is moved to the dead-letter
    /// list. `None` keeps the head forever and blocks everything behind it.
    pub max_attempts: Option<u32>,
}

/// How a drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// Queue is empty
    Completed,
    /// Head mutation failed and remains queued
    Blocked,
    /// Another drain was in progress; nothing was done
    AlreadyRunning,
}

/// Outcome of [`SyncQueue::drain`]
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    pub status: DrainStatus,
    pub applied: usize,
    pub dead_lettered: usize,
    pub remaining: usize,
    /// Error that stopped the drain, if blocked
    pub error: Option<ApiError>,
}

impl DrainReport {
    fn already_running(remaining: usize) -> Self {
        Self {
            status: DrainStatus::AlreadyRunning,
            applied: 0,
            dead_lettered: 0,
            remaining,
            error: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredQueue {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    entries: VecDeque<PendingMutation>,
}

/// Resets the in-progress flag when a drain exits, including by panic
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cache-backed mutation queue
///
/// Entries are delivered strictly in enqueue order. A failed head stays at
/// the head (with its attempt count bumped) and stops the drain, unless
/// [`SyncPolicy::max_attempts`] moves it aside.
pub struct SyncQueue {
    cache: Cache,
    clock: Clock,
    policy: SyncPolicy,
    draining: AtomicBool,
}

impl SyncQueue {
    pub fn new(cache: Cache, clock: Clock, policy: SyncPolicy) -> Self {
        Self {
            cache,
            clock,
            policy,
            draining: AtomicBool::new(false),
        }
    }

    /// Append a mutation to the tail
    pub fn enqueue(&self, mutation: Mutation) -> u64 {
        let enqueued_at = self.clock.now_utc();
        let id = self
            .cache
            .update(keys::SYNC_QUEUE, StoredQueue::default(), |queue| {
                queue.next_id += 1;
                let id = queue.next_id;
                queue.entries.push_back(PendingMutation {
                    id,
                    mutation,
                    enqueued_at,
                    attempts: 0,
                    last_error: None,
                });
                id
            });
        debug!("Queued mutation #{}", id);
        id
    }

    /// Queued mutations, head first
    pub fn pending(&self) -> Vec<PendingMutation> {
        self.load().entries.into()
    }

    pub fn len(&self) -> usize {
        self.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutations given up on under [`SyncPolicy::max_attempts`]
    pub fn dead_letters(&self) -> Vec<PendingMutation> {
        self.cache.read(keys::SYNC_DEAD_LETTERS, Vec::new())
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Deliver queued mutations in order until empty or blocked
    ///
    /// Mutations enqueued while a drain runs are picked up by the same drain.
    pub fn drain(&self, handler: &dyn MutationHandler) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress");
            return DrainReport::already_running(self.len());
        }
        let _guard = DrainGuard(&self.draining);

        let mut applied = 0;
        let mut dead_lettered = 0;

        loop {
            let Some(head) = self.load().entries.front().cloned() else {
                if applied + dead_lettered > 0 {
                    info!(
                        "Sync queue drained: {} applied, {} dead-lettered",
                        applied, dead_lettered
                    );
                }
                return DrainReport {
                    status: DrainStatus::Completed,
                    applied,
                    dead_lettered,
                    remaining: 0,
                    error: None,
                };
            };

            match handler.apply(&head.mutation) {
                Ok(()) => {
                    self.remove_head(head.id);
                    applied += 1;
                }
                Err(e) => {
                    let attempts = self.record_failure(head.id, &e);
                    if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                        warn!(
                            "Giving up on {} mutation #{} after {} attempts: {}",
                            head.mutation.kind(),
                            head.id,
                            attempts,
                            e
                        );
                        self.dead_letter_head(head.id);
                        dead_lettered += 1;
                        continue;
                    }

                    warn!(
                        "Sync blocked on {} mutation #{} (attempt {}): {}",
                        head.mutation.kind(),
                        head.id,
                        attempts,
                        e
                    );
                    return DrainReport {
                        status: DrainStatus::Blocked,
                        applied,
                        dead_lettered,
                        remaining: self.len(),
                        error: Some(e),
                    };
                }
            }
        }
    }

    fn load(&self) -> StoredQueue {
        self.cache.read(keys::SYNC_QUEUE, StoredQueue::default())
    }

    fn remove_head(&self, id: u64) {
        self.cache
            .update(keys::SYNC_QUEUE, StoredQueue::default(), |queue| {
                if queue.entries.front().is_some_and(|m| m.id == id) {
                    queue.entries.pop_front();
                }
            });
    }

    fn record_failure(&self, id: u64, error: &ApiError) -> u32 {
        self.cache
            .update(keys::SYNC_QUEUE, StoredQueue::default(), |queue| {
                match queue.entries.front_mut().filter(|m| m.id == id) {
                    Some(head) => {
                        head.attempts += 1;
                        head.last_error = Some(error.to_string());
                        head.attempts
                    }
                    None => 0,
                }
            })
    }

    fn dead_letter_head(&self, id: u64) {
        let removed = self
            .cache
            .update(keys::SYNC_QUEUE, StoredQueue::default(), |queue| {
                if queue.entries.front().is_some_and(|m| m.id == id) {
                    queue.entries.pop_front()
                } else {
                    None
                }
            });
        if let Some(entry) = removed {
            self.cache
                .update(keys::SYNC_DEAD_LETTERS, Vec::new(), |letters: &mut Vec<PendingMutation>| {
                    letters.push(entry)
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::models::Skill;
    use crate::remote::api::ProgressUpdate;
    use crate::storage::InMemoryKvStore;
    use std::sync::{Arc, Mutex};

    fn cache() -> Cache {
        Cache::new(Arc::new(InMemoryKvStore::new()), "em")
    }

    fn queue(cache: Cache, policy: SyncPolicy) -> SyncQueue {
        SyncQueue::new(cache, Clock::system(), policy)
    }

    fn update(skill: Skill, value: f64) -> Mutation {
        Mutation::ProgressUpdate(ProgressUpdate::skill(skill, value))
    }

    fn offline() -> ApiError {
        ApiError::transport("offline")
    }

    #[test]
    fn test_drain_delivers_in_order() {
        let queue = queue(cache(), SyncPolicy::default());
        queue.enqueue(update(Skill::Vocabulary, 10.0));
        queue.enqueue(update(Skill::Reading, 20.0));

        let seen = Mutex::new(Vec::new());
        let handler = |m: &Mutation| -> Result<(), ApiError> {
            seen.lock().unwrap().push(m.clone());
            Ok(())
        };
        let report = queue.drain(&handler);

        assert_eq!(report.status, DrainStatus::Completed);
        assert_eq!(report.applied, 2);
        assert!(queue.is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![update(Skill::Vocabulary, 10.0), update(Skill::Reading, 20.0)]
        );
    }

    #[test]
    fn test_failed_head_blocks_and_stays() {
        let queue = queue(cache(), SyncPolicy::default());
        let a = queue.enqueue(update(Skill::Vocabulary, 10.0));
        let b = queue.enqueue(update(Skill::Reading, 20.0));

        let calls = Mutex::new(0);
        let handler = |_: &Mutation| {
            *calls.lock().unwrap() += 1;
            Err(offline())
        };
        let report = queue.drain(&handler);

        assert_eq!(report.status, DrainStatus::Blocked);
        assert_eq!(report.remaining, 2);
        assert_eq!(*calls.lock().unwrap(), 1);

        let pending = queue.pending();
        assert_eq!(pending.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.as_deref().unwrap().contains("offline"));
        assert_eq!(pending[1].attempts, 0);
    }

    #[test]
    fn test_partial_drain() {
        let queue = queue(cache(), SyncPolicy::default());
        queue.enqueue(update(Skill::Vocabulary, 10.0));
        let b = queue.enqueue(update(Skill::Reading, 20.0));

        let first = Mutex::new(true);
        let handler = |_: &Mutation| {
            let mut first = first.lock().unwrap();
            if *first {
                *first = false;
                Ok(())
            } else {
                Err(ApiError::new(codes::RATE_LIMIT_EXCEEDED, "slow down", None))
            }
        };
        let report = queue.drain(&handler);

        assert_eq!(report.applied, 1);
        assert_eq!(report.status, DrainStatus::Blocked);
        assert_eq!(report.error.unwrap().code, codes::RATE_LIMIT_EXCEEDED);
        assert_eq!(queue.pending()[0].id, b);
    }

    #[test]
    fn test_reentrant_drain_is_noop() {
        let queue = Arc::new(queue(cache(), SyncPolicy::default()));
        queue.enqueue(update(Skill::Vocabulary, 10.0));

        let inner = Mutex::new(None);
        let q = queue.clone();
        let handler = |_: &Mutation| -> Result<(), ApiError> {
            let nested = q.drain(&|_: &Mutation| -> Result<(), ApiError> { Ok(()) });
            *inner.lock().unwrap() = Some(nested);
            Ok(())
        };
        let outer = queue.drain(&handler);

        let nested = inner.lock().unwrap().clone().unwrap();
        assert_eq!(nested.status, DrainStatus::AlreadyRunning);
        assert_eq!(nested.applied, 0);
        assert_eq!(outer.status, DrainStatus::Completed);
        assert_eq!(outer.applied, 1);
        assert!(!queue.is_draining());
    }

    #[test]
    fn test_survives_new_instance() {
        let cache = cache();
        queue(cache.clone(), SyncPolicy::default()).enqueue(update(Skill::Writing, 5.0));

        let reopened = queue(cache, SyncPolicy::default());
        assert_eq!(reopened.len(), 1);
        let id = reopened.enqueue(update(Skill::Writing, 6.0));
        assert_eq!(id, 2);
    }

    #[test]
    fn test_dead_letter_unblocks() {
        let queue = queue(
            cache(),
            SyncPolicy {
                max_attempts: Some(2),
            },
        );
        let a = queue.enqueue(update(Skill::Vocabulary, 10.0));
        queue.enqueue(update(Skill::Reading, 20.0));

        let handler = |m: &Mutation| match m {
            Mutation::ProgressUpdate(u) if u.vocabulary.is_some() => {
                Err(ApiError::new(codes::INVALID_PARAMS, "bad value", None))
            }
            _ => Ok(()),
        };

        let first = queue.drain(&handler);
        assert_eq!(first.status, DrainStatus::Blocked);
        assert_eq!(queue.len(), 2);

        let second = queue.drain(&handler);
        assert_eq!(second.status, DrainStatus::Completed);
        assert_eq!(second.dead_lettered, 1);
        assert_eq!(second.applied, 1);
        assert!(queue.is_empty());

        let letters = queue.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].id, a);
        assert_eq!(letters[0].attempts, 2);
    }
}
