//! Sync state tracking for the pending-mutation queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracks when the queue was last drained
///
/// Persisted alongside the queue so the cooldown between automatic drains
/// survives restarts. Only one SyncState per cache namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// When a drain last ran to completion (queue emptied)
    pub last_sync_at: Option<DateTime<Utc>>,
    /// When a drain was last attempted, successful or not
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Mutations delivered over the lifetime of this cache
    #[serde(default)]
    pub mutations_applied: u64,
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub sync_version: u32,
}

fn default_version() -> u32 {
    1
}

impl SyncState {
    /// Record a drain attempt
    pub fn attempted(mut self, at: DateTime<Utc>, applied: usize, completed: bool) -> Self {
        self.last_attempt_at = Some(at);
        self.mutations_applied += applied as u64;
        if completed {
            self.last_sync_at = Some(at);
        }
        self
    }

    /// Check if the last completed sync is recent enough to skip a refresh
    pub fn is_recent(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        self.last_sync_at
            .is_some_and(|at| (now - at).num_seconds() < max_age_secs)
    }
}
