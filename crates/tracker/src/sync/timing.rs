//! Drain cooldown management
//!
//! Pure functions so the cooldown can be tested against a fixed clock.

use chrono::{DateTime, Utc};

/// Check if enough time has elapsed since the last drain to run another.
///
/// # Arguments
/// * `last_sync_at` - When the queue was last drained to empty (None if never)
/// * `now` - Current instant
/// * `cooldown_secs` - Minimum seconds between automatic drains
///
/// # Returns
/// `true` if the cooldown has passed (or no drain ever completed)
pub fn cooldown_elapsed(
    last_sync_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown_secs: u64,
) -> bool {
    match last_sync_at {
        Some(last) => {
            (now - last).num_seconds() >= i64::try_from(cooldown_secs).unwrap_or(i64::MAX)
        }
        None => true,
    }
}
