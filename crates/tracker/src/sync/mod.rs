//! Offline mutation queue
//!
//! Mutations that could not reach the backend are persisted in the cache
//! and replayed in FIFO order once connectivity returns.

mod mutation;
mod queue;
mod timing;

pub use mutation::{Mutation, MutationHandler, PendingMutation};
pub use queue::{DrainReport, DrainStatus, SyncPolicy, SyncQueue};
pub use timing::cooldown_elapsed;
