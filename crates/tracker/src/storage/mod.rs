//! Storage traits and implementations
//!
//! This module defines the key-value abstraction backing the offline cache.
//! The trait-based design allows swapping between in-memory and SQLite
//! backends; stores only ever talk to the typed [`Cache`] facade.

mod cache;
mod memory;
mod sqlite;
mod traits;

pub use cache::{Cache, keys};
pub use memory::InMemoryKvStore;
pub use sqlite::SqliteKvStore;
pub use traits::KeyValueCache;
