//! Typed, namespace-bound facade over a [`KeyValueCache`] backend
//!
//! The facade never fails: unreadable data falls back to the caller's
//! default and backend errors are logged and swallowed, so UI-facing
//! operations always complete against whatever the cache can offer.

use log::{error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};

use super::KeyValueCache;

/// Keys persisted within a namespace
pub mod keys {
    pub const PROGRESS: &str = "progress";
    pub const CHECKINS: &str = "checkins";
    pub const TASKS: &str = "tasks";
    pub const STUDY: &str = "study";
    pub const ASSESSMENT: &str = "assessment";
    pub const SYNC_STATE: &str = "sync_state";
    pub const SYNC_QUEUE: &str = "sync_queue";
    pub const SYNC_DEAD_LETTERS: &str = "sync_dead_letters";
    pub const AUTH_TOKENS: &str = "auth_tokens";
}

/// JSON record cache bound to one namespace
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn KeyValueCache>,
    namespace: String,
    /// Serializes read-modify-write sequences issued through [`Cache::update`]
    write_lock: Arc<Mutex<()>>,
}

impl Cache {
    pub fn new(backend: Arc<dyn KeyValueCache>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read and decode `key`, returning `None` if missing or unreadable
    pub fn read_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(&self.namespace, key) {
            Ok(raw) => raw?,
            Err(e) => {
                error!("Cache read failed for {}/{}: {:#}", self.namespace, key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Discarding unreadable cache entry {}/{}: {}",
                    self.namespace, key, e
                );
                None
            }
        }
    }

    /// Read and decode `key`, falling back to `default`
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read_opt(key).unwrap_or(default)
    }

    /// Encode and store `value` under `key`
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to encode {}/{}: {}", self.namespace, key, e);
                return;
            }
        };
        if let Err(e) = self.backend.set(&self.namespace, key, &raw) {
            error!("Cache write failed for {}/{}: {:#}", self.namespace, key, e);
        }
    }

    pub fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(&self.namespace, key) {
            error!("Cache delete failed for {}/{}: {:#}", self.namespace, key, e);
        }
    }

    /// Remove every key in this cache's namespace
    pub fn clear_namespace(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.backend.clear_namespace(&self.namespace) {
            error!("Failed to clear namespace {}: {:#}", self.namespace, e);
        }
    }

    /// Atomically read, modify and write back `key`
    ///
    /// Concurrent `update` calls on clones of this cache are serialized.
    pub fn update<T, R, F>(&self, key: &str, default: T, f: F) -> R
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut value = self.read(key, default);
        let result = f(&mut value);
        self.write(key, &value);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKvStore;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    fn cache() -> (Arc<InMemoryKvStore>, Cache) {
        let backend = Arc::new(InMemoryKvStore::new());
        let cache = Cache::new(backend.clone(), "em");
        (backend, cache)
    }

    #[test]
    fn test_read_missing_returns_default() {
        let (_, cache) = cache();
        assert_eq!(cache.read(keys::PROGRESS, Counter { value: 7 }), Counter { value: 7 });
    }

    #[test]
    fn test_malformed_data_returns_default() {
        let (backend, cache) = cache();
        backend.set("em", keys::PROGRESS, "{not json").unwrap();

        assert_eq!(cache.read(keys::PROGRESS, Counter::default()), Counter::default());
        assert!(cache.read_opt::<Counter>(keys::PROGRESS).is_none());
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        let (backend, cache) = cache();
        backend.set("em", keys::PROGRESS, r#"["a", "b"]"#).unwrap();

        assert_eq!(cache.read(keys::PROGRESS, Counter { value: 1 }), Counter { value: 1 });
    }

    #[test]
    fn test_update_persists() {
        let (_, cache) = cache();
        let after = cache.update(keys::STUDY, Counter::default(), |c| {
            c.value += 2;
            c.value
        });
        assert_eq!(after, 2);
        assert_eq!(cache.read(keys::STUDY, Counter::default()).value, 2);
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let (_, cache) = cache();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        cache.update(keys::STUDY, Counter::default(), |c| c.value += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.read(keys::STUDY, Counter::default()).value, 200);
    }

    #[test]
    fn test_clear_namespace() {
        let (backend, cache) = cache();
        cache.write(keys::PROGRESS, &Counter { value: 1 });
        backend.set("other", keys::PROGRESS, "{}").unwrap();

        cache.clear_namespace();

        assert!(cache.read_opt::<Counter>(keys::PROGRESS).is_none());
        assert!(backend.get("other", keys::PROGRESS).unwrap().is_some());
    }
}
