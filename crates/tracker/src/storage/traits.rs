//! Storage trait definitions

use anyhow::Result;

/// Trait for namespaced key-value persistence
///
/// Values are opaque serialized strings (JSON in practice); interpretation
/// and invariant enforcement belong to the stores above the [`super::Cache`]
/// facade. Backends must be safe to share between threads.
pub trait KeyValueCache: Send + Sync {
    /// Get the raw value stored under `key`
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value stored under `key`
    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, namespace: &str, key: &str) -> Result<()>;

    /// Remove every key in the namespace
    fn clear_namespace(&self, namespace: &str) -> Result<()>;

    /// List keys in the namespace, sorted
    fn keys(&self, namespace: &str) -> Result<Vec<String>>;
}
