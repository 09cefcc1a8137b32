//! In-memory storage implementation
//!
//! Used for tests and for sessions that should not touch disk.

use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::KeyValueCache;

/// In-memory implementation of KeyValueCache
///
/// One sorted map per namespace, protected by a RwLock.
#[derive(Default)]
pub struct InMemoryKvStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for InMemoryKvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(namespaces.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        if let Some(ns) = namespaces.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    fn clear_namespace(&self, namespace: &str) -> Result<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        namespaces.remove(namespace);
        Ok(())
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(namespaces
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }
}
