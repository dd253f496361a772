//! Record store abstraction.
//!
//! The backing store offers per-key get/set/delete, atomic at
//! single-key granularity, with no cross-key transactions and no
//! compare-and-swap. Values are opaque strings; all encoding happens
//! above this layer. The absence of cross-key atomicity is the central
//! constraint the append coordinator works around.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;

/// Keyed record store consumed by the synchronization core.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the value for a key, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the value for a key, replacing any prior value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and local runs.
///
/// Writes can be disabled wholesale, or for one specific key, to
/// exercise persistence-failure paths including mid-sequence failures.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
    fail_writes: AtomicBool,
    fail_key: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes to one specific key fail; `None` clears it. Writes
    /// to every other key keep succeeding.
    pub fn set_fail_key(&self, key: Option<&str>) {
        *self.fail_key.lock().expect("fail key lock") = key.map(String::from);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.get(key).map(|entry| entry.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("writes disabled".to_string()));
        }
        if self
            .fail_key
            .lock()
            .expect("fail key lock")
            .as_deref()
            .is_some_and(|k| k == key)
        {
            return Err(StoreError::Io(format!("writes to {key} disabled")));
        }
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("writes disabled".to_string()));
        }
        self.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_delete_roundtrip() {
        let store = MemoryStore::new();

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_key_failure_spares_other_keys() {
        let store = MemoryStore::new();
        store.set_fail_key(Some("blocked"));

        assert!(store.set("blocked", "v").await.is_err());
        store.set("other", "v").await.unwrap();
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some("v"));

        store.set_fail_key(None);
        store.set("blocked", "v").await.unwrap();
    }

    #[tokio::test]
    async fn disabled_writes_error_but_reads_survive() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();

        store.set_fail_writes(true);
        assert!(store.set("k", "v2").await.is_err());
        assert!(store.delete("k").await.is_err());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
