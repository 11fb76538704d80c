use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use tracing::debug;

use super::{DocumentStore, StatusRecord, TargetDocument};
use crate::errors::StoreError;

/// In-process document store.
///
/// Used for dry runs (`memory://` target) and tests. Faults can be injected to
/// exercise degraded sequence allocation, partial bulk writes and connection
/// loss.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, BTreeMap<i64, Value>>,
    counters: DashMap<String, i64>,
    statuses: DashMap<String, StatusRecord>,
    unavailable: AtomicBool,
    counters_unavailable: AtomicBool,
    rejected: DashSet<(String, i64)>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes counter increments fail while the rest of the store keeps working.
    pub fn set_counters_unavailable(&self, unavailable: bool) {
        self.counters_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Rejects any future insert of `key` into `collection`.
    pub fn reject_key(&self, collection: &str, key: i64) {
        self.rejected.insert((collection.to_string(), key));
    }

    /// Stored body of one document.
    pub fn get(&self, collection: &str, key: i64) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(&key).cloned())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn insert_many_unordered(
        &self,
        collection: &str,
        docs: Vec<TargetDocument>,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let attempted = docs.len() as u64;
        let mut inserted = 0u64;
        let mut first_error: Option<String> = None;

        let mut target = self.collections.entry(collection.to_string()).or_default();
        for doc in docs {
            if self.rejected.contains(&(collection.to_string(), doc.key)) {
                first_error.get_or_insert_with(|| format!("document {} rejected", doc.key));
                continue;
            }
            if target.contains_key(&doc.key) {
                first_error.get_or_insert_with(|| format!("duplicate key {}", doc.key));
                continue;
            }
            target.insert(doc.key, doc.body);
            inserted += 1;
        }
        debug!(collection, inserted, attempted, "memory bulk insert");

        match first_error {
            None => Ok(inserted),
            Some(message) => Err(StoreError::BulkWrite {
                inserted,
                attempted,
                message,
            }),
        }
    }

    async fn scan(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TargetDocument>, StoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .map(|(key, body)| TargetDocument::new(*key, body.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn max_key(&self, collection: &str) -> Result<Option<i64>, StoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.keys().next_back().copied()))
    }

    async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .remove(collection)
            .map(|(_, docs)| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn increment_counter(&self, name: &str) -> Result<i64, StoreError> {
        self.check_available()?;
        if self.counters_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("counter {name} unavailable")));
        }
        let mut value = self.counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn raise_counter(&self, name: &str, value: i64) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut current = self.counters.entry(name.to_string()).or_insert(0);
        if *current < value {
            *current = value;
        }
        Ok(*current)
    }

    async fn counter_value(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.check_available()?;
        Ok(self.counters.get(name).map(|v| *v))
    }

    async fn load_status(&self, name: &str) -> Result<Option<StatusRecord>, StoreError> {
        self.check_available()?;
        Ok(self.statuses.get(name).map(|r| r.clone()))
    }

    async fn save_status(&self, record: StatusRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.statuses.insert(record.name.clone(), record);
        Ok(())
    }

    async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError> {
        self.check_available()?;
        let mut records: Vec<StatusRecord> =
            self.statuses.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn delete_status(&self, name: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.statuses.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn docs(keys: &[i64]) -> Vec<TargetDocument> {
        keys.iter()
            .map(|k| TargetDocument::new(*k, json!({ "id": k })))
            .collect()
    }

    #[tokio::test]
    async fn unordered_insert_keeps_going_past_a_duplicate() {
        let store = MemoryDocumentStore::new();
        store.insert_many_unordered("customers", docs(&[2])).await.unwrap();

        let err = store
            .insert_many_unordered("customers", docs(&[1, 2, 3]))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::BulkWrite { inserted: 2, attempted: 3, .. });
        assert_eq!(store.count("customers").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn rejected_keys_fail_individually() {
        let store = MemoryDocumentStore::new();
        store.reject_key("products", 5);
        let err = store
            .insert_many_unordered("products", docs(&[4, 5, 6]))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::BulkWrite { inserted: 2, attempted: 3, .. });
        assert!(store.get("products", 5).is_none());
    }

    #[tokio::test]
    async fn scan_is_key_ordered_and_paged() {
        let store = MemoryDocumentStore::new();
        store.insert_many_unordered("orders", docs(&[30, 10, 20])).await.unwrap();
        let keys: Vec<i64> = store
            .scan("orders", 1, 5)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec![20, 30]);
        assert_eq!(store.max_key("orders").await.unwrap(), Some(30));
        assert_eq!(store.max_key("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn counters_only_move_forward() {
        let store = MemoryDocumentStore::new();
        assert_eq!(store.raise_counter("order_id", 4500).await.unwrap(), 4500);
        assert_eq!(store.raise_counter("order_id", 10).await.unwrap(), 4500);
        assert_eq!(store.increment_counter("order_id").await.unwrap(), 4501);
        assert_eq!(store.increment_counter("fresh_id").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_never_repeat() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..25 {
                    seen.push(store.increment_counter("product_id").await.unwrap());
                }
                seen
            }));
        }
        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(all.last().copied(), Some(400));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryDocumentStore::new();
        store.set_unavailable(true);
        assert_matches!(store.ping().await, Err(StoreError::Unavailable(_)));
        assert_matches!(store.count("x").await, Err(StoreError::Unavailable(_)));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
