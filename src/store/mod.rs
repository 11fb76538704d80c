//! Target document store.
//!
//! Aggregates are written to named collections as JSON bodies keyed by their
//! integer primary key. The store also owns the two pieces of shared mutable
//! state of a migration run: id counters and phase status records.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::config::MigratorConfig;
use crate::db::{self, DbConfig};
use crate::errors::{MigrationError, StoreError};

pub mod memory;
pub mod sql;

pub use memory::MemoryDocumentStore;
pub use sql::SqlDocumentStore;

/// Persisted lifecycle record of one phase.
pub type StatusRecord = crate::models::migration_status::Model;

/// Page size used when a store has to walk a collection.
pub const SCAN_PAGE_SIZE: u64 = 1_000;

/// One aggregate as stored in the target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDocument {
    pub key: i64,
    pub body: Value,
}

impl TargetDocument {
    pub fn new(key: i64, body: Value) -> Self {
        Self { key, body }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short label for logs.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Confirms the bookkeeping tables are readable without creating them.
    async fn probe_schema(&self) -> Result<(), StoreError> {
        self.ping().await
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Inserts every document it can. Returns the number inserted when all of
    /// them were accepted, `StoreError::BulkWrite` when only some were.
    async fn insert_many_unordered(
        &self,
        collection: &str,
        docs: Vec<TargetDocument>,
    ) -> Result<u64, StoreError>;

    /// Documents of `collection` in ascending key order.
    async fn scan(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TargetDocument>, StoreError>;

    async fn max_key(&self, collection: &str) -> Result<Option<i64>, StoreError> {
        fold_documents(self, collection, None, |acc: Option<i64>, doc| {
            Some(acc.map_or(doc.key, |m| m.max(doc.key)))
        })
        .await
    }

    /// Largest integer found at `path` (dotted, arrays flattened) over the collection.
    async fn max_embedded(&self, collection: &str, path: &str) -> Result<Option<i64>, StoreError> {
        max_embedded_by_scan(self, collection, path).await
    }

    /// Sum of the lengths of the arrays found at `path` over the collection.
    async fn count_embedded(&self, collection: &str, path: &str) -> Result<u64, StoreError> {
        count_embedded_by_scan(self, collection, path).await
    }

    /// Removes every document of `collection`, returning how many were removed.
    async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError>;

    /// Atomically increments the named counter and returns the new value.
    /// A missing counter starts at 0.
    async fn increment_counter(&self, name: &str) -> Result<i64, StoreError>;

    /// Sets the counter to `max(current, value)` and returns the stored value.
    async fn raise_counter(&self, name: &str, value: i64) -> Result<i64, StoreError>;

    async fn counter_value(&self, name: &str) -> Result<Option<i64>, StoreError>;

    async fn load_status(&self, name: &str) -> Result<Option<StatusRecord>, StoreError>;

    async fn save_status(&self, record: StatusRecord) -> Result<(), StoreError>;

    async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError>;

    async fn delete_status(&self, name: &str) -> Result<bool, StoreError>;
}

/// Opens the configured target store. SQL targets get their bookkeeping
/// schema installed only when `install_schema` is set.
pub async fn connect_target(
    cfg: &MigratorConfig,
    install_schema: bool,
) -> Result<Arc<dyn DocumentStore>, MigrationError> {
    if cfg.uses_memory_target() {
        info!("Using in-process target store; nothing will persist past this run");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }

    let pool = db::establish_connection_with_config(&DbConfig::target(cfg)).await?;
    if install_schema {
        crate::migrator::install_schema(&pool).await?;
    }
    Ok(Arc::new(SqlDocumentStore::new(pool)))
}

/// Values reached by following `path` from `root`, flattening arrays met along the way.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Array(items) => next.extend(items.iter().filter_map(|v| v.get(segment))),
                other => next.extend(other.get(segment)),
            }
        }
        current = next;
    }
    current
}

/// Number of embedded entries at `path` in one document.
pub fn embedded_len(body: &Value, path: &str) -> u64 {
    resolve_path(body, path)
        .into_iter()
        .map(|v| match v {
            Value::Array(items) => items.len() as u64,
            _ => 0,
        })
        .sum()
}

fn embedded_max(body: &Value, path: &str) -> Option<i64> {
    resolve_path(body, path)
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().filter_map(Value::as_i64).collect::<Vec<_>>(),
            other => other.as_i64().into_iter().collect(),
        })
        .max()
}

async fn fold_documents<S, T, F>(
    store: &S,
    collection: &str,
    init: T,
    mut f: F,
) -> Result<T, StoreError>
where
    S: DocumentStore + ?Sized,
    T: Send,
    F: FnMut(T, &TargetDocument) -> T + Send,
{
    let mut acc = init;
    let mut offset = 0;
    loop {
        let page = store.scan(collection, offset, SCAN_PAGE_SIZE).await?;
        let fetched = page.len() as u64;
        for doc in &page {
            acc = f(acc, doc);
        }
        if fetched < SCAN_PAGE_SIZE {
            return Ok(acc);
        }
        offset += fetched;
    }
}

pub(crate) async fn count_embedded_by_scan<S>(
    store: &S,
    collection: &str,
    path: &str,
) -> Result<u64, StoreError>
where
    S: DocumentStore + ?Sized,
{
    fold_documents(store, collection, 0u64, |acc, doc| acc + embedded_len(&doc.body, path)).await
}

pub(crate) async fn max_embedded_by_scan<S>(
    store: &S,
    collection: &str,
    path: &str,
) -> Result<Option<i64>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    fold_documents(store, collection, None, |acc: Option<i64>, doc| {
        match (acc, embedded_max(&doc.body, path)) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Value {
        json!({
            "order_id": 10,
            "products": [
                {"order_product_id": 3, "options": [{"order_option_id": 7}, {"order_option_id": 9}]},
                {"order_product_id": 5, "options": []},
                {"order_product_id": 4, "options": [{"order_option_id": 8}]}
            ]
        })
    }

    #[test]
    fn nested_arrays_are_flattened() {
        let doc = order();
        assert_eq!(embedded_len(&doc, "products"), 3);
        assert_eq!(embedded_len(&doc, "products.options"), 3);
        assert_eq!(embedded_max(&doc, "products.order_product_id"), Some(5));
        assert_eq!(embedded_max(&doc, "products.options.order_option_id"), Some(9));
    }

    #[test]
    fn missing_paths_count_as_empty() {
        let doc = json!({"customer_id": 1});
        assert_eq!(embedded_len(&doc, "addresses"), 0);
        assert_eq!(embedded_max(&doc, "addresses.address_id"), None);
    }

    #[test]
    fn id_lists_contribute_their_values() {
        let doc = json!({"related": [4, 11, 2]});
        assert_eq!(embedded_len(&doc, "related"), 3);
        assert_eq!(embedded_max(&doc, "related"), Some(11));
    }
}
