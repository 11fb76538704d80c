use std::sync::Arc;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::documents::Aggregate;
use crate::errors::{MigrationError, StoreError};
use crate::store::DocumentStore;

/// Result of one bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: u64,
    pub failed: u64,
}

/// Unordered bulk writer for aggregate documents.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// A collection that already holds documents marks its phase as migrated.
    pub async fn should_skip(&self, collection: &str) -> Result<bool, MigrationError> {
        Ok(self.store.count(collection).await? > 0)
    }

    /// Writes `docs` to `A::COLLECTION`. One rejected document never blocks
    /// the others; only losing the store aborts the batch.
    #[instrument(skip(self, docs), fields(collection = A::COLLECTION, size = docs.len()))]
    pub async fn write_batch<A: Aggregate>(
        &self,
        docs: &[A],
    ) -> Result<BatchOutcome, MigrationError> {
        let mut outcome = BatchOutcome::default();
        let mut targets = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.to_target() {
                Ok(target) => targets.push(target),
                Err(err) => {
                    warn!(key = doc.key(), "Document could not be serialized: {}", err);
                    outcome.failed += 1;
                }
            }
        }
        if targets.is_empty() {
            return Ok(outcome);
        }

        let attempted = targets.len() as u64;
        match self.store.insert_many_unordered(A::COLLECTION, targets).await {
            Ok(inserted) => {
                outcome.succeeded += inserted;
                outcome.failed += attempted.saturating_sub(inserted);
            }
            Err(StoreError::BulkWrite {
                inserted, message, ..
            }) => {
                warn!(
                    inserted,
                    attempted, "Partial bulk write into {}: {}", A::COLLECTION, message
                );
                outcome.succeeded += inserted;
                outcome.failed += attempted.saturating_sub(inserted);
            }
            Err(err) if err.is_connection_failure() => {
                error!("Target store lost while writing {}: {}", A::COLLECTION, err);
                return Err(err.into());
            }
            Err(err) => {
                error!("Bulk write into {} rejected: {}", A::COLLECTION, err);
                outcome.failed += attempted;
            }
        }

        counter!("migrator_documents.written", outcome.succeeded, "collection" => A::COLLECTION);
        if outcome.failed > 0 {
            counter!("migrator_documents.failed", outcome.failed, "collection" => A::COLLECTION);
        }
        histogram!("migrator_batch.size", docs.len() as f64, "collection" => A::COLLECTION);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ManufacturerDocument;
    use crate::store::{MemoryDocumentStore, StatusRecord, TargetDocument};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Store {}

        #[async_trait]
        impl DocumentStore for Store {
            fn backend_name(&self) -> &'static str;
            async fn ping(&self) -> Result<(), StoreError>;
            async fn count(&self, collection: &str) -> Result<u64, StoreError>;
            async fn insert_many_unordered(
                &self,
                collection: &str,
                docs: Vec<TargetDocument>,
            ) -> Result<u64, StoreError>;
            async fn scan(
                &self,
                collection: &str,
                offset: u64,
                limit: u64,
            ) -> Result<Vec<TargetDocument>, StoreError>;
            async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError>;
            async fn increment_counter(&self, name: &str) -> Result<i64, StoreError>;
            async fn raise_counter(&self, name: &str, value: i64) -> Result<i64, StoreError>;
            async fn counter_value(&self, name: &str) -> Result<Option<i64>, StoreError>;
            async fn load_status(&self, name: &str) -> Result<Option<StatusRecord>, StoreError>;
            async fn save_status(&self, record: StatusRecord) -> Result<(), StoreError>;
            async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError>;
            async fn delete_status(&self, name: &str) -> Result<bool, StoreError>;
        }
    }

    fn manufacturers(n: i64) -> Vec<ManufacturerDocument> {
        (1..=n)
            .map(|id| ManufacturerDocument {
                manufacturer_id: id,
                name: format!("Maker {id}"),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn reconciles_from_reported_insert_count() {
        let mut store = MockStore::new();
        store
            .expect_insert_many_unordered()
            .withf(|collection, docs| collection == "manufacturers" && docs.len() == 10)
            .times(1)
            .returning(|_, _| {
                Err(StoreError::BulkWrite {
                    inserted: 7,
                    attempted: 10,
                    message: "3 duplicate keys".into(),
                })
            });

        let writer = BatchWriter::new(Arc::new(store));
        let outcome = writer.write_batch(&manufacturers(10)).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 7, failed: 3 });
    }

    #[tokio::test]
    async fn rejected_batch_is_counted_not_raised() {
        let mut store = MockStore::new();
        store
            .expect_insert_many_unordered()
            .returning(|_, _| Err(StoreError::Serialization(serde_json::from_str::<u8>("x").unwrap_err())));

        let writer = BatchWriter::new(Arc::new(store));
        let outcome = writer.write_batch(&manufacturers(4)).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 0, failed: 4 });
    }

    #[tokio::test]
    async fn lost_store_aborts_the_batch() {
        let mut store = MockStore::new();
        store
            .expect_insert_many_unordered()
            .returning(|_, _| Err(StoreError::Unavailable("connection reset".into())));

        let writer = BatchWriter::new(Arc::new(store));
        let err = writer.write_batch(&manufacturers(3)).await.unwrap_err();
        assert!(err.is_fatal());
        assert_matches!(err, MigrationError::Store(StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn empty_batch_never_reaches_the_store() {
        let mut store = MockStore::new();
        store.expect_insert_many_unordered().never();
        let writer = BatchWriter::new(Arc::new(store));
        let outcome = writer
            .write_batch::<ManufacturerDocument>(&[])
            .await
            .unwrap();
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[tokio::test]
    async fn non_empty_collection_means_skip() {
        let store = Arc::new(MemoryDocumentStore::new());
        let writer = BatchWriter::new(store.clone());
        assert!(!writer.should_skip("manufacturers").await.unwrap());

        let outcome = writer.write_batch(&manufacturers(3)).await.unwrap();
        assert_eq!(outcome.succeeded, 3);
        assert!(writer.should_skip("manufacturers").await.unwrap());
    }
}
