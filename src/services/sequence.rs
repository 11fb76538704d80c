use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use metrics::counter;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tracing::{info, instrument, warn};

use crate::errors::{MigrationError, StoreError};
use crate::store::DocumentStore;

/// Target-store id spaces, one counter each.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Manufacturer,
    OrderStatus,
    Customer,
    Category,
    Product,
    Order,
    OrderProduct,
    OrderOption,
}

impl SequenceKind {
    /// Name of the counter record.
    pub fn counter_name(&self) -> &'static str {
        match self {
            Self::Manufacturer => "manufacturer_id",
            Self::OrderStatus => "order_status_id",
            Self::Customer => "customer_id",
            Self::Category => "category_id",
            Self::Product => "product_id",
            Self::Order => "order_id",
            Self::OrderProduct => "order_product_id",
            Self::OrderOption => "order_option_id",
        }
    }

    /// Collection scanned to bootstrap the counter.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Manufacturer => "manufacturers",
            Self::OrderStatus => "order_statuses",
            Self::Customer => "customers",
            Self::Category => "categories",
            Self::Product => "products",
            Self::Order | Self::OrderProduct | Self::OrderOption => "orders",
        }
    }

    /// Embedded field holding the id, or `None` when it is the document key.
    pub fn embedded_path(&self) -> Option<&'static str> {
        match self {
            Self::OrderProduct => Some("products.order_product_id"),
            Self::OrderOption => Some("products.options.order_option_id"),
            _ => None,
        }
    }
}

/// In-process allocator used while the counter store is unreachable.
///
/// Values continue from the last one the allocator observed. Two processes in
/// degraded mode, or a crash followed by a restart, can issue the same id.
#[derive(Debug, Default)]
pub struct DegradedSequence {
    last_seen: DashMap<SequenceKind, i64>,
    engaged: DashSet<SequenceKind>,
}

impl DegradedSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value issued or confirmed by the store.
    pub fn observe(&self, kind: SequenceKind, value: i64) {
        let mut last = self.last_seen.entry(kind).or_insert(value);
        if *last < value {
            *last = value;
        }
    }

    pub fn is_engaged(&self, kind: SequenceKind) -> bool {
        self.engaged.contains(&kind)
    }

    /// Next id from the cache, or `None` when nothing was ever observed for
    /// `kind` and there is no value to continue from.
    pub fn next(&self, kind: SequenceKind, cause: &StoreError) -> Option<i64> {
        let mut last = self.last_seen.get_mut(&kind)?;
        if self.engaged.insert(kind) {
            warn!(
                counter = kind.counter_name(),
                "Counter store failed ({}); allocating from the in-process cache. \
                 Ids issued now are not crash safe or multi-process safe",
                cause
            );
        }
        counter!(
            "migrator_sequence.degraded_allocations",
            1,
            "counter" => kind.counter_name()
        );
        *last += 1;
        Some(*last)
    }
}

/// Issues monotonically increasing target primary keys per [`SequenceKind`].
pub struct SequenceAllocator {
    store: Arc<dyn DocumentStore>,
    degraded: DegradedSequence,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_fallback(store, DegradedSequence::new())
    }

    pub fn with_fallback(store: Arc<dyn DocumentStore>, degraded: DegradedSequence) -> Self {
        Self { store, degraded }
    }

    /// Raises each counter to the largest id already present in the target.
    /// Safe to repeat; counters never move backwards.
    #[instrument(skip(self, kinds))]
    pub async fn initialize(&self, kinds: &[SequenceKind]) -> Result<(), MigrationError> {
        for kind in kinds {
            let existing = match kind.embedded_path() {
                None => self.store.max_key(kind.collection()).await?,
                Some(path) => self.store.max_embedded(kind.collection(), path).await?,
            }
            .unwrap_or(0);

            let value = self
                .store
                .raise_counter(kind.counter_name(), existing)
                .await?;
            self.degraded.observe(*kind, value);
            info!(
                counter = kind.counter_name(),
                target_max = existing,
                value,
                "Sequence initialized"
            );
        }
        Ok(())
    }

    /// Atomically allocates the next id of `kind`.
    ///
    /// Once the counter store has failed for a kind, that kind keeps allocating
    /// from the in-process cache for the rest of the process so the two sources
    /// never interleave.
    pub async fn next_id(&self, kind: SequenceKind) -> Result<i64, MigrationError> {
        if self.degraded.is_engaged(kind) {
            let cause = StoreError::Unavailable("counter store previously failed".into());
            return self.fallback(kind, cause);
        }
        match self.store.increment_counter(kind.counter_name()).await {
            Ok(value) => {
                self.degraded.observe(kind, value);
                Ok(value)
            }
            Err(err) if err.is_connection_failure() => self.fallback(kind, err),
            Err(err) => Err(err.into()),
        }
    }

    /// Unseeded kinds fail instead of restarting at 1 below existing ids.
    fn fallback(&self, kind: SequenceKind, cause: StoreError) -> Result<i64, MigrationError> {
        match self.degraded.next(kind, &cause) {
            Some(value) => Ok(value),
            None => {
                warn!(
                    counter = kind.counter_name(),
                    "Counter store failed before the sequence was initialized; no id to continue from"
                );
                Err(cause.into())
            }
        }
    }

    pub fn is_degraded(&self, kind: SequenceKind) -> bool {
        self.degraded.is_engaged(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, TargetDocument};
    use proptest::prelude::*;
    use serde_json::json;

    fn allocator() -> (Arc<MemoryDocumentStore>, SequenceAllocator) {
        let store = Arc::new(MemoryDocumentStore::new());
        let allocator = SequenceAllocator::new(store.clone());
        (store, allocator)
    }

    #[tokio::test]
    async fn bootstraps_from_embedded_ids() {
        let (store, ids) = allocator();
        store
            .insert_many_unordered(
                "orders",
                vec![TargetDocument::new(
                    1,
                    json!({"products": [{"order_product_id": 41, "options": [{"order_option_id": 90}]}]}),
                )],
            )
            .await
            .unwrap();

        ids.initialize(&[SequenceKind::OrderProduct, SequenceKind::OrderOption])
            .await
            .unwrap();
        assert_eq!(ids.next_id(SequenceKind::OrderProduct).await.unwrap(), 42);
        assert_eq!(ids.next_id(SequenceKind::OrderOption).await.unwrap(), 91);
    }

    #[tokio::test]
    async fn initialize_never_lowers_a_counter() {
        let (store, ids) = allocator();
        store.raise_counter("customer_id", 300).await.unwrap();
        ids.initialize(&[SequenceKind::Customer]).await.unwrap();
        ids.initialize(&[SequenceKind::Customer]).await.unwrap();
        assert_eq!(ids.next_id(SequenceKind::Customer).await.unwrap(), 301);
    }

    #[tokio::test]
    async fn falls_back_to_cache_when_counters_fail() {
        let (store, ids) = allocator();
        store.raise_counter("product_id", 10).await.unwrap();
        ids.initialize(&[SequenceKind::Product]).await.unwrap();
        assert_eq!(ids.next_id(SequenceKind::Product).await.unwrap(), 11);

        store.set_counters_unavailable(true);
        assert_eq!(ids.next_id(SequenceKind::Product).await.unwrap(), 12);
        assert!(ids.is_degraded(SequenceKind::Product));

        store.set_counters_unavailable(false);
        assert_eq!(ids.next_id(SequenceKind::Product).await.unwrap(), 13);
        assert!(!ids.is_degraded(SequenceKind::Customer));
    }

    #[tokio::test]
    async fn unseeded_fallback_refuses_to_guess() {
        let (store, ids) = allocator();
        store.raise_counter("product_id", 50).await.unwrap();
        store.set_counters_unavailable(true);

        let err = ids.next_id(SequenceKind::Product).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(!ids.is_degraded(SequenceKind::Product));

        store.set_counters_unavailable(false);
        assert_eq!(ids.next_id(SequenceKind::Product).await.unwrap(), 51);
    }

    #[test]
    fn counter_names_follow_kind_names() {
        for kind in <SequenceKind as strum::IntoEnumIterator>::iter() {
            assert_eq!(kind.counter_name(), format!("{kind}_id"));
        }
    }

    proptest! {
        #[test]
        fn allocations_strictly_increase(
            seed in 0i64..1_000_000,
            picks in proptest::collection::vec(0usize..3, 1..60),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (store, ids) = allocator();
                store.raise_counter("order_id", seed).await.unwrap();
                ids.initialize(&[SequenceKind::Order]).await.unwrap();

                let kinds = [SequenceKind::Order, SequenceKind::OrderProduct, SequenceKind::OrderOption];
                let mut last = std::collections::HashMap::new();
                let mut first_order = None;
                for pick in picks {
                    let kind = kinds[pick];
                    let value = ids.next_id(kind).await.unwrap();
                    if kind == SequenceKind::Order && first_order.is_none() {
                        first_order = Some(value);
                    }
                    if let Some(prev) = last.insert(kind, value) {
                        assert!(value > prev);
                    }
                }
                if let Some(first) = first_order {
                    assert_eq!(first, seed + 1);
                }
            });
        }
    }
}
