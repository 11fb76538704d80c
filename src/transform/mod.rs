//! Per-entity mapping from source rows to aggregate documents.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{Condition, DatabaseConnection, DbErr, EntityTrait};

use crate::documents::Aggregate;
use crate::errors::MigrationError;
use crate::services::sequence::SequenceAllocator;

pub mod category;
pub mod customer;
pub mod lookup;
pub mod normalize;
pub mod order;
pub mod product;
pub mod tree;

pub use category::CategoryTransformer;
pub use customer::CustomerTransformer;
pub use lookup::{ManufacturerTransformer, OrderStatusTransformer};
pub use order::OrderTransformer;
pub use product::ProductTransformer;

/// Maps a failed related-table read for one row. Connection loss stays a
/// fatal database error; anything else fails only that row.
pub(crate) fn related_error(entity: &'static str, key: i64) -> impl Fn(DbErr) -> MigrationError {
    move |err| {
        if crate::errors::is_connection_error(&err) {
            MigrationError::Database(err)
        } else {
            MigrationError::transform(entity, key, err.to_string())
        }
    }
}

/// Handles a transformer may use while building one aggregate.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub source: &'a DatabaseConnection,
    pub ids: &'a SequenceAllocator,
}

/// Counts embedded children on the source side.
pub type SourceCount = for<'a> fn(&'a DatabaseConnection) -> BoxFuture<'a, Result<u64, DbErr>>;

/// Embedded-array parity check run after a load: the number of source child
/// rows must equal the summed array lengths at `path` over the collection.
#[derive(Clone, Copy)]
pub struct EmbeddedCheck {
    pub label: &'static str,
    pub path: &'static str,
    pub source_count: SourceCount,
}

impl std::fmt::Debug for EmbeddedCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedCheck")
            .field("label", &self.label)
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
pub trait Transformer: Send + Sync {
    /// Primary source table.
    type Source: EntityTrait;
    /// Name of the primary source table.
    const TABLE: &'static str;
    type Output: Aggregate;

    /// Child tables read per row, for status details and `check`.
    fn related_tables(&self) -> &'static [&'static str] {
        &[]
    }

    /// Restricts which source rows are extracted.
    fn filter(&self) -> Option<Condition> {
        None
    }

    /// One-off work before the first batch, such as loading a lookup table.
    async fn prepare(&mut self, _source: &DatabaseConnection) -> Result<(), MigrationError> {
        Ok(())
    }

    /// Builds the aggregate for `row`. `Ok(None)` drops the row on purpose;
    /// errors are counted against the row and never swallowed here.
    async fn transform(
        &self,
        row: <Self::Source as EntityTrait>::Model,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<Self::Output>, MigrationError>;

    fn embedded_checks(&self) -> Vec<EmbeddedCheck> {
        Vec::new()
    }
}
