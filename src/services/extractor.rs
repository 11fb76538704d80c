use std::marker::PhantomData;

use sea_orm::{
    Condition, DatabaseConnection, DbErr, EntityTrait, Iterable, PaginatorTrait,
    PrimaryKeyToColumn, QueryFilter, QueryOrder, QuerySelect, Select,
};
use tracing::debug;

/// Paginated reads of one source table in primary-key order.
pub struct Extractor<'a, E: EntityTrait> {
    db: &'a DatabaseConnection,
    filter: Option<Condition>,
    _entity: PhantomData<E>,
}

impl<'a, E: EntityTrait> Extractor<'a, E> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self {
            db,
            filter: None,
            _entity: PhantomData,
        }
    }

    pub fn with_filter(mut self, filter: Option<Condition>) -> Self {
        self.filter = filter;
        self
    }

    fn select(&self) -> Select<E> {
        let mut select = E::find();
        if let Some(filter) = &self.filter {
            select = select.filter(filter.clone());
        }
        select
    }

    /// Rows `offset..offset + limit` ordered by every primary-key column ascending.
    pub async fn read_batch(&self, offset: u64, limit: u64) -> Result<Vec<E::Model>, DbErr> {
        let mut select = self.select();
        for key in E::PrimaryKey::iter() {
            select = select.order_by_asc(key.into_column());
        }
        let rows = select.offset(offset).limit(limit).all(self.db).await?;
        debug!(
            table = E::default().table_name(),
            offset,
            limit,
            fetched = rows.len(),
            "Read source batch"
        );
        Ok(rows)
    }

    /// Number of rows the extractor will yield.
    pub async fn count(&self) -> Result<u64, DbErr>
    where
        E::Model: Sync,
    {
        self.select().count(self.db).await
    }
}

/// Sizes of the batches a table of `total` rows is read in.
pub fn batch_plan(total: u64, batch_size: u64) -> Vec<u64> {
    if batch_size == 0 {
        return Vec::new();
    }
    let full = total / batch_size;
    let mut plan = vec![batch_size; full as usize];
    if total % batch_size > 0 {
        plan.push(total % batch_size);
    }
    plan
}
