use async_trait::async_trait;
use metrics::counter;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait,
};
use tracing::{debug, instrument, warn};

use super::{DocumentStore, StatusRecord, TargetDocument};
use crate::errors::{is_connection_error, StoreError};
use crate::models::{counter, document, migration_status};

/// Document store kept in three relational tables: `documents`, `counters`
/// and `migration_status` (see [`crate::migrator::TargetMigrator`]).
#[derive(Clone)]
pub struct SqlDocumentStore {
    db: DatabaseConnection,
}

impl SqlDocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_counter(&self, name: &str) -> Result<(), StoreError> {
        let model = counter::ActiveModel {
            name: Set(name.to_string()),
            sequence_value: Set(0),
        };
        counter::Entity::insert(model)
            .on_conflict(
                OnConflict::column(counter::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn increment_in_transaction(&self, name: &str) -> Result<i64, StoreError> {
        let txn = self.db.begin().await.map_err(classify)?;
        let current = counter::Entity::find_by_id(name.to_string())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(classify)?
            .ok_or_else(|| StoreError::Database(DbErr::RecordNotFound(name.to_string())))?;

        let next = current.sequence_value + 1;
        counter::ActiveModel {
            name: Set(current.name),
            sequence_value: Set(next),
        }
        .update(&txn)
        .await
        .map_err(classify)?;
        txn.commit().await.map_err(classify)?;
        Ok(next)
    }

    /// Single-statement array length sum for a top-level field.
    fn embedded_count_sql(&self, field: &str) -> String {
        match self.db.get_database_backend() {
            DatabaseBackend::Postgres => format!(
                "SELECT CAST(COALESCE(SUM(json_array_length(body -> '{field}')), 0) AS BIGINT) AS total \
                 FROM documents WHERE collection = $1 AND json_typeof(body -> '{field}') = 'array'"
            ),
            DatabaseBackend::MySql => format!(
                "SELECT CAST(COALESCE(SUM(JSON_LENGTH(body, '$.{field}')), 0) AS SIGNED) AS total \
                 FROM documents WHERE collection = ? AND JSON_TYPE(JSON_EXTRACT(body, '$.{field}')) = 'ARRAY'"
            ),
            DatabaseBackend::Sqlite => format!(
                "SELECT COALESCE(SUM(json_array_length(body, '$.{field}')), 0) AS total \
                 FROM documents WHERE collection = ?"
            ),
        }
    }
}

/// Connection-class failures mean the target is gone; everything else is a
/// rejected statement.
fn classify(err: DbErr) -> StoreError {
    if is_connection_error(&err) {
        counter!("migrator_store.connection_failures", 1);
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

fn is_plain_field(path: &str) -> bool {
    !path.is_empty() && path.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn to_active(collection: &str, doc: TargetDocument) -> document::ActiveModel {
    document::ActiveModel {
        collection: Set(collection.to_string()),
        doc_key: Set(doc.key),
        body: Set(doc.body),
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    fn backend_name(&self) -> &'static str {
        match self.db.get_database_backend() {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .ping()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn probe_schema(&self) -> Result<(), StoreError> {
        self.ping().await?;
        document::Entity::find().one(&self.db).await.map_err(classify)?;
        counter::Entity::find().one(&self.db).await.map_err(classify)?;
        migration_status::Entity::find()
            .one(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        document::Entity::find()
            .filter(document::Column::Collection.eq(collection))
            .count(&self.db)
            .await
            .map_err(classify)
    }

    #[instrument(skip(self, docs), fields(attempted = docs.len()))]
    async fn insert_many_unordered(
        &self,
        collection: &str,
        docs: Vec<TargetDocument>,
    ) -> Result<u64, StoreError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let attempted = docs.len() as u64;
        let models: Vec<document::ActiveModel> =
            docs.into_iter().map(|d| to_active(collection, d)).collect();

        // A single INSERT is atomic, so a rejection here means nothing landed.
        match document::Entity::insert_many(models.clone())
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => return Ok(attempted),
            Err(err) if is_connection_error(&err) => return Err(classify(err)),
            Err(err) => warn!(
                "Multi-row insert into {} rejected ({}); retrying document by document",
                collection, err
            ),
        }

        let mut inserted = 0u64;
        let mut first_error: Option<String> = None;
        for model in models {
            match document::Entity::insert(model)
                .exec_without_returning(&self.db)
                .await
            {
                Ok(_) => inserted += 1,
                Err(err) if is_connection_error(&err) => return Err(classify(err)),
                Err(err) => {
                    debug!("Document rejected: {}", err);
                    first_error.get_or_insert_with(|| err.to_string());
                }
            }
        }

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
        let rows = document::Entity::find()
            .filter(document::Column::Collection.eq(collection))
            .order_by_asc(document::Column::DocKey)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(classify)?;
        Ok(rows
            .into_iter()
            .map(|row| TargetDocument::new(row.doc_key, row.body))
            .collect())
    }

    async fn max_key(&self, collection: &str) -> Result<Option<i64>, StoreError> {
        let max: Option<Option<i64>> = document::Entity::find()
            .select_only()
            .column_as(document::Column::DocKey.max(), "max_key")
            .filter(document::Column::Collection.eq(collection))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(classify)?;
        Ok(max.flatten())
    }

    async fn count_embedded(&self, collection: &str, path: &str) -> Result<u64, StoreError> {
        if !is_plain_field(path) {
            return super::count_embedded_by_scan(self, collection, path).await;
        }
        let backend = self.db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            self.embedded_count_sql(path),
            [collection.into()],
        );
        let total = match self.db.query_one(stmt).await.map_err(classify)? {
            Some(row) => row.try_get::<i64>("", "total").map_err(classify)?,
            None => 0,
        };
        Ok(total.max(0) as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        let result = document::Entity::delete_many()
            .filter(document::Column::Collection.eq(collection))
            .exec(&self.db)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected)
    }

    async fn increment_counter(&self, name: &str) -> Result<i64, StoreError> {
        self.ensure_counter(name).await?;

        if !self.db.support_returning() {
            return self.increment_in_transaction(name).await;
        }

        let updated = counter::Entity::update_many()
            .col_expr(
                counter::Column::SequenceValue,
                Expr::col(counter::Column::SequenceValue).add(1),
            )
            .filter(counter::Column::Name.eq(name))
            .exec_with_returning(&self.db)
            .await
            .map_err(classify)?;

        updated
            .into_iter()
            .next()
            .map(|row| row.sequence_value)
            .ok_or_else(|| StoreError::Database(DbErr::RecordNotFound(name.to_string())))
    }

    async fn raise_counter(&self, name: &str, value: i64) -> Result<i64, StoreError> {
        self.ensure_counter(name).await?;
        counter::Entity::update_many()
            .col_expr(counter::Column::SequenceValue, Expr::value(value))
            .filter(counter::Column::Name.eq(name))
            .filter(counter::Column::SequenceValue.lt(value))
            .exec(&self.db)
            .await
            .map_err(classify)?;

        self.counter_value(name)
            .await?
            .ok_or_else(|| StoreError::Database(DbErr::RecordNotFound(name.to_string())))
    }

    async fn counter_value(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(counter::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await
            .map_err(classify)?
            .map(|row| row.sequence_value))
    }

    async fn load_status(&self, name: &str) -> Result<Option<StatusRecord>, StoreError> {
        migration_status::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await
            .map_err(classify)
    }

    async fn save_status(&self, record: StatusRecord) -> Result<(), StoreError> {
        use migration_status::Column;

        let model = migration_status::ActiveModel {
            name: Set(record.name),
            status: Set(record.status),
            first_run: Set(record.first_run),
            last_run: Set(record.last_run),
            duration_seconds: Set(record.duration_seconds),
            processed: Set(record.processed),
            succeeded: Set(record.succeeded),
            failed: Set(record.failed),
            error: Set(record.error),
            stack: Set(record.stack),
            details: Set(record.details),
        };
        migration_status::Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::Name)
                    .update_columns([
                        Column::Status,
                        Column::FirstRun,
                        Column::LastRun,
                        Column::DurationSeconds,
                        Column::Processed,
                        Column::Succeeded,
                        Column::Failed,
                        Column::Error,
                        Column::Stack,
                        Column::Details,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError> {
        migration_status::Entity::find()
            .order_by_asc(migration_status::Column::Name)
            .all(&self.db)
            .await
            .map_err(classify)
    }

    async fn delete_status(&self, name: &str) -> Result<bool, StoreError> {
        let result = migration_status::Entity::delete_by_id(name.to_string())
            .exec(&self.db)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected > 0)
    }
}
