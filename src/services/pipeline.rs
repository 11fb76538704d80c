//! Extract, transform, load and verify for one entity.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::documents::Aggregate;
use crate::errors::MigrationError;
use crate::services::batch_writer::BatchWriter;
use crate::services::extractor::{batch_plan, Extractor};
use crate::services::sequence::SequenceAllocator;
use crate::services::status::RunCounters;
use crate::services::verification::{VerificationGate, VerificationReport};
use crate::store::DocumentStore;
use crate::transform::{TransformContext, Transformer};

/// Shared handles for every pipeline of a phase run.
pub struct PipelineContext {
    pub source: DatabaseConnection,
    pub store: Arc<dyn DocumentStore>,
    pub ids: Arc<SequenceAllocator>,
    pub batch_size: u64,
}

impl PipelineContext {
    pub fn writer(&self) -> BatchWriter {
        BatchWriter::new(self.store.clone())
    }

    pub fn verifier(&self) -> VerificationGate {
        VerificationGate::new(self.store.clone())
    }
}

/// What one entity load did.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub entity: String,
    pub collection: String,
    pub counters: RunCounters,
    pub batches: u64,
    pub verification: Vec<VerificationReport>,
}

/// Object-safe face of a [`Pipeline`] so a phase can hold a list of them.
#[async_trait]
pub trait EntityPipeline: Send + Sync {
    /// Source table name.
    fn entity(&self) -> &'static str;

    fn collection(&self) -> &'static str;

    /// Primary table followed by every child table read.
    fn source_tables(&self) -> Vec<&'static str>;

    async fn run(&mut self, ctx: &PipelineContext) -> Result<EntityReport, MigrationError>;

    /// Counters of the last run so far, also after it failed.
    fn counters(&self) -> RunCounters;
}

pub struct Pipeline<T: Transformer> {
    transformer: T,
    counters: RunCounters,
}

impl<T: Transformer> Pipeline<T> {
    pub fn new(transformer: T) -> Self {
        Self {
            transformer,
            counters: RunCounters::default(),
        }
    }

    pub fn boxed(transformer: T) -> Box<dyn EntityPipeline>
    where
        T: 'static,
        <T::Source as EntityTrait>::Model: Sync,
    {
        Box::new(Self::new(transformer))
    }

    /// Transforms one batch row by row. Fatal errors stop the load; anything
    /// else is logged and counted against the row.
    async fn transform_batch(
        &self,
        rows: Vec<<T::Source as EntityTrait>::Model>,
        tctx: &TransformContext<'_>,
        counters: &mut RunCounters,
    ) -> Result<Vec<T::Output>, MigrationError> {
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            counters.processed += 1;
            match self.transformer.transform(row, tctx).await {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => counters.skipped += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(collection = T::Output::COLLECTION, "Row not migrated: {}", err);
                    counter!("migrator_transform.failures", 1, "collection" => T::Output::COLLECTION);
                    counters.failed += 1;
                }
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl<T> EntityPipeline for Pipeline<T>
where
    T: Transformer + 'static,
    <T::Source as EntityTrait>::Model: Sync,
{
    fn entity(&self) -> &'static str {
        T::TABLE
    }

    fn collection(&self) -> &'static str {
        T::Output::COLLECTION
    }

    fn source_tables(&self) -> Vec<&'static str> {
        let mut tables = vec![T::TABLE];
        tables.extend_from_slice(self.transformer.related_tables());
        tables
    }

    fn counters(&self) -> RunCounters {
        self.counters
    }

    #[instrument(skip_all, fields(collection = T::Output::COLLECTION))]
    async fn run(&mut self, ctx: &PipelineContext) -> Result<EntityReport, MigrationError> {
        self.transformer.prepare(&ctx.source).await?;

        let extractor =
            Extractor::<T::Source>::new(&ctx.source).with_filter(self.transformer.filter());
        let planned = batch_plan(extractor.count().await?, ctx.batch_size);
        info!(
            batches = planned.len(),
            rows = planned.iter().sum::<u64>(),
            batch_size = ctx.batch_size,
            "Starting entity load"
        );

        let writer = ctx.writer();
        let tctx = TransformContext {
            source: &ctx.source,
            ids: ctx.ids.as_ref(),
        };
        self.counters = RunCounters::default();
        let mut batches = 0u64;
        let mut offset = 0u64;

        loop {
            let rows = extractor.read_batch(offset, ctx.batch_size).await?;
            let fetched = rows.len() as u64;
            if fetched == 0 {
                break;
            }
            offset += fetched;
            batches += 1;

            let mut counters = self.counters;
            let transformed = self.transform_batch(rows, &tctx, &mut counters).await;
            self.counters = counters;
            let outcome = writer.write_batch(&transformed?).await?;
            self.counters.succeeded += outcome.succeeded;
            self.counters.failed += outcome.failed;
            let counters = self.counters;
            info!(
                batch = batches,
                of = planned.len(),
                processed = counters.processed,
                succeeded = counters.succeeded,
                failed = counters.failed,
                "Batch written"
            );

            if fetched < ctx.batch_size {
                break;
            }
        }

        let verification = ctx
            .verifier()
            .verify::<T::Source>(
                &ctx.source,
                self.transformer.filter(),
                T::Output::COLLECTION,
                self.counters.skipped,
                &self.transformer.embedded_checks(),
            )
            .await
            .inspect_err(|err| error!("{}", err))?;

        let counters = self.counters;
        info!(
            processed = counters.processed,
            succeeded = counters.succeeded,
            failed = counters.failed,
            skipped = counters.skipped,
            "Entity load finished"
        );
        Ok(EntityReport {
            entity: T::TABLE.to_string(),
            collection: T::Output::COLLECTION.to_string(),
            counters,
            batches,
            verification,
        })
    }
}
