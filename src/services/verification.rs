use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::MigrationError;
use crate::store::DocumentStore;
use crate::transform::EmbeddedCheck;

/// Outcome of one count comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub entity: String,
    pub check: String,
    pub ok: bool,
    pub source_count: u64,
    pub target_count: u64,
    /// Source rows deliberately dropped by the transformer.
    pub skipped: u64,
}

impl VerificationReport {
    fn into_error(self) -> MigrationError {
        MigrationError::VerificationFailed {
            entity: self.entity,
            check: self.check,
            source_count: self.source_count,
            target_count: self.target_count,
        }
    }
}

/// Post-load count parity between source and target.
///
/// A mismatch is never downgraded to a warning: [`VerificationGate::verify`]
/// turns it into a critical error that fails the phase.
#[derive(Clone)]
pub struct VerificationGate {
    store: Arc<dyn DocumentStore>,
}

impl VerificationGate {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Compares the rows matching `filter` in `E` with the documents in
    /// `collection`. Rows the transformer dropped on purpose count as present.
    pub async fn check_documents<E: EntityTrait>(
        &self,
        source: &DatabaseConnection,
        filter: Option<sea_orm::Condition>,
        collection: &str,
        skipped: u64,
    ) -> Result<VerificationReport, MigrationError>
    where
        E::Model: Sync,
    {
        let mut query = E::find();
        if let Some(condition) = filter {
            query = query.filter(condition);
        }
        let source_count = query.count(source).await?;
        let target_count = self.store.count(collection).await?;
        Ok(VerificationReport {
            entity: collection.to_string(),
            check: "documents".to_string(),
            ok: target_count + skipped == source_count,
            source_count,
            target_count,
            skipped,
        })
    }

    /// Compares a child table with the embedded arrays built from it.
    pub async fn check_embedded(
        &self,
        source: &DatabaseConnection,
        collection: &str,
        check: &EmbeddedCheck,
    ) -> Result<VerificationReport, MigrationError> {
        let source_count = (check.source_count)(source).await?;
        let target_count = self.store.count_embedded(collection, check.path).await?;
        Ok(VerificationReport {
            entity: collection.to_string(),
            check: check.label.to_string(),
            ok: source_count == target_count,
            source_count,
            target_count,
            skipped: 0,
        })
    }

    /// Runs the document check and every embedded check, failing on the
    /// first mismatch.
    pub async fn verify<E: EntityTrait>(
        &self,
        source: &DatabaseConnection,
        filter: Option<sea_orm::Condition>,
        collection: &str,
        skipped: u64,
        embedded: &[EmbeddedCheck],
    ) -> Result<Vec<VerificationReport>, MigrationError>
    where
        E::Model: Sync,
    {
        let mut reports = Vec::with_capacity(embedded.len() + 1);
        reports.push(self.check_documents::<E>(source, filter, collection, skipped).await?);
        for check in embedded {
            reports.push(self.check_embedded(source, collection, check).await?);
        }

        for report in &reports {
            if report.ok {
                info!(
                    entity = %report.entity,
                    check = %report.check,
                    count = report.target_count,
                    "Verification passed"
                );
                continue;
            }
            counter!("migrator_verification.failures", 1, "collection" => collection.to_string());
            error!(
                entity = %report.entity,
                check = %report.check,
                source = report.source_count,
                target = report.target_count,
                skipped = report.skipped,
                "CRITICAL: verification mismatch"
            );
            return Err(report.clone().into_error());
        }
        Ok(reports)
    }
}
