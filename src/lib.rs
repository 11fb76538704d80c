//! Commerce migrator library
//!
//! Moves a relational storefront database into a document store, one phase at
//! a time. Each phase extracts source rows in primary-key order, builds one
//! denormalized aggregate per row, bulk-loads the aggregates and refuses to
//! complete unless source and target counts agree.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod documents;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod models;
pub mod services;
pub mod store;
pub mod transform;

use std::sync::Arc;

use tracing::info;

use crate::config::MigratorConfig;
use crate::errors::MigrationError;
use crate::services::{PhaseOrchestrator, RunOptions};
use crate::store::DocumentStore;

/// Opens both stores and builds an orchestrator from `cfg`. The target
/// bookkeeping schema is installed when missing.
pub async fn connect(cfg: &MigratorConfig) -> Result<PhaseOrchestrator, MigrationError> {
    let source = db::establish_connection_with_config(&db::DbConfig::source(cfg)).await?;
    let target: Arc<dyn DocumentStore> = store::connect_target(cfg, true).await?;
    info!(
        target = target.backend_name(),
        batch_size = cfg.batch_size,
        skip_existing = cfg.skip_existing,
        "Stores connected"
    );
    Ok(PhaseOrchestrator::new(
        source,
        target,
        RunOptions::from_config(cfg),
    ))
}

pub mod prelude {
    pub use crate::config::*;
    pub use crate::documents::*;
    pub use crate::errors::*;
    pub use crate::services::*;
    pub use crate::store::{DocumentStore, MemoryDocumentStore, SqlDocumentStore, TargetDocument};
    pub use crate::transform::{TransformContext, Transformer};
}
