use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted lifecycle record of one migration phase
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "migration_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub status: String,
    #[sea_orm(nullable)]
    pub first_run: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub last_run: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub duration_seconds: Option<f64>,
    pub processed: i64,
    pub succeeded: i64,
    pub failed: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub stack: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub details: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
