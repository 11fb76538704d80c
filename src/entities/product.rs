use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product row; every child relation lives in a `product_*` table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_id: i32,
    pub model: String,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    #[sea_orm(nullable)]
    pub upc: Option<String>,
    #[sea_orm(nullable)]
    pub location: Option<String>,
    #[sea_orm(nullable)]
    pub quantity: Option<i32>,
    #[sea_orm(nullable)]
    pub stock_status_id: Option<i32>,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(nullable)]
    pub manufacturer_id: Option<i32>,
    #[sea_orm(nullable)]
    pub shipping: Option<bool>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(nullable)]
    pub points: Option<i32>,
    #[sea_orm(nullable)]
    pub tax_class_id: Option<i32>,
    #[sea_orm(nullable)]
    pub date_available: Option<DateTime>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub weight: Option<Decimal>,
    #[sea_orm(nullable)]
    pub weight_class_id: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub length: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub width: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub height: Option<Decimal>,
    #[sea_orm(nullable)]
    pub length_class_id: Option<i32>,
    #[sea_orm(nullable)]
    pub subtract: Option<bool>,
    #[sea_orm(nullable)]
    pub minimum: Option<i32>,
    #[sea_orm(nullable)]
    pub sort_order: Option<i32>,
    #[sea_orm(nullable)]
    pub status: Option<bool>,
    #[sea_orm(nullable)]
    pub viewed: Option<i32>,
    #[sea_orm(nullable)]
    pub date_added: Option<DateTime>,
    #[sea_orm(nullable)]
    pub date_modified: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
