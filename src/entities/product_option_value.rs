use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_option_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_option_value_id: i32,
    pub product_option_id: i32,
    pub product_id: i32,
    pub option_id: i32,
    pub option_value_id: i32,
    #[sea_orm(nullable)]
    pub quantity: Option<i32>,
    #[sea_orm(nullable)]
    pub subtract: Option<bool>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(nullable)]
    pub price_prefix: Option<String>,
    #[sea_orm(nullable)]
    pub points: Option<i32>,
    #[sea_orm(nullable)]
    pub points_prefix: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub weight: Option<Decimal>,
    #[sea_orm(nullable)]
    pub weight_prefix: Option<String>,
    /// Sample file attached by the merchant, see `upload`
    #[sea_orm(nullable)]
    pub upload_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
