use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_special")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_special_id: i32,
    pub product_id: i32,
    #[sea_orm(nullable)]
    pub customer_group_id: Option<i32>,
    #[sea_orm(nullable)]
    pub priority: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(nullable)]
    pub date_start: Option<Date>,
    #[sea_orm(nullable)]
    pub date_end: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
