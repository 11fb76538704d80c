use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Option chosen for one ordered product line
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_option")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub order_option_id: i32,
    pub order_id: i32,
    pub order_product_id: i32,
    #[sea_orm(nullable)]
    pub product_option_id: Option<i32>,
    #[sea_orm(nullable)]
    pub product_option_value_id: Option<i32>,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    #[sea_orm(column_name = "type")]
    pub option_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::OrderId"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
