use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "address")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub address_id: i32,
    pub customer_id: i32,
    pub firstname: String,
    pub lastname: String,
    #[sea_orm(nullable)]
    pub company: Option<String>,
    pub address_1: String,
    #[sea_orm(nullable)]
    pub address_2: Option<String>,
    pub city: String,
    #[sea_orm(nullable)]
    pub postcode: Option<String>,
    #[sea_orm(nullable)]
    pub country_id: Option<i32>,
    #[sea_orm(nullable)]
    pub zone_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_field: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::CustomerId"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
