use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storefront customer account
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub customer_id: i32,
    #[sea_orm(nullable)]
    pub customer_group_id: Option<i32>,
    #[sea_orm(nullable)]
    pub store_id: Option<i32>,
    #[sea_orm(nullable)]
    pub language_id: Option<i32>,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[sea_orm(nullable)]
    pub telephone: Option<String>,
    #[sea_orm(nullable)]
    pub password: Option<String>,
    #[sea_orm(nullable)]
    pub newsletter: Option<bool>,
    /// Default address; 0 or NULL when the customer never picked one
    #[sea_orm(nullable)]
    pub address_id: Option<i32>,
    /// Free-form JSON written by storefront extensions
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_field: Option<String>,
    #[sea_orm(nullable)]
    pub ip: Option<String>,
    #[sea_orm(nullable)]
    pub status: Option<bool>,
    #[sea_orm(nullable)]
    pub safe: Option<bool>,
    #[sea_orm(nullable)]
    pub date_added: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::address::Entity")]
    Addresses,
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
