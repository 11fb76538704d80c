use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog category; `parent_id` 0 or NULL marks a root
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub category_id: i32,
    #[sea_orm(nullable)]
    pub parent_id: Option<i32>,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(nullable)]
    pub top: Option<bool>,
    #[sea_orm(nullable)]
    pub sort_order: Option<i32>,
    #[sea_orm(nullable)]
    pub status: Option<bool>,
    #[sea_orm(nullable)]
    pub date_added: Option<DateTime>,
    #[sea_orm(nullable)]
    pub date_modified: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
