use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Additional gallery image; the main image is `product.image`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_image_id: i32,
    pub product_id: i32,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(nullable)]
    pub sort_order: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
