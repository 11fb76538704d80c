use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storefront order header with denormalized payment and shipping addresses.
///
/// `order_status_id` 0 marks a checkout that was never confirmed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub order_id: i32,
    #[sea_orm(nullable)]
    pub invoice_no: Option<i32>,
    #[sea_orm(nullable)]
    pub invoice_prefix: Option<String>,
    #[sea_orm(nullable)]
    pub store_id: Option<i32>,
    #[sea_orm(nullable)]
    pub customer_id: Option<i32>,
    #[sea_orm(nullable)]
    pub customer_group_id: Option<i32>,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[sea_orm(nullable)]
    pub telephone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_field: Option<String>,
    #[sea_orm(nullable)]
    pub payment_firstname: Option<String>,
    #[sea_orm(nullable)]
    pub payment_lastname: Option<String>,
    #[sea_orm(nullable)]
    pub payment_company: Option<String>,
    #[sea_orm(nullable)]
    pub payment_address_1: Option<String>,
    #[sea_orm(nullable)]
    pub payment_address_2: Option<String>,
    #[sea_orm(nullable)]
    pub payment_city: Option<String>,
    #[sea_orm(nullable)]
    pub payment_postcode: Option<String>,
    #[sea_orm(nullable)]
    pub payment_country: Option<String>,
    #[sea_orm(nullable)]
    pub payment_zone: Option<String>,
    #[sea_orm(nullable)]
    pub payment_method: Option<String>,
    #[sea_orm(nullable)]
    pub payment_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_custom_field: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_firstname: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_lastname: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_company: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_address_1: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_address_2: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_city: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_postcode: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_country: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_zone: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_method: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub shipping_custom_field: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub total: Option<Decimal>,
    pub order_status_id: i32,
    #[sea_orm(nullable)]
    pub currency_code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 8)))", nullable)]
    pub currency_value: Option<Decimal>,
    #[sea_orm(nullable)]
    pub ip: Option<String>,
    #[sea_orm(nullable)]
    pub date_added: Option<DateTime>,
    #[sea_orm(nullable)]
    pub date_modified: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_product::Entity")]
    OrderProducts,
    #[sea_orm(has_many = "super::order_option::Entity")]
    OrderOptions,
}

impl Related<super::order_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderProducts.def()
    }
}

impl Related<super::order_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderOptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
