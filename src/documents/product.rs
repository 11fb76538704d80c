use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Aggregate;

/// Catalog product with every `product_*` relation embedded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDocument {
    pub product_id: i64,
    pub model: String,
    pub sku: String,
    pub upc: String,
    pub location: String,
    pub quantity: i64,
    pub stock_status_id: i64,
    pub image: String,
    pub manufacturer_id: i64,
    pub shipping: bool,
    pub price: Decimal,
    pub points: i64,
    pub tax_class_id: i64,
    pub date_available: DateTime<Utc>,
    pub weight: Decimal,
    pub weight_class_id: i64,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub length_class_id: i64,
    pub subtract: bool,
    pub minimum: i64,
    pub sort_order: i64,
    pub status: bool,
    pub viewed: i64,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub descriptions: Vec<ProductDescriptionDocument>,
    /// Category ids
    pub categories: Vec<i64>,
    pub images: Vec<ProductImageDocument>,
    pub attributes: Vec<ProductAttributeDocument>,
    pub options: Vec<ProductOptionDocument>,
    pub discounts: Vec<ProductDiscountDocument>,
    pub specials: Vec<ProductSpecialDocument>,
    /// Download ids
    pub downloads: Vec<i64>,
    /// Related product ids
    pub related: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDescriptionDocument {
    pub language_id: i64,
    pub name: String,
    pub description: String,
    pub tag: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keyword: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductImageDocument {
    pub product_image_id: i64,
    pub image: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductAttributeDocument {
    pub attribute_id: i64,
    pub language_id: i64,
    pub text: String,
}

/// Option offered on the product.
///
/// `product_option_id` is local to the product document: options are
/// numbered from 1 in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductOptionDocument {
    pub product_option_id: i64,
    pub option_id: i64,
    pub value: String,
    pub required: bool,
    pub values: Vec<ProductOptionValueDocument>,
}

/// Selectable value of an option.
///
/// `product_option_value_id` is local to the product document and unique
/// across all of its options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductOptionValueDocument {
    pub product_option_value_id: i64,
    pub option_value_id: i64,
    pub quantity: i64,
    pub subtract: bool,
    pub price: Decimal,
    pub price_prefix: String,
    pub points: i64,
    pub points_prefix: String,
    pub weight: Decimal,
    pub weight_prefix: String,
    pub upload: Option<UploadDocument>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadDocument {
    pub upload_id: i64,
    pub name: String,
    pub filename: String,
    pub code: String,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDiscountDocument {
    pub customer_group_id: i64,
    pub quantity: i64,
    pub priority: i64,
    pub price: Decimal,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductSpecialDocument {
    pub customer_group_id: i64,
    pub priority: i64,
    pub price: Decimal,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

impl Aggregate for ProductDocument {
    const COLLECTION: &'static str = "products";
    const KEY_FIELD: &'static str = "product_id";

    fn key(&self) -> i64 {
        self.product_id
    }
}
