use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Aggregate, OpaqueDocument};

/// Confirmed order with its lines and their chosen options embedded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderDocument {
    pub order_id: i64,
    pub invoice_no: i64,
    pub invoice_prefix: String,
    pub store_id: i64,
    /// 0 for guest checkouts
    pub customer_id: i64,
    pub customer_group_id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub telephone: String,
    pub custom_field: OpaqueDocument,
    pub payment: OrderAddressBlock,
    pub shipping: OrderAddressBlock,
    pub comment: String,
    pub total: Decimal,
    pub order_status_id: i64,
    pub currency_code: String,
    pub currency_value: Decimal,
    pub ip: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub products: Vec<OrderProductDocument>,
}

/// Payment or shipping address as captured at checkout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderAddressBlock {
    pub firstname: String,
    pub lastname: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
    pub zone: String,
    pub method: String,
    pub code: String,
    pub custom_field: OpaqueDocument,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderProductDocument {
    /// Allocated from the `order_product_id` counter
    pub order_product_id: i64,
    pub product_id: i64,
    pub name: String,
    pub model: String,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub tax: Decimal,
    pub reward: i64,
    pub options: Vec<OrderOptionDocument>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderOptionDocument {
    /// Allocated from the `order_option_id` counter
    pub order_option_id: i64,
    pub product_option_id: i64,
    pub product_option_value_id: i64,
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub option_type: String,
}

impl Aggregate for OrderDocument {
    const COLLECTION: &'static str = "orders";
    const KEY_FIELD: &'static str = "order_id";

    fn key(&self) -> i64 {
        self.order_id
    }
}
