use serde::{Deserialize, Serialize};

use super::Aggregate;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManufacturerDocument {
    pub manufacturer_id: i64,
    pub name: String,
    pub image: String,
    pub sort_order: i64,
}

impl Aggregate for ManufacturerDocument {
    const COLLECTION: &'static str = "manufacturers";
    const KEY_FIELD: &'static str = "manufacturer_id";

    fn key(&self) -> i64 {
        self.manufacturer_id
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderStatusDocument {
    pub order_status_id: i64,
    pub name: String,
}

impl Aggregate for OrderStatusDocument {
    const COLLECTION: &'static str = "order_statuses";
    const KEY_FIELD: &'static str = "order_status_id";

    fn key(&self) -> i64 {
        self.order_status_id
    }
}
