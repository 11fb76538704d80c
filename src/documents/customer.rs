use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Aggregate, OpaqueDocument};

/// Customer account with its address book and wishlist embedded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerDocument {
    pub customer_id: i64,
    pub customer_group_id: i64,
    pub store_id: i64,
    pub language_id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub telephone: String,
    /// Password hash as stored by the storefront
    pub password: String,
    pub newsletter: bool,
    /// Source id of the default address, 0 when none was chosen
    pub address_id: i64,
    pub custom_field: OpaqueDocument,
    pub ip: String,
    pub status: bool,
    pub safe: bool,
    pub date_added: DateTime<Utc>,
    /// Source address rows in ascending `address_id` order
    pub addresses: Vec<AddressDocument>,
    /// Product ids, oldest entry first
    pub wishlist: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AddressDocument {
    pub address_id: i64,
    pub firstname: String,
    pub lastname: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub postcode: String,
    pub country_id: i64,
    pub zone_id: i64,
    pub custom_field: OpaqueDocument,
    pub default: bool,
}

impl Aggregate for CustomerDocument {
    const COLLECTION: &'static str = "customers";
    const KEY_FIELD: &'static str = "customer_id";

    fn key(&self) -> i64 {
        self.customer_id
    }
}
