//! Denormalized aggregates written to the target store.
//!
//! Field and collection names are a contract with the API layer that reads
//! the target store; change them only together with that layer.

use serde::Serialize;

use crate::store::TargetDocument;

pub mod category;
pub mod customer;
pub mod lookup;
pub mod opaque;
pub mod order;
pub mod product;

pub use category::{CategoryDescriptionDocument, CategoryDocument};
pub use customer::{AddressDocument, CustomerDocument};
pub use lookup::{ManufacturerDocument, OrderStatusDocument};
pub use opaque::OpaqueDocument;
pub use order::{OrderAddressBlock, OrderDocument, OrderOptionDocument, OrderProductDocument};
pub use product::{
    ProductAttributeDocument, ProductDescriptionDocument, ProductDiscountDocument,
    ProductDocument, ProductImageDocument, ProductOptionDocument, ProductOptionValueDocument,
    ProductSpecialDocument, UploadDocument,
};

/// A top-level document of one target collection.
pub trait Aggregate: Serialize + Default + Send + Sync + 'static {
    /// Target collection name.
    const COLLECTION: &'static str;
    /// Body field holding the primary key.
    const KEY_FIELD: &'static str;

    fn key(&self) -> i64;

    fn to_target(&self) -> Result<TargetDocument, serde_json::Error> {
        Ok(TargetDocument::new(self.key(), serde_json::to_value(self)?))
    }
}
