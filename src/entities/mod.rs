//! Source relational schema.
//!
//! Table and column names are fixed by the storefront database being migrated;
//! the transformers read them through these typed models only.
pub mod address;
pub mod category;
pub mod category_description;
pub mod customer;
pub mod customer_wishlist;
pub mod manufacturer;
pub mod order;
pub mod order_option;
pub mod order_product;
pub mod order_status;
pub mod product;
pub mod product_attribute;
pub mod product_description;
pub mod product_discount;
pub mod product_image;
pub mod product_option;
pub mod product_option_value;
pub mod product_related;
pub mod product_special;
pub mod product_to_category;
pub mod product_to_download;
pub mod upload;

// Re-export entities
pub use address::{Entity as Address, Model as AddressModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use manufacturer::{Entity as Manufacturer, Model as ManufacturerModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_status::{Entity as OrderStatus, Model as OrderStatusModel};
pub use product::{Entity as Product, Model as ProductModel};
