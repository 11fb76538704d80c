#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use commerce_migrator::entities::*;
use commerce_migrator::errors::StoreError;
use commerce_migrator::services::{PhaseOrchestrator, RunOptions};
use commerce_migrator::store::{
    DocumentStore, MemoryDocumentStore, StatusRecord, TargetDocument,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
};
use serde_json::Value;

/// Fresh in-memory source database with every storefront table created.
pub async fn source_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory source");
    create_table(&db, manufacturer::Entity).await;
    create_table(&db, order_status::Entity).await;
    create_table(&db, customer::Entity).await;
    create_table(&db, address::Entity).await;
    create_table(&db, customer_wishlist::Entity).await;
    create_table(&db, category::Entity).await;
    create_table(&db, category_description::Entity).await;
    create_table(&db, product::Entity).await;
    create_table(&db, product_description::Entity).await;
    create_table(&db, product_to_category::Entity).await;
    create_table(&db, product_image::Entity).await;
    create_table(&db, product_attribute::Entity).await;
    create_table(&db, product_option::Entity).await;
    create_table(&db, product_option_value::Entity).await;
    create_table(&db, upload::Entity).await;
    create_table(&db, product_discount::Entity).await;
    create_table(&db, product_special::Entity).await;
    create_table(&db, product_to_download::Entity).await;
    create_table(&db, product_related::Entity).await;
    create_table(&db, order::Entity).await;
    create_table(&db, order_product::Entity).await;
    create_table(&db, order_option::Entity).await;
    db
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let stmt = backend.build(&Schema::new(backend).create_table_from_entity(entity));
    db.execute(stmt).await.expect("failed to create source table");
}

pub fn orchestrator(
    source: &DatabaseConnection,
    store: Arc<dyn DocumentStore>,
    batch_size: u64,
) -> PhaseOrchestrator {
    PhaseOrchestrator::new(
        source.clone(),
        store,
        RunOptions {
            batch_size,
            skip_existing: true,
        },
    )
}

fn day(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub async fn seed_manufacturer(db: &DatabaseConnection, id: i32, name: &str) {
    manufacturer::ActiveModel {
        manufacturer_id: Set(id),
        name: Set(name.to_string()),
        image: Set(Some(format!("catalog/{}.png", name.to_lowercase()))),
        sort_order: Set(Some(0)),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_order_status(db: &DatabaseConnection, id: i32, name: &str) {
    order_status::ActiveModel {
        order_status_id: Set(id),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_customer(db: &DatabaseConnection, id: i32, default_address: Option<i32>) {
    customer::ActiveModel {
        customer_id: Set(id),
        firstname: Set(format!("First{id}")),
        lastname: Set(format!("Last{id}")),
        email: Set(format!("customer{id}@example.com")),
        address_id: Set(default_address),
        custom_field: Set(Some(r#"{"1":"VAT-123"}"#.to_string())),
        status: Set(Some(true)),
        date_added: Set(Some(day(2020, 5, 1))),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_address(db: &DatabaseConnection, id: i32, customer_id: i32, city: &str) {
    address::ActiveModel {
        address_id: Set(id),
        customer_id: Set(customer_id),
        firstname: Set("Ada".to_string()),
        lastname: Set("Lovelace".to_string()),
        address_1: Set(format!("{id} Main Street")),
        city: Set(city.to_string()),
        country_id: Set(Some(222)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_wishlist(db: &DatabaseConnection, customer_id: i32, product_id: i32) {
    customer_wishlist::ActiveModel {
        customer_id: Set(customer_id),
        product_id: Set(product_id),
        date_added: Set(Some(day(2021, 1, product_id as u32 % 28 + 1))),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_category(db: &DatabaseConnection, id: i32, parent: i32, name: &str) {
    category::ActiveModel {
        category_id: Set(id),
        parent_id: Set(Some(parent)),
        status: Set(Some(true)),
        date_added: Set(Some(day(2019, 3, 1))),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    category_description::ActiveModel {
        category_id: Set(id),
        language_id: Set(1),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_product(db: &DatabaseConnection, id: i32, manufacturer_id: i32) {
    product::ActiveModel {
        product_id: Set(id),
        model: Set(format!("Product {id}")),
        manufacturer_id: Set(Some(manufacturer_id)),
        price: Set(Some(Decimal::new(10_000 + i64::from(id), 4))),
        quantity: Set(Some(10)),
        status: Set(Some(true)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    product_description::ActiveModel {
        product_id: Set(id),
        language_id: Set(1),
        name: Set(format!("Product {id}")),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_product_category(db: &DatabaseConnection, product_id: i32, category_id: i32) {
    product_to_category::ActiveModel {
        product_id: Set(product_id),
        category_id: Set(category_id),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_product_option(
    db: &DatabaseConnection,
    id: i32,
    product_id: i32,
    option_id: i32,
) {
    product_option::ActiveModel {
        product_option_id: Set(id),
        product_id: Set(product_id),
        option_id: Set(option_id),
        required: Set(Some(true)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_option_value(
    db: &DatabaseConnection,
    id: i32,
    product_option_id: i32,
    product_id: i32,
    upload_id: Option<i32>,
) {
    product_option_value::ActiveModel {
        product_option_value_id: Set(id),
        product_option_id: Set(product_option_id),
        product_id: Set(product_id),
        option_id: Set(1),
        option_value_id: Set(id + 100),
        quantity: Set(Some(5)),
        price: Set(Some(Decimal::new(15_000, 4))),
        price_prefix: Set(Some("+".to_string())),
        upload_id: Set(upload_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_upload(db: &DatabaseConnection, id: i32, code: &str) {
    upload::ActiveModel {
        upload_id: Set(id),
        name: Set(format!("{code}.png")),
        filename: Set(format!("{code}.png.{id}")),
        code: Set(code.to_string()),
        date_added: Set(Some(day(2022, 2, 2))),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_order(db: &DatabaseConnection, id: i32, status: i32, customer_id: i32) {
    order::ActiveModel {
        order_id: Set(id),
        customer_id: Set(Some(customer_id)),
        firstname: Set("Ada".to_string()),
        lastname: Set("Lovelace".to_string()),
        email: Set("ada@example.com".to_string()),
        payment_city: Set(Some("London".to_string())),
        shipping_city: Set(Some("Paris".to_string())),
        total: Set(Some(Decimal::new(1_234_500, 4))),
        order_status_id: Set(status),
        currency_code: Set(Some("EUR".to_string())),
        currency_value: Set(Some(Decimal::new(1, 0))),
        date_added: Set(Some(day(2023, 6, 1))),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_order_product(
    db: &DatabaseConnection,
    id: i32,
    order_id: i32,
    product_id: i32,
) {
    order_product::ActiveModel {
        order_product_id: Set(id),
        order_id: Set(order_id),
        product_id: Set(product_id),
        name: Set(format!("Product {product_id}")),
        model: Set(format!("Model {product_id}")),
        quantity: Set(Some(1)),
        price: Set(Some(Decimal::new(100, 0))),
        total: Set(Some(Decimal::new(100, 0))),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_order_option(
    db: &DatabaseConnection,
    id: i32,
    order_id: i32,
    order_product_id: i32,
) {
    order_option::ActiveModel {
        order_option_id: Set(id),
        order_id: Set(order_id),
        order_product_id: Set(order_product_id),
        product_option_id: Set(Some(226)),
        product_option_value_id: Set(Some(15)),
        name: Set("Colour".to_string()),
        value: Set("Red".to_string()),
        option_type: Set("select".to_string()),
    }
    .insert(db)
    .await
    .unwrap();
}

/// Memory store that records the size of every bulk insert it receives.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryDocumentStore,
    inserts: Mutex<Vec<(String, usize)>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Batch sizes written to `collection`, in call order.
    pub fn batches(&self, collection: &str) -> Vec<usize> {
        self.inserts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, n)| *n)
            .collect()
    }

    pub fn total_inserts(&self) -> usize {
        self.inserts.lock().unwrap().len()
    }

    pub fn document(&self, collection: &str, key: i64) -> Value {
        self.inner
            .get(collection, key)
            .unwrap_or_else(|| panic!("{collection} #{key} not found"))
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.inner.count(collection).await
    }

    async fn insert_many_unordered(
        &self,
        collection: &str,
        docs: Vec<TargetDocument>,
    ) -> Result<u64, StoreError> {
        self.inserts
            .lock()
            .unwrap()
            .push((collection.to_string(), docs.len()));
        self.inner.insert_many_unordered(collection, docs).await
    }

    async fn scan(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TargetDocument>, StoreError> {
        self.inner.scan(collection, offset, limit).await
    }

    async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        self.inner.drop_collection(collection).await
    }

    async fn increment_counter(&self, name: &str) -> Result<i64, StoreError> {
        self.inner.increment_counter(name).await
    }

    async fn raise_counter(&self, name: &str, value: i64) -> Result<i64, StoreError> {
        self.inner.raise_counter(name, value).await
    }

    async fn counter_value(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.inner.counter_value(name).await
    }

    async fn load_status(&self, name: &str) -> Result<Option<StatusRecord>, StoreError> {
        self.inner.load_status(name).await
    }

    async fn save_status(&self, record: StatusRecord) -> Result<(), StoreError> {
        self.inner.save_status(record).await
    }

    async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError> {
        self.inner.list_statuses().await
    }

    async fn delete_status(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.delete_status(name).await
    }
}
