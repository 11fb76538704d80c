mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use commerce_migrator::errors::MigrationError;
use commerce_migrator::services::{PhaseName, PhaseOutcome, PhaseState, SequenceKind};
use commerce_migrator::store::{DocumentStore, MemoryDocumentStore, TargetDocument};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

use common::*;

async fn storefront() -> sea_orm::DatabaseConnection {
    let source = source_db().await;
    seed_manufacturer(&source, 5, "Apple").await;
    seed_order_status(&source, 1, "Pending").await;
    seed_order_status(&source, 5, "Complete").await;
    seed_customer(&source, 1, Some(1)).await;
    seed_address(&source, 1, 1, "Leeds").await;
    seed_category(&source, 20, 0, "Desktops").await;
    seed_category(&source, 26, 20, "PC").await;
    seed_product(&source, 40, 5).await;
    seed_product_category(&source, 40, 26).await;
    seed_order(&source, 1, 5, 1).await;
    seed_order_product(&source, 1, 1, 40).await;
    source
}

#[tokio::test]
async fn run_all_loads_every_phase_in_order() {
    let source = storefront().await;
    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = orchestrator(&source, store.clone(), 50);

    let reports = migrator.run_all(&PhaseName::all()).await.unwrap();
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.outcome == PhaseOutcome::Completed));

    for collection in ["manufacturers", "order_statuses", "customers", "categories", "products", "orders"] {
        assert!(store.count(collection).await.unwrap() > 0, "{collection}");
    }
    let product = store.get("products", 40).unwrap();
    assert_eq!(product["manufacturer_id"], 5);
    assert_eq!(product["categories"], json!([26]));

    let status = migrator.status().report(&PhaseName::known()).await.unwrap();
    assert_eq!(status.completed, 5);
    assert_eq!(status.progress_percent, 100.0);
    assert!(status
        .phases
        .iter()
        .all(|p| p.success_rate == Some(100.0) || p.record.processed == 0));
}

#[tokio::test]
async fn run_all_stops_at_the_first_failed_phase() {
    let source = storefront().await;
    // 30 -> 31 -> 30 makes the category tree cyclic.
    seed_category(&source, 30, 31, "Loop A").await;
    seed_category(&source, 31, 30, "Loop B").await;

    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = orchestrator(&source, store.clone(), 50);
    let err = migrator.run_all(&PhaseName::all()).await.unwrap_err();
    assert!(err.is_critical());

    let status = migrator.status();
    assert_eq!(status.state("phase1").await.unwrap(), PhaseState::Completed);
    assert_eq!(status.state("phase4").await.unwrap(), PhaseState::Completed);
    assert_eq!(status.state("phase5").await.unwrap(), PhaseState::Failed);
    assert_eq!(status.state("phase6").await.unwrap(), PhaseState::Pending);
    assert_eq!(status.state("phase7").await.unwrap(), PhaseState::Pending);
    assert_eq!(store.count("products").await.unwrap(), 0);

    let failed = status.get("phase5").await.unwrap().unwrap();
    assert_eq!(failed.failed, 2);
    assert!(failed.stack.unwrap().contains("categories"));
}

#[tokio::test]
async fn failed_phase_needs_a_reset_before_rerunning() {
    let source = storefront().await;
    seed_category(&source, 30, 31, "Loop A").await;
    seed_category(&source, 31, 30, "Loop B").await;

    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = orchestrator(&source, store.clone(), 50);
    migrator.run_phase(PhaseName::Catalog).await.unwrap_err();
    assert_eq!(store.count("categories").await.unwrap(), 2);

    let err = migrator.run_phase(PhaseName::Catalog).await.unwrap_err();
    assert_matches!(err, MigrationError::ResetRequired { ref state, .. } if state == "failed");

    // Fix the source, then reset and rerun.
    commerce_migrator::entities::category::ActiveModel {
        category_id: Set(31),
        parent_id: Set(Some(20)),
        ..Default::default()
    }
    .update(&source)
    .await
    .unwrap();

    assert_eq!(migrator.reset_phase(PhaseName::Catalog).await.unwrap(), 2);
    assert_eq!(
        migrator.status().state("phase5").await.unwrap(),
        PhaseState::Pending
    );
    let report = migrator.run_phase(PhaseName::Catalog).await.unwrap();
    assert_eq!(report.outcome, PhaseOutcome::Completed);
    assert_eq!(store.count("categories").await.unwrap(), 4);

    let looped = store.get("categories", 30).unwrap();
    assert_eq!(looped["path"], json!([20, 31, 30]));
    assert_eq!(looped["level"], 2);

    let record = migrator.status().get("phase5").await.unwrap().unwrap();
    assert!(record.first_run.is_some());
    assert!(record.error.is_none());
}

#[tokio::test]
async fn orphan_categories_become_roots() {
    let source = source_db().await;
    seed_category(&source, 20, 0, "Desktops").await;
    seed_category(&source, 46, 99, "Macs").await;
    seed_category(&source, 47, 46, "iMac").await;

    let store = Arc::new(MemoryDocumentStore::new());
    orchestrator(&source, store.clone(), 2)
        .run_phase(PhaseName::Catalog)
        .await
        .unwrap();

    let orphan = store.get("categories", 46).unwrap();
    assert_eq!(orphan["parent_id"], 99);
    assert_eq!(orphan["path"], json!([46]));
    assert_eq!(orphan["level"], 0);
    assert_eq!(store.get("categories", 47).unwrap()["path"], json!([46, 47]));
    assert_eq!(
        store.get("categories", 20).unwrap()["descriptions"][0]["name"],
        "Desktops"
    );
}

#[tokio::test]
async fn products_renumber_options_and_embed_uploads() {
    let source = source_db().await;
    seed_product(&source, 42, 0).await;
    seed_product(&source, 43, 0).await;
    seed_product_option(&source, 226, 42, 5).await;
    seed_product_option(&source, 218, 42, 2).await;
    seed_product_option(&source, 300, 43, 5).await;
    seed_upload(&source, 9, "swatch").await;
    seed_option_value(&source, 15, 226, 42, None).await;
    seed_option_value(&source, 16, 226, 42, Some(9)).await;
    seed_option_value(&source, 7, 218, 42, None).await;
    seed_option_value(&source, 50, 300, 43, None).await;

    let store = Arc::new(MemoryDocumentStore::new());
    let report = orchestrator(&source, store.clone(), 10)
        .run_phase(PhaseName::Products)
        .await
        .unwrap();
    let checks: Vec<&str> = report.entities[0]
        .verification
        .iter()
        .map(|v| v.check.as_str())
        .collect();
    assert_eq!(
        checks,
        vec!["documents", "descriptions", "categories", "images", "options", "option values"]
    );

    let product = store.get("products", 42).unwrap();
    let options = product["options"].as_array().unwrap();
    // Options follow source order (218 before 226) and are renumbered from 1.
    assert_eq!(options[0]["product_option_id"], 1);
    assert_eq!(options[0]["option_id"], 2);
    assert_eq!(options[1]["product_option_id"], 2);
    let value_ids: Vec<i64> = options
        .iter()
        .flat_map(|o| o["values"].as_array().unwrap().iter())
        .map(|v| v["product_option_value_id"].as_i64().unwrap())
        .collect();
    assert_eq!(value_ids, vec![1, 2, 3]);
    assert_eq!(options[1]["values"][1]["upload"]["code"], "swatch");
    assert!(options[1]["values"][0]["upload"].is_null());

    let other = store.get("products", 43).unwrap();
    assert_eq!(other["options"][0]["values"][0]["product_option_value_id"], 1);
    assert_eq!(store.count_embedded("products", "options.values").await.unwrap(), 4);
}

#[tokio::test]
async fn orders_allocate_line_and_option_ids() {
    let source = source_db().await;
    seed_order(&source, 1, 5, 3).await;
    seed_order(&source, 2, 0, 3).await;
    seed_order(&source, 3, 2, 0).await;
    seed_order_product(&source, 10, 1, 40).await;
    seed_order_product(&source, 11, 1, 41).await;
    seed_order_product(&source, 12, 2, 40).await;
    seed_order_product(&source, 13, 3, 42).await;
    seed_order_option(&source, 100, 1, 11).await;
    seed_order_option(&source, 101, 1, 11).await;
    seed_order_option(&source, 102, 2, 12).await;

    let store = Arc::new(MemoryDocumentStore::new());
    store
        .insert_many_unordered(
            "orders",
            vec![TargetDocument::new(
                900,
                json!({"order_id": 900, "products": [{"order_product_id": 70, "options": [{"order_option_id": 8}]}]}),
            )],
        )
        .await
        .unwrap();
    let store_dyn: Arc<dyn DocumentStore> = store.clone();
    let migrator = commerce_migrator::services::PhaseOrchestrator::new(
        source.clone(),
        store_dyn,
        commerce_migrator::services::RunOptions {
            batch_size: 10,
            skip_existing: false,
        },
    );
    let err = migrator.run_phase(PhaseName::Orders).await.unwrap_err();
    // The pre-existing document is counted by the verification as well.
    assert_matches!(err, MigrationError::VerificationFailed { source_count: 2, target_count: 3, .. });

    let order = store.get("orders", 1).unwrap();
    let lines = order["products"].as_array().unwrap();
    assert_eq!(lines[0]["order_product_id"], 71);
    assert_eq!(lines[1]["order_product_id"], 72);
    assert_eq!(lines[1]["options"][0]["order_option_id"], 9);
    assert_eq!(lines[1]["options"][1]["order_option_id"], 10);
    assert_eq!(lines[1]["options"][0]["type"], "select");
    assert_eq!(order["shipping"]["city"], "Paris");
    assert_eq!(order["payment"]["city"], "London");
    assert!(store.get("orders", 2).is_none());
    assert_eq!(store.get("orders", 3).unwrap()["customer_id"], 0);
}

#[tokio::test]
async fn orders_verify_against_confirmed_orders_only() {
    let source = source_db().await;
    seed_order(&source, 1, 5, 3).await;
    seed_order(&source, 2, 0, 3).await;
    seed_order_product(&source, 10, 1, 40).await;
    seed_order_product(&source, 12, 2, 40).await;
    seed_order_option(&source, 100, 1, 10).await;
    seed_order_option(&source, 102, 2, 12).await;

    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = orchestrator(&source, store.clone(), 10);
    let report = migrator.run_phase(PhaseName::Orders).await.unwrap();

    let counts: Vec<(String, u64, u64)> = report.entities[0]
        .verification
        .iter()
        .map(|v| (v.check.clone(), v.source_count, v.target_count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("documents".to_string(), 1, 1),
            ("products".to_string(), 1, 1),
            ("product options".to_string(), 1, 1),
        ]
    );
    assert_eq!(store.counter_value("order_id").await.unwrap(), Some(1));
    assert_eq!(store.counter_value("order_product_id").await.unwrap(), Some(1));
    assert_eq!(store.counter_value("order_option_id").await.unwrap(), Some(1));
}

#[tokio::test]
async fn orders_fall_back_to_local_ids_when_counters_fail() {
    let source = source_db().await;
    seed_order(&source, 1, 5, 3).await;
    seed_order_product(&source, 10, 1, 40).await;
    seed_order_product(&source, 11, 1, 41).await;

    let store = Arc::new(MemoryDocumentStore::new());
    store.raise_counter("order_product_id", 500).await.unwrap();
    store.set_counters_unavailable(true);

    let migrator = orchestrator(&source, store.clone(), 10);
    migrator.run_phase(PhaseName::Orders).await.unwrap();
    assert!(migrator.ids().is_degraded(SequenceKind::OrderProduct));

    let lines = store.get("orders", 1).unwrap()["products"].clone();
    assert_eq!(lines[0]["order_product_id"], 501);
    assert_eq!(lines[1]["order_product_id"], 502);
}

#[tokio::test]
async fn lost_target_store_fails_the_phase() {
    let source = storefront().await;
    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = orchestrator(&source, store.clone(), 50);
    migrator.run_phase(PhaseName::Lookups).await.unwrap();

    store.set_unavailable(true);
    let err = migrator.run_phase(PhaseName::Users).await.unwrap_err();
    assert!(err.is_fatal());
    assert_matches!(err, MigrationError::Store(_));

    store.set_unavailable(false);
    assert_eq!(store.count("customers").await.unwrap(), 0);
    assert_eq!(
        migrator.status().state("phase4").await.unwrap(),
        PhaseState::Pending
    );
}
