mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use commerce_migrator::errors::MigrationError;
use commerce_migrator::services::{
    PhaseName, PhaseOutcome, PhaseState, SequenceAllocator, SequenceKind,
};
use commerce_migrator::store::{DocumentStore, MemoryDocumentStore, TargetDocument};
use serde_json::json;

use common::*;

#[tokio::test]
async fn customers_embed_their_address_book() {
    let source = source_db().await;
    seed_customer(&source, 7, None).await;
    seed_customer(&source, 12, Some(31)).await;
    seed_customer(&source, 19, None).await;
    seed_address(&source, 30, 12, "Leeds").await;
    seed_address(&source, 31, 12, "York").await;
    seed_wishlist(&source, 7, 40).await;
    seed_wishlist(&source, 7, 41).await;

    let store = Arc::new(MemoryDocumentStore::new());
    let report = orchestrator(&source, store.clone(), 100)
        .run_phase(PhaseName::Users)
        .await
        .unwrap();

    assert_eq!(report.outcome, PhaseOutcome::Completed);
    let customers = &report.entities[0];
    assert_eq!(customers.counters.processed, 3);
    assert_eq!(customers.counters.succeeded, 3);
    let documents = &customers.verification[0];
    assert!(documents.ok);
    assert_eq!((documents.source_count, documents.target_count), (3, 3));
    assert!(customers.verification.iter().all(|v| v.ok));

    let doc = store.get("customers", 12).unwrap();
    let addresses = doc["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0]["city"], "Leeds");
    assert_eq!(addresses[0]["default"], false);
    assert_eq!(addresses[1]["default"], true);
    assert_eq!(doc["custom_field"], json!({"1": "VAT-123"}));

    let doc = store.get("customers", 7).unwrap();
    assert_eq!(doc["addresses"], json!([]));
    assert_eq!(doc["wishlist"], json!([40, 41]));
    assert_eq!(doc["telephone"], "");

    assert_eq!(store.count_embedded("customers", "addresses").await.unwrap(), 2);
    assert_eq!(store.counter_value("customer_id").await.unwrap(), Some(19));
}

#[tokio::test]
async fn order_counter_continues_after_existing_maximum() {
    let store = Arc::new(MemoryDocumentStore::new());
    store
        .insert_many_unordered(
            "orders",
            vec![
                TargetDocument::new(17, json!({"order_id": 17})),
                TargetDocument::new(4500, json!({"order_id": 4500})),
            ],
        )
        .await
        .unwrap();

    let ids = SequenceAllocator::new(store.clone());
    ids.initialize(&[SequenceKind::Order]).await.unwrap();
    assert_eq!(ids.next_id(SequenceKind::Order).await.unwrap(), 4501);
    assert_eq!(ids.next_id(SequenceKind::Order).await.unwrap(), 4502);

    // Repeating the bootstrap never rewinds the counter.
    ids.initialize(&[SequenceKind::Order]).await.unwrap();
    assert_eq!(ids.next_id(SequenceKind::Order).await.unwrap(), 4503);
}

#[tokio::test]
async fn five_rows_in_batches_of_two() {
    let source = source_db().await;
    for (id, name) in [(1, "Apple"), (2, "Canon"), (3, "Sony"), (4, "HTC"), (5, "Palm")] {
        seed_manufacturer(&source, id, name).await;
    }
    seed_order_status(&source, 1, "Pending").await;

    let store = RecordingStore::new();
    let report = orchestrator(&source, store.clone(), 2)
        .run_phase(PhaseName::Lookups)
        .await
        .unwrap();

    assert_eq!(store.batches("manufacturers"), vec![2, 2, 1]);
    assert_eq!(store.batches("order_statuses"), vec![1]);
    assert_eq!(report.entities[0].batches, 3);
    assert_eq!(report.entities[0].counters.succeeded, 5);
    assert_eq!(store.document("manufacturers", 3)["name"], "Sony");
}

#[tokio::test]
async fn populated_collection_skips_the_phase() {
    let source = source_db().await;
    seed_customer(&source, 1, None).await;

    let store = RecordingStore::new();
    let existing: Vec<TargetDocument> = (1..=100)
        .map(|id| TargetDocument::new(id, json!({"customer_id": id})))
        .collect();
    store
        .inner
        .insert_many_unordered("customers", existing)
        .await
        .unwrap();

    let migrator = orchestrator(&source, store.clone(), 10);
    let report = migrator.run_phase(PhaseName::Users).await.unwrap();

    assert_eq!(report.outcome, PhaseOutcome::Skipped);
    assert_eq!(store.total_inserts(), 0);
    assert_eq!(store.count("customers").await.unwrap(), 100);

    let record = migrator.status().get("phase4").await.unwrap().unwrap();
    assert_eq!(record.status, "completed");
    assert_eq!(record.details["skipped"], true);

    // A completed phase is skipped on every later run as well.
    let again = migrator.run_phase(PhaseName::Users).await.unwrap();
    assert_eq!(again.outcome, PhaseOutcome::Skipped);
    assert_eq!(store.total_inserts(), 0);
}

#[tokio::test]
async fn one_failing_row_fails_verification() {
    let source = source_db().await;
    seed_manufacturer(&source, 8, "Apple").await;
    for id in 1..=5 {
        seed_product(&source, id, 8).await;
    }
    // Product 3 carries an option value whose option does not exist.
    seed_product_option(&source, 1, 3, 5).await;
    seed_option_value(&source, 1, 1, 3, None).await;
    seed_option_value(&source, 2, 999, 3, None).await;

    let store = RecordingStore::new();
    let migrator = orchestrator(&source, store.clone(), 5);
    let err = migrator.run_phase(PhaseName::Products).await.unwrap_err();

    assert!(err.is_critical());
    assert_matches!(
        err,
        MigrationError::VerificationFailed { source_count: 5, target_count: 4, .. }
    );
    assert_eq!(store.batches("products"), vec![4]);

    let record = migrator.status().get("phase6").await.unwrap().unwrap();
    assert_eq!(record.status, "failed");
    assert_eq!(
        (record.processed, record.succeeded, record.failed),
        (5, 4, 1)
    );
    assert!(record.error.unwrap().starts_with("CRITICAL"));
    assert_eq!(
        migrator.status().state("phase6").await.unwrap(),
        PhaseState::Failed
    );
}
