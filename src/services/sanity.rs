//! Read-only sanity checks behind the `check` command.

use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::{info, warn};

use crate::documents::{
    Aggregate, CategoryDocument, CustomerDocument, ManufacturerDocument, OrderDocument,
    OrderStatusDocument, ProductDocument,
};
use crate::entities::*;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: None,
        }
    }

    fn fail(name: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: Some(detail.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub checks: Vec<CheckResult>,
}

impl CheckReport {
    pub fn ok(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.ok)
    }

    fn push(&mut self, result: CheckResult) {
        if result.ok {
            info!(check = %result.name, "ok");
        } else {
            warn!(check = %result.name, detail = ?result.detail, "check failed");
        }
        self.checks.push(result);
    }
}

/// One-row typed select: fails on a missing table or a column that no
/// longer decodes into the model.
async fn probe_table<E: EntityTrait>(db: &DatabaseConnection) -> CheckResult {
    let name = format!("source table {}", E::default().table_name());
    match E::find().one(db).await {
        Ok(_) => CheckResult::pass(name),
        Err(err) => CheckResult::fail(name, err),
    }
}

fn aggregate_shape<A: Aggregate>() -> CheckResult {
    let name = format!("aggregate {}", A::COLLECTION);
    match A::default().to_target() {
        Ok(doc) if doc.body.get(A::KEY_FIELD).is_some() => CheckResult::pass(name),
        Ok(_) => CheckResult::fail(name, format!("body has no {} field", A::KEY_FIELD)),
        Err(err) => CheckResult::fail(name, err),
    }
}

pub async fn source_checks(db: &DatabaseConnection) -> Vec<CheckResult> {
    if let Err(err) = crate::db::check_connection(db).await {
        return vec![CheckResult::fail("source reachable", err)];
    }
    vec![
        CheckResult::pass("source reachable"),
        probe_table::<manufacturer::Entity>(db).await,
        probe_table::<order_status::Entity>(db).await,
        probe_table::<customer::Entity>(db).await,
        probe_table::<address::Entity>(db).await,
        probe_table::<customer_wishlist::Entity>(db).await,
        probe_table::<category::Entity>(db).await,
        probe_table::<category_description::Entity>(db).await,
        probe_table::<product::Entity>(db).await,
        probe_table::<product_description::Entity>(db).await,
        probe_table::<product_to_category::Entity>(db).await,
        probe_table::<product_image::Entity>(db).await,
        probe_table::<product_attribute::Entity>(db).await,
        probe_table::<product_option::Entity>(db).await,
        probe_table::<product_option_value::Entity>(db).await,
        probe_table::<upload::Entity>(db).await,
        probe_table::<product_discount::Entity>(db).await,
        probe_table::<product_special::Entity>(db).await,
        probe_table::<product_to_download::Entity>(db).await,
        probe_table::<product_related::Entity>(db).await,
        probe_table::<order::Entity>(db).await,
        probe_table::<order_product::Entity>(db).await,
        probe_table::<order_option::Entity>(db).await,
    ]
}

pub fn aggregate_checks() -> Vec<CheckResult> {
    vec![
        aggregate_shape::<ManufacturerDocument>(),
        aggregate_shape::<OrderStatusDocument>(),
        aggregate_shape::<CustomerDocument>(),
        aggregate_shape::<CategoryDocument>(),
        aggregate_shape::<ProductDocument>(),
        aggregate_shape::<OrderDocument>(),
    ]
}

pub async fn target_checks(store: &dyn DocumentStore) -> Vec<CheckResult> {
    let backend = store.backend_name();
    let ping = match store.ping().await {
        Ok(()) => CheckResult::pass(format!("target {backend} reachable")),
        Err(err) => return vec![CheckResult::fail(format!("target {backend} reachable"), err)],
    };
    let schema = match store.probe_schema().await {
        Ok(()) => CheckResult::pass(format!("target {backend} schema")),
        Err(err) => CheckResult::fail(format!("target {backend} schema"), err),
    };
    vec![ping, schema]
}

/// Runs every check without writing to either store.
pub async fn run_checks(source: &DatabaseConnection, store: &dyn DocumentStore) -> CheckReport {
    let mut report = CheckReport::default();
    for result in source_checks(source)
        .await
        .into_iter()
        .chain(target_checks(store).await)
        .chain(aggregate_checks())
    {
        report.push(result);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_are_well_formed() {
        assert!(aggregate_checks().iter().all(|c| c.ok));
    }

    #[test]
    fn report_fails_on_any_failure() {
        let mut report = CheckReport::default();
        report.push(CheckResult::pass("a"));
        assert!(report.ok());
        report.push(CheckResult::fail("b", "missing"));
        assert!(!report.ok());
        assert_eq!(report.failures().count(), 1);
    }
}
