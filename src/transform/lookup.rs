use async_trait::async_trait;

use super::{normalize, TransformContext, Transformer};
use crate::documents::{ManufacturerDocument, OrderStatusDocument};
use crate::entities::{manufacturer, order_status};
use crate::errors::MigrationError;

#[derive(Debug, Default)]
pub struct ManufacturerTransformer;

#[async_trait]
impl Transformer for ManufacturerTransformer {
    type Source = manufacturer::Entity;
    const TABLE: &'static str = "manufacturer";
    type Output = ManufacturerDocument;

    async fn transform(
        &self,
        row: manufacturer::Model,
        _ctx: &TransformContext<'_>,
    ) -> Result<Option<ManufacturerDocument>, MigrationError> {
        Ok(Some(ManufacturerDocument {
            manufacturer_id: row.manufacturer_id.into(),
            name: row.name,
            image: normalize::text(row.image),
            sort_order: normalize::int(row.sort_order),
        }))
    }
}

#[derive(Debug, Default)]
pub struct OrderStatusTransformer;

#[async_trait]
impl Transformer for OrderStatusTransformer {
    type Source = order_status::Entity;
    const TABLE: &'static str = "order_status";
    type Output = OrderStatusDocument;

    async fn transform(
        &self,
        row: order_status::Model,
        _ctx: &TransformContext<'_>,
    ) -> Result<Option<OrderStatusDocument>, MigrationError> {
        Ok(Some(OrderStatusDocument {
            order_status_id: row.order_status_id.into(),
            name: row.name,
        }))
    }
}
