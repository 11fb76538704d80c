use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

use super::{normalize, related_error, EmbeddedCheck, TransformContext, Transformer};
use crate::documents::{
    OpaqueDocument, OrderAddressBlock, OrderDocument, OrderOptionDocument, OrderProductDocument,
};
use crate::entities::{order, order_option, order_product};
use crate::errors::MigrationError;
use crate::services::sequence::SequenceKind;

const ENTITY: &str = "orders";

/// Builds confirmed orders. Abandoned checkouts (`order_status_id = 0`) are
/// never extracted.
#[derive(Debug, Default)]
pub struct OrderTransformer;

fn confirmed() -> Condition {
    Condition::all().add(order::Column::OrderStatusId.gt(0))
}

/// Groups option rows by the source order line they belong to. An option
/// whose line is not part of the order fails the row.
fn group_options(
    key: i64,
    lines: &[order_product::Model],
    options: Vec<order_option::Model>,
) -> Result<HashMap<i32, Vec<order_option::Model>>, MigrationError> {
    let mut grouped: HashMap<i32, Vec<order_option::Model>> = lines
        .iter()
        .map(|line| (line.order_product_id, Vec::new()))
        .collect();
    for option in options {
        match grouped.get_mut(&option.order_product_id) {
            Some(bucket) => bucket.push(option),
            None => {
                return Err(MigrationError::transform(
                    ENTITY,
                    key,
                    format!(
                        "order_option {} references order_product {}, which is not a line of this order",
                        option.order_option_id, option.order_product_id
                    ),
                ))
            }
        }
    }
    Ok(grouped)
}

#[allow(clippy::too_many_arguments)]
fn address_block(
    firstname: Option<String>,
    lastname: Option<String>,
    company: Option<String>,
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    zone: Option<String>,
    method: Option<String>,
    code: Option<String>,
    custom_field: Option<String>,
) -> OrderAddressBlock {
    OrderAddressBlock {
        firstname: normalize::text(firstname),
        lastname: normalize::text(lastname),
        company: normalize::text(company),
        address_1: normalize::text(address_1),
        address_2: normalize::text(address_2),
        city: normalize::text(city),
        postcode: normalize::text(postcode),
        country: normalize::text(country),
        zone: normalize::text(zone),
        method: normalize::text(method),
        code: normalize::text(code),
        custom_field: OpaqueDocument::from_source(custom_field.as_deref()),
    }
}

#[async_trait]
impl Transformer for OrderTransformer {
    type Source = order::Entity;
    const TABLE: &'static str = "order";
    type Output = OrderDocument;

    fn related_tables(&self) -> &'static [&'static str] {
        &["order_product", "order_option"]
    }

    fn filter(&self) -> Option<Condition> {
        Some(confirmed())
    }

    async fn transform(
        &self,
        row: order::Model,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<OrderDocument>, MigrationError> {
        let key = i64::from(row.order_id);

        let (lines, options) = tokio::try_join!(
            order_product::Entity::find()
                .filter(order_product::Column::OrderId.eq(row.order_id))
                .order_by_asc(order_product::Column::OrderProductId)
                .all(ctx.source),
            order_option::Entity::find()
                .filter(order_option::Column::OrderId.eq(row.order_id))
                .order_by_asc(order_option::Column::OrderOptionId)
                .all(ctx.source),
        )
        .map_err(related_error(ENTITY, key))?;

        let mut grouped = group_options(key, &lines, options)?;

        let mut products = Vec::with_capacity(lines.len());
        for line in lines {
            let order_product_id = ctx.ids.next_id(SequenceKind::OrderProduct).await?;
            let mut chosen = Vec::new();
            for option in grouped.remove(&line.order_product_id).unwrap_or_default() {
                chosen.push(OrderOptionDocument {
                    order_option_id: ctx.ids.next_id(SequenceKind::OrderOption).await?,
                    product_option_id: normalize::reference(option.product_option_id),
                    product_option_value_id: normalize::reference(option.product_option_value_id),
                    name: option.name,
                    value: option.value,
                    option_type: option.option_type,
                });
            }
            products.push(OrderProductDocument {
                order_product_id,
                product_id: line.product_id.into(),
                name: line.name,
                model: line.model,
                quantity: normalize::int(line.quantity),
                price: normalize::amount(line.price),
                total: normalize::amount(line.total),
                tax: normalize::amount(line.tax),
                reward: normalize::int(line.reward),
                options: chosen,
            });
        }

        Ok(Some(OrderDocument {
            order_id: key,
            invoice_no: normalize::int(row.invoice_no),
            invoice_prefix: normalize::text(row.invoice_prefix),
            store_id: normalize::int(row.store_id),
            customer_id: normalize::reference(row.customer_id),
            customer_group_id: normalize::reference(row.customer_group_id),
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            telephone: normalize::text(row.telephone),
            custom_field: OpaqueDocument::from_source(row.custom_field.as_deref()),
            payment: address_block(
                row.payment_firstname,
                row.payment_lastname,
                row.payment_company,
                row.payment_address_1,
                row.payment_address_2,
                row.payment_city,
                row.payment_postcode,
                row.payment_country,
                row.payment_zone,
                row.payment_method,
                row.payment_code,
                row.payment_custom_field,
            ),
            shipping: address_block(
                row.shipping_firstname,
                row.shipping_lastname,
                row.shipping_company,
                row.shipping_address_1,
                row.shipping_address_2,
                row.shipping_city,
                row.shipping_postcode,
                row.shipping_country,
                row.shipping_zone,
                row.shipping_method,
                row.shipping_code,
                row.shipping_custom_field,
            ),
            comment: normalize::text(row.comment),
            total: normalize::amount(row.total),
            order_status_id: row.order_status_id.into(),
            currency_code: normalize::text(row.currency_code),
            currency_value: normalize::amount(row.currency_value),
            ip: normalize::text(row.ip),
            date_added: normalize::timestamp(row.date_added),
            date_modified: normalize::timestamp(row.date_modified),
            products,
        }))
    }

    fn embedded_checks(&self) -> Vec<EmbeddedCheck> {
        vec![
            EmbeddedCheck {
                label: "products",
                path: "products",
                source_count: count_order_products,
            },
            EmbeddedCheck {
                label: "product options",
                path: "products.options",
                source_count: count_order_options,
            },
        ]
    }
}

fn count_order_products(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move {
        order_product::Entity::find()
            .join(JoinType::InnerJoin, order_product::Relation::Order.def())
            .filter(confirmed())
            .count(db)
            .await
    })
}

fn count_order_options(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move {
        order_option::Entity::find()
            .join(JoinType::InnerJoin, order_option::Relation::Order.def())
            .filter(confirmed())
            .count(db)
            .await
    })
}
