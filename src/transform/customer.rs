use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use super::{normalize, related_error, EmbeddedCheck, TransformContext, Transformer};
use crate::documents::{AddressDocument, CustomerDocument, OpaqueDocument};
use crate::entities::{address, customer, customer_wishlist};
use crate::errors::MigrationError;

#[derive(Debug, Default)]
pub struct CustomerTransformer;

fn address_document(row: address::Model, default_address: Option<i32>) -> AddressDocument {
    AddressDocument {
        address_id: row.address_id.into(),
        default: default_address == Some(row.address_id),
        firstname: row.firstname,
        lastname: row.lastname,
        company: normalize::text(row.company),
        address_1: row.address_1,
        address_2: normalize::text(row.address_2),
        city: row.city,
        postcode: normalize::text(row.postcode),
        country_id: normalize::reference(row.country_id),
        zone_id: normalize::reference(row.zone_id),
        custom_field: OpaqueDocument::from_source(row.custom_field.as_deref()),
    }
}

#[async_trait]
impl Transformer for CustomerTransformer {
    type Source = customer::Entity;
    const TABLE: &'static str = "customer";
    type Output = CustomerDocument;

    fn related_tables(&self) -> &'static [&'static str] {
        &["address", "customer_wishlist"]
    }

    async fn transform(
        &self,
        row: customer::Model,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<CustomerDocument>, MigrationError> {
        let key = i64::from(row.customer_id);

        let (addresses, wishlist) = tokio::try_join!(
            address::Entity::find()
                .filter(address::Column::CustomerId.eq(row.customer_id))
                .order_by_asc(address::Column::AddressId)
                .all(ctx.source),
            customer_wishlist::Entity::find()
                .filter(customer_wishlist::Column::CustomerId.eq(row.customer_id))
                .order_by_asc(customer_wishlist::Column::DateAdded)
                .order_by_asc(customer_wishlist::Column::ProductId)
                .all(ctx.source),
        )
        .map_err(related_error("customers", key))?;

        Ok(Some(CustomerDocument {
            customer_id: key,
            customer_group_id: normalize::reference(row.customer_group_id),
            store_id: normalize::int(row.store_id),
            language_id: normalize::reference(row.language_id),
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            telephone: normalize::text(row.telephone),
            password: normalize::text(row.password),
            newsletter: normalize::flag(row.newsletter),
            address_id: normalize::reference(row.address_id),
            custom_field: OpaqueDocument::from_source(row.custom_field.as_deref()),
            ip: normalize::text(row.ip),
            status: normalize::flag(row.status),
            safe: normalize::flag(row.safe),
            date_added: normalize::timestamp(row.date_added),
            addresses: addresses
                .into_iter()
                .map(|a| address_document(a, row.address_id))
                .collect(),
            wishlist: wishlist.into_iter().map(|w| w.product_id.into()).collect(),
        }))
    }

    fn embedded_checks(&self) -> Vec<EmbeddedCheck> {
        vec![
            EmbeddedCheck {
                label: "addresses",
                path: "addresses",
                source_count: count_addresses,
            },
            EmbeddedCheck {
                label: "wishlist",
                path: "wishlist",
                source_count: count_wishlist,
            },
        ]
    }
}

fn count_addresses(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { address::Entity::find().count(db).await })
}

fn count_wishlist(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { customer_wishlist::Entity::find().count(db).await })
}
