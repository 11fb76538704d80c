use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::debug;

use super::{normalize, related_error, EmbeddedCheck, TransformContext, Transformer};
use crate::documents::{
    ProductAttributeDocument, ProductDescriptionDocument, ProductDiscountDocument,
    ProductDocument, ProductImageDocument, ProductOptionDocument, ProductOptionValueDocument,
    ProductSpecialDocument, UploadDocument,
};
use crate::entities::{
    product, product_attribute, product_description, product_discount, product_image,
    product_option, product_option_value, product_related, product_special, product_to_category,
    product_to_download, upload,
};
use crate::errors::MigrationError;

const ENTITY: &str = "products";

#[derive(Debug, Default)]
pub struct ProductTransformer;

/// Nests option values under their options and renumbers both.
///
/// Options are numbered from 1 in source order; values are numbered from 1
/// across the whole product so they stay unique within the document. A value
/// pointing at an option of another product fails the row.
fn nest_options(
    key: i64,
    options: Vec<product_option::Model>,
    values: Vec<product_option_value::Model>,
    uploads: &HashMap<i32, upload::Model>,
) -> Result<Vec<ProductOptionDocument>, MigrationError> {
    let mut by_option: HashMap<i32, Vec<product_option_value::Model>> = HashMap::new();
    for value in values {
        by_option.entry(value.product_option_id).or_default().push(value);
    }

    let mut next_value_id = 0i64;
    let mut documents = Vec::with_capacity(options.len());
    for (position, option) in options.into_iter().enumerate() {
        let values = by_option
            .remove(&option.product_option_id)
            .unwrap_or_default()
            .into_iter()
            .map(|v| {
                next_value_id += 1;
                let upload = v
                    .upload_id
                    .filter(|id| *id > 0)
                    .and_then(|id| uploads.get(&id))
                    .map(|u| UploadDocument {
                        upload_id: u.upload_id.into(),
                        name: u.name.clone(),
                        filename: u.filename.clone(),
                        code: u.code.clone(),
                        date_added: normalize::timestamp(u.date_added),
                    });
                ProductOptionValueDocument {
                    product_option_value_id: next_value_id,
                    option_value_id: v.option_value_id.into(),
                    quantity: normalize::int(v.quantity),
                    subtract: normalize::flag(v.subtract),
                    price: normalize::amount(v.price),
                    price_prefix: normalize::text(v.price_prefix),
                    points: normalize::int(v.points),
                    points_prefix: normalize::text(v.points_prefix),
                    weight: normalize::amount(v.weight),
                    weight_prefix: normalize::text(v.weight_prefix),
                    upload,
                }
            })
            .collect();

        documents.push(ProductOptionDocument {
            product_option_id: position as i64 + 1,
            option_id: option.option_id.into(),
            value: normalize::text(option.value),
            required: normalize::flag(option.required),
            values,
        });
    }

    if let Some(stray) = by_option.keys().min() {
        return Err(MigrationError::transform(
            ENTITY,
            key,
            format!("option values reference product_option_id {stray}, which is not an option of this product"),
        ));
    }
    Ok(documents)
}

#[async_trait]
impl Transformer for ProductTransformer {
    type Source = product::Entity;
    const TABLE: &'static str = "product";
    type Output = ProductDocument;

    fn related_tables(&self) -> &'static [&'static str] {
        &[
            "product_description",
            "product_to_category",
            "product_image",
            "product_attribute",
            "product_option",
            "product_option_value",
            "upload",
            "product_discount",
            "product_special",
            "product_to_download",
            "product_related",
        ]
    }

    async fn transform(
        &self,
        row: product::Model,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<ProductDocument>, MigrationError> {
        let key = i64::from(row.product_id);
        let id = row.product_id;
        let db = ctx.source;

        let (
            descriptions,
            categories,
            images,
            attributes,
            options,
            values,
            discounts,
            specials,
            downloads,
            related,
        ) = tokio::try_join!(
            product_description::Entity::find()
                .filter(product_description::Column::ProductId.eq(id))
                .order_by_asc(product_description::Column::LanguageId)
                .all(db),
            product_to_category::Entity::find()
                .filter(product_to_category::Column::ProductId.eq(id))
                .order_by_asc(product_to_category::Column::CategoryId)
                .all(db),
            product_image::Entity::find()
                .filter(product_image::Column::ProductId.eq(id))
                .order_by_asc(product_image::Column::SortOrder)
                .order_by_asc(product_image::Column::ProductImageId)
                .all(db),
            product_attribute::Entity::find()
                .filter(product_attribute::Column::ProductId.eq(id))
                .order_by_asc(product_attribute::Column::AttributeId)
                .order_by_asc(product_attribute::Column::LanguageId)
                .all(db),
            product_option::Entity::find()
                .filter(product_option::Column::ProductId.eq(id))
                .order_by_asc(product_option::Column::ProductOptionId)
                .all(db),
            product_option_value::Entity::find()
                .filter(product_option_value::Column::ProductId.eq(id))
                .order_by_asc(product_option_value::Column::ProductOptionValueId)
                .all(db),
            product_discount::Entity::find()
                .filter(product_discount::Column::ProductId.eq(id))
                .order_by_asc(product_discount::Column::Quantity)
                .order_by_asc(product_discount::Column::Priority)
                .order_by_asc(product_discount::Column::ProductDiscountId)
                .all(db),
            product_special::Entity::find()
                .filter(product_special::Column::ProductId.eq(id))
                .order_by_asc(product_special::Column::Priority)
                .order_by_asc(product_special::Column::ProductSpecialId)
                .all(db),
            product_to_download::Entity::find()
                .filter(product_to_download::Column::ProductId.eq(id))
                .order_by_asc(product_to_download::Column::DownloadId)
                .all(db),
            product_related::Entity::find()
                .filter(product_related::Column::ProductId.eq(id))
                .order_by_asc(product_related::Column::RelatedId)
                .all(db),
        )
        .map_err(related_error(ENTITY, key))?;

        let upload_ids: Vec<i32> = values
            .iter()
            .filter_map(|v| v.upload_id)
            .filter(|id| *id > 0)
            .collect();
        let uploads: HashMap<i32, upload::Model> = if upload_ids.is_empty() {
            HashMap::new()
        } else {
            upload::Entity::find()
                .filter(upload::Column::UploadId.is_in(upload_ids))
                .all(db)
                .await
                .map_err(related_error(ENTITY, key))?
                .into_iter()
                .map(|u| (u.upload_id, u))
                .collect()
        };
        debug!(product_id = key, uploads = uploads.len(), "Product relations loaded");

        let options = nest_options(key, options, values, &uploads)?;

        Ok(Some(ProductDocument {
            product_id: key,
            model: row.model,
            sku: normalize::text(row.sku),
            upc: normalize::text(row.upc),
            location: normalize::text(row.location),
            quantity: normalize::int(row.quantity),
            stock_status_id: normalize::reference(row.stock_status_id),
            image: normalize::text(row.image),
            manufacturer_id: normalize::reference(row.manufacturer_id),
            shipping: normalize::flag(row.shipping),
            price: normalize::amount(row.price),
            points: normalize::int(row.points),
            tax_class_id: normalize::reference(row.tax_class_id),
            date_available: normalize::timestamp(row.date_available),
            weight: normalize::amount(row.weight),
            weight_class_id: normalize::reference(row.weight_class_id),
            length: normalize::amount(row.length),
            width: normalize::amount(row.width),
            height: normalize::amount(row.height),
            length_class_id: normalize::reference(row.length_class_id),
            subtract: normalize::flag(row.subtract),
            minimum: normalize::int(row.minimum),
            sort_order: normalize::int(row.sort_order),
            status: normalize::flag(row.status),
            viewed: normalize::int(row.viewed),
            date_added: normalize::timestamp(row.date_added),
            date_modified: normalize::timestamp(row.date_modified),
            descriptions: descriptions
                .into_iter()
                .map(|d| ProductDescriptionDocument {
                    language_id: d.language_id.into(),
                    name: d.name,
                    description: normalize::text(d.description),
                    tag: normalize::text(d.tag),
                    meta_title: normalize::text(d.meta_title),
                    meta_description: normalize::text(d.meta_description),
                    meta_keyword: normalize::text(d.meta_keyword),
                })
                .collect(),
            categories: categories.into_iter().map(|c| c.category_id.into()).collect(),
            images: images
                .into_iter()
                .map(|i| ProductImageDocument {
                    product_image_id: i.product_image_id.into(),
                    image: normalize::text(i.image),
                    sort_order: normalize::int(i.sort_order),
                })
                .collect(),
            attributes: attributes
                .into_iter()
                .map(|a| ProductAttributeDocument {
                    attribute_id: a.attribute_id.into(),
                    language_id: a.language_id.into(),
                    text: a.text,
                })
                .collect(),
            options,
            discounts: discounts
                .into_iter()
                .map(|d| ProductDiscountDocument {
                    customer_group_id: normalize::reference(d.customer_group_id),
                    quantity: normalize::int(d.quantity),
                    priority: normalize::int(d.priority),
                    price: normalize::amount(d.price),
                    date_start: normalize::date(d.date_start),
                    date_end: normalize::date(d.date_end),
                })
                .collect(),
            specials: specials
                .into_iter()
                .map(|s| ProductSpecialDocument {
                    customer_group_id: normalize::reference(s.customer_group_id),
                    priority: normalize::int(s.priority),
                    price: normalize::amount(s.price),
                    date_start: normalize::date(s.date_start),
                    date_end: normalize::date(s.date_end),
                })
                .collect(),
            downloads: downloads.into_iter().map(|d| d.download_id.into()).collect(),
            related: related.into_iter().map(|r| r.related_id.into()).collect(),
        }))
    }

    fn embedded_checks(&self) -> Vec<EmbeddedCheck> {
        vec![
            EmbeddedCheck {
                label: "descriptions",
                path: "descriptions",
                source_count: count_descriptions,
            },
            EmbeddedCheck {
                label: "categories",
                path: "categories",
                source_count: count_categories,
            },
            EmbeddedCheck {
                label: "images",
                path: "images",
                source_count: count_images,
            },
            EmbeddedCheck {
                label: "options",
                path: "options",
                source_count: count_options,
            },
            EmbeddedCheck {
                label: "option values",
                path: "options.values",
                source_count: count_option_values,
            },
        ]
    }
}

fn count_descriptions(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { product_description::Entity::find().count(db).await })
}

fn count_categories(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { product_to_category::Entity::find().count(db).await })
}

fn count_images(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { product_image::Entity::find().count(db).await })
}

fn count_options(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { product_option::Entity::find().count(db).await })
}

fn count_option_values(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { product_option_value::Entity::find().count(db).await })
}
