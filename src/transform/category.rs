use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{info, warn};

use super::tree::CategoryTree;
use super::{normalize, related_error, EmbeddedCheck, TransformContext, Transformer};
use crate::documents::{CategoryDescriptionDocument, CategoryDocument};
use crate::entities::{category, category_description};
use crate::errors::MigrationError;

/// Builds category documents with their ancestor path.
///
/// The whole `(category_id, parent_id)` table is loaded into a
/// [`CategoryTree`] once in [`Transformer::prepare`]; paths are then resolved
/// from the arena without further reads.
#[derive(Debug, Default)]
pub struct CategoryTransformer {
    tree: CategoryTree,
}

#[async_trait]
impl Transformer for CategoryTransformer {
    type Source = category::Entity;
    const TABLE: &'static str = "category";
    type Output = CategoryDocument;

    fn related_tables(&self) -> &'static [&'static str] {
        &["category_description"]
    }

    async fn prepare(&mut self, source: &DatabaseConnection) -> Result<(), MigrationError> {
        let edges: Vec<(i32, Option<i32>)> = category::Entity::find()
            .select_only()
            .column(category::Column::CategoryId)
            .column(category::Column::ParentId)
            .order_by_asc(category::Column::CategoryId)
            .into_tuple()
            .all(source)
            .await?;

        self.tree = CategoryTree::build(
            edges
                .into_iter()
                .map(|(id, parent)| (i64::from(id), normalize::reference(parent))),
        );

        if self.tree.is_empty() {
            info!("No categories in the source");
            return Ok(());
        }

        let orphans = self.tree.orphans();
        if !orphans.is_empty() {
            warn!(
                count = orphans.len(),
                "Categories whose parent is missing are migrated as roots: {:?}", orphans
            );
        }
        info!(
            categories = self.tree.len(),
            roots = self.tree.roots().len(),
            "Category tree loaded"
        );
        Ok(())
    }

    async fn transform(
        &self,
        row: category::Model,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<CategoryDocument>, MigrationError> {
        let key = i64::from(row.category_id);
        let path = self
            .tree
            .path(key)
            .map_err(|e| MigrationError::transform("categories", key, e.to_string()))?;
        let level = path.len().saturating_sub(1) as u32;

        let descriptions = category_description::Entity::find()
            .filter(category_description::Column::CategoryId.eq(row.category_id))
            .order_by_asc(category_description::Column::LanguageId)
            .all(ctx.source)
            .await
            .map_err(related_error("categories", key))?;

        Ok(Some(CategoryDocument {
            category_id: key,
            parent_id: normalize::reference(row.parent_id),
            image: normalize::text(row.image),
            top: normalize::flag(row.top),
            sort_order: normalize::int(row.sort_order),
            status: normalize::flag(row.status),
            date_added: normalize::timestamp(row.date_added),
            date_modified: normalize::timestamp(row.date_modified),
            descriptions: descriptions
                .into_iter()
                .map(|d| CategoryDescriptionDocument {
                    language_id: d.language_id.into(),
                    name: d.name,
                    description: normalize::text(d.description),
                    meta_title: normalize::text(d.meta_title),
                    meta_description: normalize::text(d.meta_description),
                    meta_keyword: normalize::text(d.meta_keyword),
                })
                .collect(),
            path,
            level,
        }))
    }

    fn embedded_checks(&self) -> Vec<EmbeddedCheck> {
        vec![EmbeddedCheck {
            label: "descriptions",
            path: "descriptions",
            source_count: count_descriptions,
        }]
    }
}

fn count_descriptions(db: &DatabaseConnection) -> BoxFuture<'_, Result<u64, DbErr>> {
    Box::pin(async move { category_description::Entity::find().count(db).await })
}
