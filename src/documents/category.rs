use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Aggregate;

/// Catalog category with a materialized ancestor path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub category_id: i64,
    /// 0 for roots
    pub parent_id: i64,
    pub image: String,
    pub top: bool,
    pub sort_order: i64,
    pub status: bool,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub descriptions: Vec<CategoryDescriptionDocument>,
    /// Ancestor ids from the root down, ending with this category
    pub path: Vec<i64>,
    /// Depth below the root; roots are level 0
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryDescriptionDocument {
    pub language_id: i64,
    pub name: String,
    pub description: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keyword: String,
}

impl Aggregate for CategoryDocument {
    const COLLECTION: &'static str = "categories";
    const KEY_FIELD: &'static str = "category_id";

    fn key(&self) -> i64 {
        self.category_id
    }
}
