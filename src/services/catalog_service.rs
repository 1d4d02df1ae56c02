use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Level, VanityItem};
use crate::database::repository::Repository;
use crate::filter::{FilterData, MAX_LIMIT};

/// Read-only level and vanity item catalogs
pub struct CatalogService {
    levels: Repository<Level>,
    vanity_items: Repository<VanityItem>,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            levels: Repository::new(pool.clone()),
            vanity_items: Repository::new(pool),
        }
    }

    pub async fn levels(&self) -> Result<Vec<Level>, DatabaseError> {
        self.levels.select_any(Self::by_id()).await
    }

    pub async fn vanity_items(&self) -> Result<Vec<VanityItem>, DatabaseError> {
        self.vanity_items.select_any(Self::by_id()).await
    }

    pub async fn level_exists(&self, id: i64) -> Result<bool, DatabaseError> {
        self.levels.exists(json!({ "id": id })).await
    }

    fn by_id() -> FilterData {
        FilterData {
            where_clause: None,
            order: Some(json!("id asc")),
            limit: Some(MAX_LIMIT),
        }
    }
}
