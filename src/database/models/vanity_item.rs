use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::repository::Entity;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VanityItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub coin_price: i64,
    pub money_price: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for VanityItem {
    const TABLE: &'static str = "vanity_items";
    const LABEL: &'static str = "Vanity item";
}
