use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Level {
    pub id: i64,
    pub name: String,
    pub coin_price: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for Level {
    const TABLE: &'static str = "levels";
    const LABEL: &'static str = "Level";
}
