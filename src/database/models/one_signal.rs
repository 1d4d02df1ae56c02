use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::repository::Entity;

/// Push-notification registration for one device of one user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OneSignal {
    pub id: i64,
    pub user_id: i64,
    pub imei: String,
    pub player_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for OneSignal {
    const TABLE: &'static str = "one_signals";
    const LABEL: &'static str = "Registration";
}
