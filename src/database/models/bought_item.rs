use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::repository::Entity;
use crate::types::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Coins,
    Money,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Coins => "coins",
            Currency::Money => "money",
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "coins" => Ok(Currency::Coins),
            "money" => Ok(Currency::Money),
            _ => Err(UnknownVariant { kind: "currency", value }),
        }
    }
}

/// Purchase record of either a vanity item or a level
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoughtItem {
    pub id: i64,
    pub user_id: i64,
    pub vanity_item_id: Option<i64>,
    pub level_id: Option<i64>,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Entity for BoughtItem {
    const TABLE: &'static str = "bought_items";
    const LABEL: &'static str = "Bought item";
}
