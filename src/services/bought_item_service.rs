use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{BoughtItem, Currency, Level, VanityItem};
use crate::database::repository::Repository;
use crate::filter::FilterData;

/// What a purchase buys; exactly one per bought item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseTarget {
    VanityItem(i64),
    Level(i64),
}

pub struct BoughtItemService {
    items: Repository<BoughtItem>,
    levels: Repository<Level>,
    vanity_items: Repository<VanityItem>,
}

impl BoughtItemService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            items: Repository::new(pool.clone()),
            levels: Repository::new(pool.clone()),
            vanity_items: Repository::new(pool),
        }
    }

    pub async fn list(&self, user_id: i64, limit: i64) -> Result<Vec<BoughtItem>, DatabaseError> {
        self.items
            .select_any(FilterData {
                where_clause: Some(json!({ "user_id": user_id })),
                order: Some(json!(["created_at desc", "id desc"])),
                limit: Some(limit),
            })
            .await
    }

    /// Catalog price of the referenced entry in `currency`. Levels have no
    /// money price and yield `None`.
    pub async fn price(&self, target: PurchaseTarget, currency: Currency) -> Result<Option<i64>, DatabaseError> {
        Ok(match (target, currency) {
            (PurchaseTarget::VanityItem(id), currency) => {
                let item = self.vanity_items.select_404(json!({ "id": id })).await?;
                Some(match currency {
                    Currency::Coins => item.coin_price,
                    Currency::Money => item.money_price,
                })
            }
            (PurchaseTarget::Level(id), Currency::Coins) => {
                Some(self.levels.select_404(json!({ "id": id })).await?.coin_price)
            }
            (PurchaseTarget::Level(_), Currency::Money) => None,
        })
    }

    /// Records the purchase. A coin purchase debits the score and, for levels,
    /// moves the user to the bought level in the same statement; the debit
    /// is refused when it would leave the balance negative. Money purchases
    /// only record the row.
    pub async fn purchase(
        &self,
        user_id: i64,
        target: PurchaseTarget,
        amount: i64,
        currency: Currency,
    ) -> Result<BoughtItem, DatabaseError> {
        let (vanity_item_id, level_id) = match target {
            PurchaseTarget::VanityItem(id) => (Some(id), None),
            PurchaseTarget::Level(id) => (None, Some(id)),
        };
        let (debit, promote_to) = match currency {
            Currency::Coins => (amount, level_id),
            Currency::Money => (0, None),
        };

        let item: Option<BoughtItem> = sqlx::query_as(
            r#"
            WITH spend AS (
                UPDATE scores
                SET coins = coins - $5, level_id = COALESCE($7, level_id), updated_at = now()
                WHERE user_id = $1 AND coins - $5 >= 0
                RETURNING user_id
            )
            INSERT INTO bought_items (user_id, vanity_item_id, level_id, amount, currency)
            SELECT user_id, $2, $3, $4, $6 FROM spend
            RETURNING id, user_id, vanity_item_id, level_id, amount, currency, created_at
            "#,
        )
        .bind(user_id)
        .bind(vanity_item_id)
        .bind(level_id)
        .bind(amount)
        .bind(debit)
        .bind(currency.as_str())
        .bind(promote_to)
        .fetch_optional(self.items.pool())
        .await?;

        match item {
            Some(item) => {
                tracing::info!("User {} bought {:?} for {} {}", user_id, target, amount, currency.as_str());
                Ok(item)
            }
            None if debit > 0 => Err(DatabaseError::NotAllowed("Not allowed: not enough coins".to_string())),
            None => Err(DatabaseError::NotFound("Score not found".to_string())),
        }
    }
}
