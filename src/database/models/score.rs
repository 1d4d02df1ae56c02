use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::database::models::bought_item::BoughtItem;
use crate::database::models::level::Level;
use crate::database::repository::Entity;

/// Per-user progression. Counters only ever change through relative updates.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub exp: i64,
    pub coins: i64,
    pub likes_remaining: i64,
    pub likes_updated_at: DateTime<Utc>,
    pub level_id: i64,
    pub level: Option<Json<Level>>,
    pub bought_items: Json<Vec<BoughtItem>>,
    pub total_post: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Score {
    const TABLE: &'static str = "scores";
    const LABEL: &'static str = "Score";
    const PROJECTION: &'static str = r#""scores"."id", "scores"."user_id", "scores"."exp", "scores"."coins",
        "scores"."likes_remaining", "scores"."likes_updated_at", "scores"."level_id",
        (SELECT row_to_json(lv) FROM "levels" lv WHERE lv."id" = "scores"."level_id") AS level,
        COALESCE((SELECT json_agg(b ORDER BY b."created_at" DESC) FROM "bought_items" b WHERE b."user_id" = "scores"."user_id"), '[]'::json) AS bought_items,
        (SELECT COUNT(*) FROM "posts" p WHERE p."user_id" = "scores"."user_id" AND p."deleted_at" IS NULL) AS total_post,
        "scores"."created_at", "scores"."updated_at""#;
}

/// Counter a score endpoint adjusts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCounter {
    Coins,
    Exp,
    Likes,
}

impl ScoreCounter {
    pub fn column(&self) -> &'static str {
        match self {
            ScoreCounter::Coins => "coins",
            ScoreCounter::Exp => "exp",
            ScoreCounter::Likes => "likes_remaining",
        }
    }
}
