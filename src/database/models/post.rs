use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::database::models::reaction::Reaction;
use crate::database::repository::Entity;

/// Media submission to a challenge, hydrated with its likes and flags
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub challenge_id: i64,
    pub file_url: String,
    pub content_type: String,
    pub content_size: i64,
    pub likes_needed: i64,
    pub likes: Json<Vec<Reaction>>,
    pub flags: Json<Vec<Reaction>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Post {
    const TABLE: &'static str = "posts";
    const LABEL: &'static str = "Post";
    const SOFT_DELETE: bool = true;
    const PROJECTION: &'static str = r#""posts"."id", "posts"."user_id", "posts"."challenge_id", "posts"."file_url",
        "posts"."content_type", "posts"."content_size", "posts"."likes_needed",
        COALESCE((SELECT json_agg(l ORDER BY l."created_at") FROM "likes" l WHERE l."post_id" = "posts"."id"), '[]'::json) AS likes,
        COALESCE((SELECT json_agg(f ORDER BY f."created_at") FROM "flags" f WHERE f."post_id" = "posts"."id"), '[]'::json) AS flags,
        "posts"."created_at", "posts"."updated_at""#;
}
