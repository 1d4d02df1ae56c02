use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::repository::Entity;
use crate::types::Role;

/// Account row; `level_id` and `exp` are read from the user's score, which
/// is the single source of a user's level.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub facebook_user_id: String,
    #[sqlx(try_from = "String")]
    #[serde(skip_serializing)]
    pub role: Role,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub weight: f64,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub level_id: i64,
    pub exp: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
    const SOFT_DELETE: bool = true;
    const OWNER_COLUMN: &'static str = "id";
    const PROJECTION: &'static str = r#""users"."id", "users"."name", "users"."email", "users"."facebook_user_id", "users"."role",
        "users"."gender", "users"."date_of_birth", "users"."weight", "users"."longitude", "users"."latitude",
        COALESCE((SELECT "scores"."level_id" FROM "scores" WHERE "scores"."user_id" = "users"."id"), 1) AS level_id,
        COALESCE((SELECT "scores"."exp" FROM "scores" WHERE "scores"."user_id" = "users"."id"), 0) AS exp,
        "users"."created_at", "users"."updated_at""#;
}

impl User {
    /// Ranking order: level, then experience, newest account last
    pub const RANKING_ORDER: &'static str = r#"COALESCE((SELECT "scores"."level_id" FROM "scores" WHERE "scores"."user_id" = "users"."id"), 1) DESC,
        COALESCE((SELECT "scores"."exp" FROM "scores" WHERE "scores"."user_id" = "users"."id"), 0) DESC,
        "users"."id" ASC"#;
}

/// Compact user shape embedded in other rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: Option<String>,
    pub facebook_user_id: String,
}
