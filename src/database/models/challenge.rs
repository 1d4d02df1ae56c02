use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::database::repository::Entity;
use crate::types::{GeoCoords, UnknownVariant};

/// Only active challenges show up in browse listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Active,
    Inactive,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Active => "active",
            ChallengeStatus::Inactive => "inactive",
        }
    }
}

impl TryFrom<String> for ChallengeStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(ChallengeStatus::Active),
            "inactive" => Ok(ChallengeStatus::Inactive),
            _ => Err(UnknownVariant { kind: "challenge status", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Challenge {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: ChallengeStatus,
    pub weight: f64,
    pub likes_needed_per_post: i64,
    pub geo_coords: Option<Json<GeoCoords>>,
    pub post_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Challenge {
    const TABLE: &'static str = "challenges";
    const LABEL: &'static str = "Challenge";
    const SOFT_DELETE: bool = true;
    const PROJECTION: &'static str = r#""challenges"."id", "challenges"."user_id", "challenges"."name", "challenges"."description",
        "challenges"."status", "challenges"."weight", "challenges"."likes_needed_per_post",
        CASE WHEN "challenges"."longitude" IS NULL OR "challenges"."latitude" IS NULL THEN NULL
             ELSE json_build_object('long', "challenges"."longitude", 'lat', "challenges"."latitude") END AS geo_coords,
        (SELECT COUNT(*) FROM "posts" p WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL) AS post_count,
        (SELECT COUNT(*) FROM "likes" l JOIN "posts" p ON p."id" = l."post_id"
            WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL) AS like_count,
        "challenges"."created_at", "challenges"."updated_at""#;
}

impl Challenge {
    /// Hot ranking: live post count, boosted by average likes per post and
    /// by the creator's weight.
    pub const HOT_ORDER: &'static str = r#"(SELECT COUNT(*) FROM "posts" p WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL)::float8
        * (1 + (SELECT COUNT(*) FROM "likes" l JOIN "posts" p ON p."id" = l."post_id"
                WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL)::float8
            / GREATEST((SELECT COUNT(*) FROM "posts" p WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL), 1))
        * (1 + "challenges"."weight") DESC,
        "challenges"."created_at" DESC, "challenges"."id" DESC"#;

    /// Fresh ranking: newest first, busier challenges break ties
    pub const FRESH_ORDER: &'static str = r#""challenges"."created_at" DESC,
        (SELECT COUNT(*) FROM "posts" p WHERE p."challenge_id" = "challenges"."id" AND p."deleted_at" IS NULL) DESC,
        "challenges"."id" DESC"#;

    /// Same score as [`Challenge::HOT_ORDER`], computed from a loaded row
    pub fn hot_score(&self) -> f64 {
        let posts = self.post_count as f64;
        posts * (1.0 + self.like_count as f64 / posts.max(1.0)) * (1.0 + self.weight)
    }
}

/// Compact challenge shape embedded in requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSummary {
    pub id: i64,
    pub name: String,
    pub status: ChallengeStatus,
}
