use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Challenge, ChallengeStatus};
use crate::database::query_builder::UpdateBuilder;
use crate::database::repository::{scoped, Repository};
use crate::filter::FilterData;
use crate::types::{Actor, GeoCoords};

/// Browse orderings for `GET /challenge`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeListing {
    Hot,
    Fresh,
}

impl ChallengeListing {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("hot") => Some(ChallengeListing::Hot),
            Some("fresh") => Some(ChallengeListing::Fresh),
            _ => None,
        }
    }

    fn order(&self) -> &'static str {
        match self {
            ChallengeListing::Hot => Challenge::HOT_ORDER,
            ChallengeListing::Fresh => Challenge::FRESH_ORDER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub weight: f64,
    pub likes_needed_per_post: i64,
    pub geo_coords: Option<GeoCoords>,
}

pub struct ChallengeService {
    challenges: Repository<Challenge>,
}

impl ChallengeService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            challenges: Repository::new(pool),
        }
    }

    /// Active challenges only; `creator` narrows to one user's challenges
    pub async fn list(
        &self,
        listing: ChallengeListing,
        creator: Option<i64>,
        last_id: i64,
        limit: i64,
    ) -> Result<Vec<Challenge>, DatabaseError> {
        let mut where_clause = json!({
            "status": ChallengeStatus::Active.as_str(),
            "id": { "$gt": last_id },
        });
        if let Some(user_id) = creator {
            where_clause["user_id"] = json!(user_id);
        }
        self.challenges
            .select_ranked(
                FilterData {
                    where_clause: Some(where_clause),
                    limit: Some(limit),
                    ..Default::default()
                },
                listing.order(),
            )
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Challenge, DatabaseError> {
        self.challenges.select_404(json!({ "id": id })).await
    }

    pub async fn owner_of(&self, id: i64) -> Result<i64, DatabaseError> {
        self.challenges.owner_of(id).await
    }

    pub async fn create(&self, new: NewChallenge) -> Result<Challenge, DatabaseError> {
        let (longitude, latitude) = match new.geo_coords {
            Some(coords) => (Some(coords.long), Some(coords.lat)),
            None => (None, None),
        };
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO challenges (user_id, name, description, weight, likes_needed_per_post, longitude, latitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.weight)
        .bind(new.likes_needed_per_post)
        .bind(longitude)
        .bind(latitude)
        .fetch_one(self.challenges.pool())
        .await?;

        tracing::info!("User {} created challenge {}", new.user_id, id);
        self.get(id).await
    }

    pub async fn update(
        &self,
        id: i64,
        actor: Actor,
        description: Option<String>,
        geo_coords: Option<GeoCoords>,
    ) -> Result<Challenge, DatabaseError> {
        let mut update = UpdateBuilder::touching().set_if("description", description);
        if let Some(coords) = geo_coords {
            update = update.set("longitude", coords.long).set("latitude", coords.lat);
        }
        self.challenges
            .update_one(scoped(json!({ "id": id }), actor, "user_id"), update)
            .await?;
        self.get(id).await
    }

    pub async fn set_status(&self, id: i64, actor: Actor, status: ChallengeStatus) -> Result<(), DatabaseError> {
        self.challenges
            .update_one(
                scoped(json!({ "id": id }), actor, "user_id"),
                UpdateBuilder::touching().set("status", status.as_str()),
            )
            .await
    }

    /// Owners may only remove challenges nobody has posted to yet
    pub async fn delete(&self, id: i64, actor: Actor) -> Result<(), DatabaseError> {
        if !actor.is_admin() {
            let live_posts: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM posts WHERE challenge_id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_one(self.challenges.pool())
            .await?;
            if live_posts > 0 {
                return Err(DatabaseError::NotAllowed(
                    "Not allowed: challenge already has posts".to_string(),
                ));
            }
        }
        self.challenges
            .soft_delete_one(scoped(json!({ "id": id }), actor, "user_id"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_type_is_required() {
        assert_eq!(ChallengeListing::parse(None), None);
        assert_eq!(ChallengeListing::parse(Some("")), None);
        assert_eq!(ChallengeListing::parse(Some("hot")), Some(ChallengeListing::Hot));
        assert_eq!(ChallengeListing::parse(Some("fresh")), Some(ChallengeListing::Fresh));
        assert_eq!(ChallengeListing::parse(Some("cold")), None);
    }
}
