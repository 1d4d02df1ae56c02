use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::score::ScoreCounter;
use crate::database::models::Score;
use crate::database::query_builder::UpdateBuilder;
use crate::database::repository::Repository;

pub struct ScoreService {
    scores: Repository<Score>,
}

impl ScoreService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            scores: Repository::new(pool),
        }
    }

    pub async fn for_user(&self, user_id: i64) -> Result<Score, DatabaseError> {
        self.scores.select_404(json!({ "user_id": user_id })).await
    }

    /// Canonical level of a user
    pub async fn level_of(&self, user_id: i64) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT level_id FROM scores WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.scores.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Score not found".to_string()))
    }

    /// Relative counter change on the score `score_id` belonging to `user_id`.
    /// The counter stays within `0..=i64::MAX`; a refused change leaves it untouched.
    pub async fn adjust(
        &self,
        score_id: i64,
        user_id: i64,
        counter: ScoreCounter,
        delta: i64,
    ) -> Result<Score, DatabaseError> {
        let mut update = UpdateBuilder::touching().adjust(counter.column(), delta);
        if counter == ScoreCounter::Likes {
            update = update.stamp("likes_updated_at");
        }

        let target = json!({ "id": score_id, "user_id": user_id });
        self.scores.update_one(target.clone(), update).await.map_err(|e| match e {
            DatabaseError::NotAllowed(_) if delta < 0 => {
                DatabaseError::NotAllowed(format!("Not allowed: not enough {}", counter.column()))
            }
            DatabaseError::NotAllowed(_) => {
                DatabaseError::NotAllowed(format!("Not allowed: {} limit reached", counter.column()))
            }
            other => other,
        })?;
        self.scores.select_404(target).await
    }

    pub async fn set_level(&self, user_id: i64, level_id: i64) -> Result<(), DatabaseError> {
        self.scores
            .update_one(
                json!({ "user_id": user_id }),
                UpdateBuilder::touching().set("level_id", level_id),
            )
            .await
    }
}
