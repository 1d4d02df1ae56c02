use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Challenge, ChallengeStatus, Post, ReactionKind};
use crate::database::repository::{scoped, Repository};
use crate::filter::FilterData;
use crate::types::Actor;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub challenge_id: i64,
    pub file_url: String,
    pub content_type: String,
    pub content_size: i64,
}

pub struct PostService {
    posts: Repository<Post>,
    challenges: Repository<Challenge>,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            posts: Repository::new(pool.clone()),
            challenges: Repository::new(pool),
        }
    }

    pub async fn list(&self, challenge_id: i64, last_id: i64, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        self.posts
            .select_any(FilterData {
                where_clause: Some(json!({
                    "challenge_id": challenge_id,
                    "id": { "$gt": last_id },
                })),
                order: Some(json!(["created_at desc", "id desc"])),
                limit: Some(limit),
            })
            .await
    }

    pub async fn get(&self, challenge_id: i64, post_id: i64) -> Result<Post, DatabaseError> {
        self.posts
            .select_404(json!({ "id": post_id, "challenge_id": challenge_id }))
            .await
    }

    pub async fn owner_of(&self, post_id: i64) -> Result<i64, DatabaseError> {
        self.posts.owner_of(post_id).await
    }

    pub async fn create(&self, new: NewPost) -> Result<Post, DatabaseError> {
        let challenge = self.challenges.select_404(json!({ "id": new.challenge_id })).await?;
        if challenge.status != ChallengeStatus::Active {
            return Err(DatabaseError::NotAllowed(
                "Not allowed: challenge is not active".to_string(),
            ));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (user_id, challenge_id, file_url, content_type, content_size, likes_needed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new.user_id)
        .bind(new.challenge_id)
        .bind(&new.file_url)
        .bind(&new.content_type)
        .bind(new.content_size)
        .bind(challenge.likes_needed_per_post)
        .fetch_one(self.posts.pool())
        .await?;

        self.get(new.challenge_id, id).await
    }

    /// Conditional insert; a repeated reaction is a no-op
    pub async fn react(&self, kind: ReactionKind, user_id: i64, challenge_id: i64, post_id: i64) -> Result<bool, DatabaseError> {
        self.posts
            .exactly_one(json!({ "id": post_id, "challenge_id": challenge_id }))
            .await?;

        let sql = format!(
            "INSERT INTO {} (user_id, post_id) VALUES ($1, $2) ON CONFLICT (user_id, post_id) DO NOTHING",
            kind.table()
        );
        let inserted = sqlx::query(&sql)
            .bind(user_id)
            .bind(post_id)
            .execute(self.posts.pool())
            .await?
            .rows_affected();
        if inserted == 0 {
            tracing::debug!("{} by user {} on post {} already present", kind.label(), user_id, post_id);
        }
        Ok(inserted > 0)
    }

    /// Removing an absent reaction is a no-op
    pub async fn unreact(&self, kind: ReactionKind, user_id: i64, challenge_id: i64, post_id: i64) -> Result<bool, DatabaseError> {
        self.posts
            .exactly_one(json!({ "id": post_id, "challenge_id": challenge_id }))
            .await?;

        let sql = format!("DELETE FROM {} WHERE user_id = $1 AND post_id = $2", kind.table());
        let removed = sqlx::query(&sql)
            .bind(user_id)
            .bind(post_id)
            .execute(self.posts.pool())
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    pub async fn delete(&self, challenge_id: i64, post_id: i64, actor: Actor) -> Result<(), DatabaseError> {
        self.posts
            .soft_delete_one(scoped(
                json!({ "id": post_id, "challenge_id": challenge_id }),
                actor,
                "user_id",
            ))
            .await
    }
}
