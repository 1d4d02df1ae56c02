use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::User;
use crate::database::query_builder::UpdateBuilder;
use crate::database::repository::Repository;
use crate::external::ProviderIdentity;
use crate::filter::FilterData;

/// Circle for the ranking listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingArea {
    pub longitude: f64,
    pub latitude: f64,
    pub radius_meters: f64,
}

pub struct UserService {
    users: Repository<User>,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: Repository::new(pool),
        }
    }

    /// Returns the live user for this Facebook identity, creating the user
    /// and its starting score in one statement on first login.
    pub async fn login(
        &self,
        identity: &ProviderIdentity,
        email: &str,
        starting_likes: i64,
        starting_level_id: i64,
    ) -> Result<(User, bool), DatabaseError> {
        let created: Option<i64> = sqlx::query_scalar(
            r#"
            WITH new_user AS (
                INSERT INTO users (facebook_user_id, email, name)
                VALUES ($1, $2, $3)
                ON CONFLICT (facebook_user_id) WHERE deleted_at IS NULL DO NOTHING
                RETURNING id
            )
            INSERT INTO scores (user_id, exp, coins, likes_remaining, level_id)
            SELECT id, 0, 0, $4, $5 FROM new_user
            RETURNING user_id
            "#,
        )
        .bind(&identity.id)
        .bind(email)
        .bind(identity.name.as_deref())
        .bind(starting_likes)
        .bind(starting_level_id)
        .fetch_optional(self.users.pool())
        .await?;

        if let Some(user_id) = created {
            tracing::info!("Created user {} for facebook id {}", user_id, identity.id);
        }

        let user = self
            .users
            .select_404(json!({ "facebook_user_id": identity.id }))
            .await?;
        Ok((user, created.is_some()))
    }

    pub async fn get(&self, id: i64) -> Result<User, DatabaseError> {
        self.users.select_404(json!({ "id": id })).await
    }

    pub async fn exists(&self, id: i64) -> Result<bool, DatabaseError> {
        self.users.exists(json!({ "id": id })).await
    }

    /// Users matching any of the ids or Facebook ids
    pub async fn list_by_ids(&self, ids: &[i64], facebook_ids: &[String], limit: i64) -> Result<Vec<User>, DatabaseError> {
        let mut any_of: Vec<Value> = Vec::new();
        if !ids.is_empty() {
            any_of.push(json!({ "id": { "$in": ids } }));
        }
        if !facebook_ids.is_empty() {
            any_of.push(json!({ "facebook_user_id": { "$in": facebook_ids } }));
        }
        if any_of.is_empty() {
            return Ok(vec![]);
        }
        self.users
            .select_any(FilterData {
                where_clause: Some(json!({ "$or": any_of })),
                order: Some(json!("id asc")),
                limit: Some(limit),
            })
            .await
    }

    pub async fn ranking(&self, area: Option<RankingArea>, last_id: i64, limit: i64) -> Result<Vec<User>, DatabaseError> {
        let mut where_clause = json!({ "id": { "$gt": last_id } });
        if let Some(area) = area {
            where_clause["$within_radius"] = json!({
                "long": area.longitude,
                "lat": area.latitude,
                "meters": area.radius_meters,
            });
        }
        self.users
            .select_ranked(
                FilterData {
                    where_clause: Some(where_clause),
                    limit: Some(limit),
                    ..Default::default()
                },
                User::RANKING_ORDER,
            )
            .await
    }

    /// Ownership is checked by the caller; users own themselves
    pub async fn update(&self, id: i64, update: UpdateBuilder) -> Result<(), DatabaseError> {
        self.users.update_one(json!({ "id": id }), update).await
    }

    pub async fn soft_delete(&self, id: i64) -> Result<(), DatabaseError> {
        self.users.soft_delete_one(json!({ "id": id })).await
    }
}
