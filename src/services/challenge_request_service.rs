use serde_json::json;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Challenge, ChallengeRequest, RequestStatus, User};
use crate::database::query_builder::UpdateBuilder;
use crate::database::repository::Repository;
use crate::filter::FilterData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Sent,
    Received,
}

impl RequestDirection {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") | Some("received") => Some(RequestDirection::Received),
            Some("sent") => Some(RequestDirection::Sent),
            Some(_) => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            RequestDirection::Sent => "from_id",
            RequestDirection::Received => "to_id",
        }
    }
}

pub struct ChallengeRequestService {
    requests: Repository<ChallengeRequest>,
    users: Repository<User>,
    challenges: Repository<Challenge>,
}

impl ChallengeRequestService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            requests: Repository::new(pool.clone()),
            users: Repository::new(pool.clone()),
            challenges: Repository::new(pool),
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        direction: RequestDirection,
        last_id: i64,
        limit: i64,
    ) -> Result<Vec<ChallengeRequest>, DatabaseError> {
        let mut where_clause = json!({ "id": { "$gt": last_id } });
        where_clause[direction.column()] = json!(user_id);
        self.requests
            .select_any(FilterData {
                where_clause: Some(where_clause),
                order: Some(json!(["created_at desc", "id desc"])),
                limit: Some(limit),
            })
            .await
    }

    pub async fn create(
        &self,
        from_id: i64,
        to_id: i64,
        challenge_id: i64,
        message: &str,
    ) -> Result<ChallengeRequest, DatabaseError> {
        futures::try_join!(
            self.users.exactly_one(json!({ "id": to_id })),
            self.challenges.exactly_one(json!({ "id": challenge_id })),
        )?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO challenge_requests (from_id, to_id, challenge_id, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .bind(challenge_id)
        .bind(message)
        .fetch_one(self.requests.pool())
        .await?;

        tracing::info!("User {} challenged user {} to challenge {}", from_id, to_id, challenge_id);
        self.requests.select_404(json!({ "id": id })).await
    }

    /// Moves an open request addressed to `to_id` into a terminal status.
    /// Requests that already left `open` are reported as not found.
    pub async fn respond(&self, request_id: i64, to_id: i64, status: RequestStatus) -> Result<i64, DatabaseError> {
        if !RequestStatus::Open.can_transition_to(status) {
            return Err(DatabaseError::Query(format!("invalid target status {}", status.as_str())));
        }

        let target = json!({
            "id": request_id,
            "to_id": to_id,
            "status": RequestStatus::Open.as_str(),
        });
        let request = self.requests.select_404(target.clone()).await?;
        self.requests
            .update_one(target, UpdateBuilder::touching().set("status", status.as_str()))
            .await?;
        Ok(request.challenge_id)
    }

    /// Sender withdraws a request that is still open
    pub async fn withdraw(&self, request_id: i64, from_id: i64) -> Result<(), DatabaseError> {
        self.requests
            .soft_delete_one(json!({
                "id": request_id,
                "from_id": from_id,
                "status": RequestStatus::Open.as_str(),
            }))
            .await
    }
}
