use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::database::models::challenge::ChallengeSummary;
use crate::database::models::user::UserSummary;
use crate::database::repository::Entity;
use crate::types::UnknownVariant;

/// `open` is the only state that accepts a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Open,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Open)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        *self == RequestStatus::Open && next.is_terminal()
    }
}

impl TryFrom<String> for RequestStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "open" => Ok(RequestStatus::Open),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(UnknownVariant { kind: "request status", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChallengeRequest {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub challenge_id: i64,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub from: Option<Json<UserSummary>>,
    pub to: Option<Json<UserSummary>>,
    pub challenge: Option<Json<ChallengeSummary>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ChallengeRequest {
    const TABLE: &'static str = "challenge_requests";
    const LABEL: &'static str = "Challenge request";
    const SOFT_DELETE: bool = true;
    const OWNER_COLUMN: &'static str = "from_id";
    const PROJECTION: &'static str = r#""challenge_requests"."id", "challenge_requests"."from_id", "challenge_requests"."to_id",
        "challenge_requests"."challenge_id", "challenge_requests"."message", "challenge_requests"."status",
        (SELECT json_build_object('id', u."id", 'name', u."name", 'facebook_user_id', u."facebook_user_id")
            FROM "users" u WHERE u."id" = "challenge_requests"."from_id") AS "from",
        (SELECT json_build_object('id', u."id", 'name', u."name", 'facebook_user_id', u."facebook_user_id")
            FROM "users" u WHERE u."id" = "challenge_requests"."to_id") AS "to",
        (SELECT json_build_object('id', c."id", 'name', c."name", 'status', c."status")
            FROM "challenges" c WHERE c."id" = "challenge_requests"."challenge_id") AS challenge,
        "challenge_requests"."created_at", "challenge_requests"."updated_at""#;
}
