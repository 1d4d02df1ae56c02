use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{ChallengeRequest, RequestStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResult, AuthUser, SuccessResp};
use crate::services::RequestDirection;
use crate::state::AppState;
use crate::validation::{path_id, query_number, Checked, Payload};

#[derive(Debug, Default, Deserialize)]
pub struct RequestListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub last_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RespondQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub to_id: Option<i64>,
    pub challenge_id: Option<i64>,
    pub message: Option<String>,
}

impl Payload for CreateRequest {
    const ALLOWED: &'static [&'static str] = &["to_id", "challenge_id", "message"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if !self.to_id.map(|id| id > 0).unwrap_or(false) {
            invalid.push("to_id");
        }
        if !self.challenge_id.map(|id| id > 0).unwrap_or(false) {
            invalid.push("challenge_id");
        }
        invalid
    }
}

/// GET /user/:user_id/challenge_request?type=sent|received&last_id=
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<Json<Vec<ChallengeRequest>>> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;

    let direction = RequestDirection::parse(query.kind.as_deref())
        .ok_or_else(|| ApiError::invalid_field("Invalid query param", "type"))?;
    let last_id = query_number::<i64>(query.last_id.as_deref(), "last_id")?.unwrap_or(0);

    let requests = state
        .requests()
        .list(user_id, direction, last_id, state.config.pagination.requests)
        .await?;
    Ok(Json(requests))
}

/// POST /user/:user_id/challenge_request - Challenge another user
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Checked(body): Checked<CreateRequest>,
) -> ApiResult<(StatusCode, Json<ChallengeRequest>)> {
    let from_id = path_id(&user_id, "user_id")?;
    user.authorize(from_id)?;

    let to_id = body.to_id.unwrap_or_default();
    if to_id == from_id {
        return Err(ApiError::invalid_field("Cannot challenge yourself", "to_id"));
    }
    let message = body.message.unwrap_or_default();

    let request = state
        .requests()
        .create(from_id, to_id, body.challenge_id.unwrap_or_default(), message.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// PUT /user/:user_id/challenge_request/:request_id?status=accepted|rejected
///
/// Only the addressee answers, and only once: an answered request is not found.
pub async fn respond(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, request_id)): Path<(String, String)>,
    Query(query): Query<RespondQuery>,
) -> ApiResult<SuccessResp> {
    let to_id = path_id(&user_id, "user_id")?;
    let request_id = path_id(&request_id, "request_id")?;
    user.require_self(to_id)?;

    let status = match query.status.as_deref() {
        Some("accepted") => RequestStatus::Accepted,
        Some("rejected") => RequestStatus::Rejected,
        _ => return Err(ApiError::invalid_field("Invalid query param", "status")),
    };

    let challenge_id = state.requests().respond(request_id, to_id, status).await?;
    tracing::info!("Challenge request {} {} by user {}", request_id, status.as_str(), to_id);
    Ok(SuccessResp::ok(format!("Challenge request {}", status.as_str())).with("challenge_id", challenge_id))
}

/// DELETE /user/:user_id/challenge_request/:request_id - Sender withdraws an open request.
///
/// Admins cannot withdraw on the sender's behalf.
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, request_id)): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    let from_id = path_id(&user_id, "user_id")?;
    let request_id = path_id(&request_id, "request_id")?;
    user.require_self(from_id)?;

    state.requests().withdraw(request_id, from_id).await?;
    Ok(SuccessResp::ok("Challenge request deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;
    use serde_json::json;

    #[test]
    fn request_needs_target_and_challenge() {
        let err = check::<CreateRequest>(json!({ "message": "Beat this" })).unwrap_err();
        assert_eq!(err.fields().unwrap(), ["to_id".to_string(), "challenge_id".to_string()]);
        assert!(check::<CreateRequest>(json!({ "to_id": 2, "challenge_id": 9 })).is_ok());
    }
}
