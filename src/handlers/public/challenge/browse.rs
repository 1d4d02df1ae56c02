use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::database::models::Challenge;
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::services::ChallengeListing;
use crate::state::AppState;
use crate::validation::{path_id, query_number};

#[derive(Debug, Default, Deserialize)]
pub struct ChallengeListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub last_id: Option<String>,
}

/// GET /challenge?type=hot|fresh&user_id=&last_id=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ChallengeListQuery>,
) -> ApiResult<Json<Vec<Challenge>>> {
    let listing = ChallengeListing::parse(query.kind.as_deref())
        .ok_or_else(|| ApiError::invalid_field("Invalid query param", "type"))?;
    let creator = query_number::<i64>(query.user_id.as_deref(), "user_id")?;
    let last_id = query_number::<i64>(query.last_id.as_deref(), "last_id")?.unwrap_or(0);

    let challenges = state
        .challenges()
        .list(listing, creator, last_id, state.config.pagination.challenges)
        .await?;
    Ok(Json(challenges))
}

/// GET /challenge/:challenge_id
pub async fn get(State(state): State<AppState>, Path(challenge_id): Path<String>) -> ApiResult<Json<Challenge>> {
    let id = path_id(&challenge_id, "challenge_id")?;
    Ok(Json(state.challenges().get(id).await?))
}
