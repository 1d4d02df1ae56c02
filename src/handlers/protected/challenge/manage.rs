use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Challenge, ChallengeStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResult, AuthUser, SuccessResp};
use crate::services::NewChallenge;
use crate::state::AppState;
use crate::types::GeoCoords;
use crate::validation::{path_id, present, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct CreateChallenge {
    pub name: Option<String>,
    pub description: Option<String>,
    pub geo_coords: Option<GeoCoords>,
    pub likes_needed_per_post: Option<i64>,
}

impl Payload for CreateChallenge {
    const ALLOWED: &'static [&'static str] = &["name", "description", "geo_coords", "likes_needed_per_post"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if !present(&self.name) {
            invalid.push("name");
        }
        if !present(&self.description) {
            invalid.push("description");
        }
        if self.geo_coords.map(|c| !c.is_valid()).unwrap_or(false) {
            invalid.push("geo_coords");
        }
        if self.likes_needed_per_post.map(|n| n < 0).unwrap_or(false) {
            invalid.push("likes_needed_per_post");
        }
        invalid
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateChallenge {
    pub description: Option<String>,
    pub geo_coords: Option<GeoCoords>,
}

impl Payload for UpdateChallenge {
    const ALLOWED: &'static [&'static str] = &["description", "geo_coords"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        match (&self.description, &self.geo_coords) {
            (None, None) => vec!["description", "geo_coords"],
            (description, coords) => {
                let mut invalid = Vec::new();
                if description.is_some() && !present(description) {
                    invalid.push("description");
                }
                if coords.map(|c| !c.is_valid()).unwrap_or(false) {
                    invalid.push("geo_coords");
                }
                invalid
            }
        }
    }
}

/// POST /challenge - Create a challenge; callers below the minimum level
/// must be admins.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Checked(body): Checked<CreateChallenge>,
) -> ApiResult<(StatusCode, Json<Challenge>)> {
    if !user.is_admin() {
        let level = state.scores().level_of(user.user_id).await?;
        let min_level = state.config.game.min_challenge_level;
        if level < min_level {
            tracing::debug!("User {} at level {} cannot create challenges", user.user_id, level);
            return Err(ApiError::not_allowed(format!(
                "Not allowed. Need level {} or more.",
                min_level
            )));
        }
    }

    let challenge = state
        .challenges()
        .create(NewChallenge {
            user_id: user.user_id,
            name: body.name.unwrap_or_default().trim().to_string(),
            description: body.description.unwrap_or_default().trim().to_string(),
            weight: user.weight,
            likes_needed_per_post: body.likes_needed_per_post.unwrap_or(0),
            geo_coords: body.geo_coords,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

/// PUT /challenge/:challenge_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Checked(body): Checked<UpdateChallenge>,
) -> ApiResult<Json<Challenge>> {
    let id = path_id(&challenge_id, "challenge_id")?;
    let service = state.challenges();
    let actor = user.authorize(service.owner_of(id).await?)?;

    let description = body.description.map(|d| d.trim().to_string());
    let challenge = service.update(id, actor, description, body.geo_coords).await?;
    Ok(Json(challenge))
}

/// PUT /challenge/:challenge_id/activate
pub async fn activate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
) -> ApiResult<SuccessResp> {
    set_status(&state, &user, &challenge_id, ChallengeStatus::Active).await?;
    Ok(SuccessResp::ok("Challenge activated"))
}

/// PUT /challenge/:challenge_id/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
) -> ApiResult<SuccessResp> {
    set_status(&state, &user, &challenge_id, ChallengeStatus::Inactive).await?;
    Ok(SuccessResp::ok("Challenge deactivated"))
}

async fn set_status(state: &AppState, user: &AuthUser, raw_id: &str, status: ChallengeStatus) -> ApiResult<()> {
    let id = path_id(raw_id, "challenge_id")?;
    let service = state.challenges();
    let actor = user.authorize(service.owner_of(id).await?)?;
    service.set_status(id, actor, status).await?;
    Ok(())
}

/// DELETE /challenge/:challenge_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
) -> ApiResult<SuccessResp> {
    let id = path_id(&challenge_id, "challenge_id")?;
    let service = state.challenges();
    let actor = user.authorize(service.owner_of(id).await?)?;
    service.delete(id, actor).await?;
    tracing::info!("User {} deleted challenge {}", user.user_id, id);
    Ok(SuccessResp::ok("Challenge deleted"))
}
