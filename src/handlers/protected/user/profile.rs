use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::User;
use crate::database::query_builder::UpdateBuilder;
use crate::error::ApiError;
use crate::middleware::{ApiResult, AuthUser, SuccessResp};
use crate::state::AppState;
use crate::types::GeoCoords;
use crate::validation::{is_valid_date, path_id, present, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub geo_coords: Option<GeoCoords>,
}

impl Payload for UpdateProfile {
    const ALLOWED: &'static [&'static str] = &["name", "gender", "date_of_birth", "geo_coords"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        if self.name.is_none() && self.gender.is_none() && self.date_of_birth.is_none() && self.geo_coords.is_none() {
            return Self::ALLOWED.to_vec();
        }

        let mut invalid = Vec::new();
        if self.name.is_some() && !present(&self.name) {
            invalid.push("name");
        }
        if self.gender.is_some() && !present(&self.gender) {
            invalid.push("gender");
        }
        if let Some(date) = &self.date_of_birth {
            if !is_valid_date(date.trim()) {
                invalid.push("date_of_birth");
            }
        }
        if self.geo_coords.map(|c| !c.is_valid()).unwrap_or(false) {
            invalid.push("geo_coords");
        }
        invalid
    }
}

impl UpdateProfile {
    fn into_update(self) -> UpdateBuilder {
        let mut update = UpdateBuilder::touching()
            .set_if("name", self.name.map(|s| s.trim().to_string()))
            .set_if("gender", self.gender.map(|s| s.trim().to_string()));
        if let Some(date) = self.date_of_birth {
            update = update.set_cast("date_of_birth", date.trim().to_string(), "date");
        }
        if let Some(coords) = self.geo_coords {
            update = update.set("longitude", coords.long).set("latitude", coords.lat);
        }
        update
    }
}

#[derive(Debug, Deserialize)]
pub struct SetWeight {
    pub weight: Option<f64>,
}

impl Payload for SetWeight {
    const ALLOWED: &'static [&'static str] = &["weight"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        match self.weight {
            Some(w) if w.is_finite() && w >= 0.0 => vec![],
            _ => vec!["weight"],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetLevel {
    pub level_id: Option<i64>,
}

impl Payload for SetLevel {
    const ALLOWED: &'static [&'static str] = &["level_id"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        match self.level_id {
            Some(id) if id > 0 => vec![],
            _ => vec!["level_id"],
        }
    }
}

/// PUT /user/:user_id - Partial profile update
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Checked(body): Checked<UpdateProfile>,
) -> ApiResult<Json<User>> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;

    let users = state.users();
    users.update(user_id, body.into_update()).await?;
    Ok(Json(users.get(user_id).await?))
}

/// PUT /user/:user_id/weight
pub async fn set_weight(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Checked(body): Checked<SetWeight>,
) -> ApiResult<SuccessResp> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;

    let weight = body.weight.unwrap_or_default();
    state
        .users()
        .update(user_id, UpdateBuilder::touching().set("weight", weight))
        .await?;
    Ok(SuccessResp::ok("Weight updated"))
}

/// PUT /user/:user_id/level - Admin only
pub async fn set_level(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Checked(body): Checked<SetLevel>,
) -> ApiResult<SuccessResp> {
    let user_id = path_id(&user_id, "user_id")?;
    user.require_admin()?;

    let level_id = body.level_id.unwrap_or_default();
    if !state.catalog().level_exists(level_id).await? {
        return Err(ApiError::not_found("Level not found"));
    }
    state.scores().set_level(user_id, level_id).await?;
    tracing::info!("Admin {} moved user {} to level {}", user.user_id, user_id, level_id);
    Ok(SuccessResp::ok("Level updated"))
}

/// DELETE /user/:user_id - Soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<SuccessResp> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;

    state.users().soft_delete(user_id).await?;
    tracing::info!("User {} deleted by {}", user_id, user.user_id);
    Ok(SuccessResp::ok("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;
    use serde_json::json;

    #[test]
    fn empty_profile_update_names_every_field() {
        let err = check::<UpdateProfile>(json!({})).unwrap_err();
        assert_eq!(err.fields().unwrap().len(), UpdateProfile::ALLOWED.len());
    }

    #[test]
    fn profile_fields_are_checked_individually() {
        let err = check::<UpdateProfile>(json!({ "name": "Jo", "date_of_birth": "31/12/1990" })).unwrap_err();
        assert_eq!(err.fields().unwrap(), ["date_of_birth".to_string()]);
        assert!(check::<UpdateProfile>(json!({ "gender": "female" })).is_ok());
    }

    #[test]
    fn weight_and_level_accept_zero_only_where_meaningful() {
        assert!(check::<SetWeight>(json!({ "weight": 0.0 })).is_ok());
        assert!(check::<SetWeight>(json!({ "weight": -1.0 })).is_err());
        assert!(check::<SetLevel>(json!({ "level_id": 0 })).is_err());
        assert!(check::<SetLevel>(json!({})).is_err());
    }
}
