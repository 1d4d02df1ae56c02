use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::database::models::OneSignal;
use crate::middleware::{ApiResult, AuthUser, SuccessResp};
use crate::state::AppState;
use crate::validation::{present, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct RegisterDevice {
    pub imei: Option<String>,
    pub player_id: Option<String>,
}

impl Payload for RegisterDevice {
    const ALLOWED: &'static [&'static str] = &["imei", "player_id"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if !present(&self.imei) {
            invalid.push("imei");
        }
        if !present(&self.player_id) {
            invalid.push("player_id");
        }
        invalid
    }
}

#[derive(Debug, Deserialize)]
pub struct Logout {
    pub imei: Option<String>,
}

impl Payload for Logout {
    const ALLOWED: &'static [&'static str] = &["imei"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        if present(&self.imei) {
            vec![]
        } else {
            vec!["imei"]
        }
    }
}

/// PUT /onesignal - Register (or re-register) this device for push notifications
pub async fn register(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Checked(body): Checked<RegisterDevice>,
) -> ApiResult<Json<OneSignal>> {
    let imei = body.imei.unwrap_or_default();
    let player_id = body.player_id.unwrap_or_default();
    let registration = state
        .one_signals()
        .upsert(user.user_id, imei.trim(), player_id.trim())
        .await?;
    Ok(Json(registration))
}

/// POST /logout - Forget this device; tokens stay valid until they expire
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Checked(body): Checked<Logout>,
) -> ApiResult<SuccessResp> {
    let imei = body.imei.unwrap_or_default();
    if !state.one_signals().remove(user.user_id, imei.trim()).await? {
        tracing::debug!("No device registration for user {} on logout", user.user_id);
    }
    Ok(SuccessResp::ok("Logged out"))
}
