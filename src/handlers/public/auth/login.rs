// handlers/public/auth/login.rs - POST /login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::state::AppState;
use crate::validation::{is_valid_email, present, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub facebook_token: Option<String>,
    /// Device identifier; accepted for push registration clients, unused here
    pub imei: Option<String>,
}

impl Payload for LoginRequest {
    const ALLOWED: &'static [&'static str] = &["email", "facebook_token", "imei"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        let email = self.email.as_deref().map(|e| e.trim().to_lowercase());
        if !email.as_deref().map(is_valid_email).unwrap_or(false) {
            invalid.push("email");
        }
        if !present(&self.facebook_token) {
            invalid.push("facebook_token");
        }
        invalid
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// POST /login - Exchange a Facebook access token for a bearer token.
///
/// First login creates the user together with its starting score.
pub async fn post(
    State(state): State<AppState>,
    Checked(body): Checked<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = body.email.unwrap_or_default().trim().to_lowercase();
    let facebook_token = body.facebook_token.unwrap_or_default();

    let identity = state.identity.verify(facebook_token.trim()).await?;

    let provider_email = identity.email.as_deref().map(|e| e.trim().to_lowercase());
    if provider_email.as_deref() != Some(email.as_str()) {
        tracing::warn!("Login email does not match provider email for facebook id {}", identity.id);
        return Err(ApiError::invalid_field("Email does not match facebook account", "email"));
    }

    let game = &state.config.game;
    let (user, created) = state
        .users()
        .login(&identity, &email, game.starting_likes, game.starting_level_id)
        .await?;

    let token = state
        .tokens
        .issue(user.id, &user.facebook_user_id, user.weight, user.role)?;

    tracing::info!("User {} logged in (new account: {})", user.id, created);
    Ok(Json(LoginResponse { token, user }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;
    use serde_json::json;

    #[test]
    fn login_payload_is_allow_listed() {
        let err = check::<LoginRequest>(json!({
            "email": "a@b.com",
            "facebook_token": "t",
            "password": "x",
        }))
        .unwrap_err();
        assert_eq!(err.fields().unwrap(), ["password".to_string()]);
    }

    #[test]
    fn email_is_compared_case_insensitively() {
        let body = check::<LoginRequest>(json!({ "email": "Jane@Example.COM", "facebook_token": "t" })).unwrap();
        assert_eq!(body.email.as_deref(), Some("Jane@Example.COM"));

        let err = check::<LoginRequest>(json!({ "email": "nope", "facebook_token": " " })).unwrap_err();
        assert_eq!(err.fields().unwrap(), ["email".to_string(), "facebook_token".to_string()]);
    }
}
