use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Score, ScoreCounter};
use crate::middleware::{ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::{path_id, Checked, Payload};

/// `{"amount": n}` with n > 0; zero and absent are both rejected
#[derive(Debug, Deserialize)]
pub struct Amount {
    pub amount: Option<i64>,
}

impl Payload for Amount {
    const ALLOWED: &'static [&'static str] = &["amount"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        match self.amount {
            Some(n) if n > 0 => vec![],
            _ => vec!["amount"],
        }
    }
}

/// GET /user/:user_id/score
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Score>> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;
    Ok(Json(state.scores().for_user(user_id).await?))
}

/// PUT /user/:user_id/score/:score_id/add_coins
pub async fn add_coins(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
    Checked(body): Checked<Amount>,
) -> ApiResult<Json<Score>> {
    adjust(&state, &user, ids, ScoreCounter::Coins, body.amount.unwrap_or_default()).await
}

/// PUT /user/:user_id/score/:score_id/add_exp
pub async fn add_exp(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
    Checked(body): Checked<Amount>,
) -> ApiResult<Json<Score>> {
    adjust(&state, &user, ids, ScoreCounter::Exp, body.amount.unwrap_or_default()).await
}

/// PUT /user/:user_id/score/:score_id/add_likes
pub async fn add_likes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
    Checked(body): Checked<Amount>,
) -> ApiResult<Json<Score>> {
    adjust(&state, &user, ids, ScoreCounter::Likes, body.amount.unwrap_or_default()).await
}

/// PUT /user/:user_id/score/:score_id/use_likes - 405 when the budget is too small
pub async fn use_likes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
    Checked(body): Checked<Amount>,
) -> ApiResult<Json<Score>> {
    adjust(&state, &user, ids, ScoreCounter::Likes, -body.amount.unwrap_or_default()).await
}

/// PUT /user/:user_id/score/:score_id/spend_coins - 405 when the balance is too small
pub async fn spend_coins(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
    Checked(body): Checked<Amount>,
) -> ApiResult<Json<Score>> {
    adjust(&state, &user, ids, ScoreCounter::Coins, -body.amount.unwrap_or_default()).await
}

async fn adjust(
    state: &AppState,
    user: &AuthUser,
    (user_id, score_id): (String, String),
    counter: ScoreCounter,
    delta: i64,
) -> ApiResult<Json<Score>> {
    let user_id = path_id(&user_id, "user_id")?;
    let score_id = path_id(&score_id, "score_id")?;
    user.authorize(user_id)?;

    let score = state.scores().adjust(score_id, user_id, counter, delta).await?;
    tracing::debug!("Score {} {} adjusted by {}", score_id, counter.column(), delta);
    Ok(Json(score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;
    use serde_json::json;

    #[test]
    fn amount_rejects_extra_fields_before_values() {
        let err = check::<Amount>(json!({ "amount": 50, "bonus": true })).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.fields().unwrap(), ["bonus".to_string()]);
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(check::<Amount>(json!({ "amount": 0 })).is_err());
        assert!(check::<Amount>(json!({ "amount": -5 })).is_err());
        assert_eq!(check::<Amount>(json!({ "amount": 5 })).unwrap().amount, Some(5));
    }
}
