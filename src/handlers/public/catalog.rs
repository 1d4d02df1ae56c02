// handlers/public/catalog.rs - GET /level and GET /vanity_item

use axum::{extract::State, Json};

use crate::database::models::{Level, VanityItem};
use crate::middleware::ApiResult;
use crate::state::AppState;

pub async fn levels(State(state): State<AppState>) -> ApiResult<Json<Vec<Level>>> {
    Ok(Json(state.catalog().levels().await?))
}

pub async fn vanity_items(State(state): State<AppState>) -> ApiResult<Json<Vec<VanityItem>>> {
    Ok(Json(state.catalog().vanity_items().await?))
}
