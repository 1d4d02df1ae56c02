use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::services::RankingArea;
use crate::state::AppState;
use crate::validation::query_number;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ids: Option<String>,
    pub fb_ids: Option<String>,
    pub radius: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub last_id: Option<String>,
}

/// GET /user?ids=1,2&fb_ids=a,b
/// GET /user?type=ranking&radius=&longitude=&latitude=&last_id=
pub async fn list(State(state): State<AppState>, Query(query): Query<UserQuery>) -> ApiResult<Json<Vec<User>>> {
    match query.kind.as_deref() {
        Some("ranking") => ranking(&state, &query).await,
        None | Some("") => by_ids(&state, &query).await,
        Some(_) => Err(ApiError::invalid_field("Invalid query param", "type")),
    }
}

async fn by_ids(state: &AppState, query: &UserQuery) -> ApiResult<Json<Vec<User>>> {
    let ids = split_list(query.ids.as_deref())
        .map(|id| id.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::invalid_field("Invalid query param", "ids"))?;
    let fb_ids: Vec<String> = split_list(query.fb_ids.as_deref()).map(str::to_string).collect();

    if ids.is_empty() && fb_ids.is_empty() {
        return Err(ApiError::validation("Invalid query param", ["ids", "fb_ids"]));
    }

    let users = state
        .users()
        .list_by_ids(&ids, &fb_ids, state.config.pagination.ranking)
        .await?;
    Ok(Json(users))
}

async fn ranking(state: &AppState, query: &UserQuery) -> ApiResult<Json<Vec<User>>> {
    let radius = query_number::<f64>(query.radius.as_deref(), "radius")?;
    let longitude = query_number::<f64>(query.longitude.as_deref(), "longitude")?;
    let latitude = query_number::<f64>(query.latitude.as_deref(), "latitude")?;
    let last_id = query_number::<i64>(query.last_id.as_deref(), "last_id")?.unwrap_or(0);

    let area = ranking_area(radius, longitude, latitude)?;
    let users = state
        .users()
        .ranking(area, last_id, state.config.pagination.ranking)
        .await?;
    Ok(Json(users))
}

/// The circle filter needs all three values or none of them
fn ranking_area(
    radius: Option<f64>,
    longitude: Option<f64>,
    latitude: Option<f64>,
) -> Result<Option<RankingArea>, ApiError> {
    match (radius, longitude, latitude) {
        (None, None, None) => Ok(None),
        (Some(radius_meters), Some(longitude), Some(latitude))
            if radius_meters > 0.0 && (-180.0..=180.0).contains(&longitude) && (-90.0..=90.0).contains(&latitude) =>
        {
            Ok(Some(RankingArea { longitude, latitude, radius_meters }))
        }
        (radius, longitude, latitude) => {
            let mut fields = Vec::new();
            if !radius.map(|r| r > 0.0).unwrap_or(false) {
                fields.push("radius");
            }
            if !longitude.map(|l| (-180.0..=180.0).contains(&l)).unwrap_or(false) {
                fields.push("longitude");
            }
            if !latitude.map(|l| (-90.0..=90.0).contains(&l)).unwrap_or(false) {
                fields.push("latitude");
            }
            Err(ApiError::validation("Invalid query param", fields))
        }
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default().split(',').map(str::trim).filter(|s| !s.is_empty())
}
