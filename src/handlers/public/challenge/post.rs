use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::database::models::Post;
use crate::middleware::ApiResult;
use crate::state::AppState;
use crate::validation::{path_id, query_number};

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub last_id: Option<String>,
}

/// GET /challenge/:challenge_id/post?last_id=
pub async fn list(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
    Query(query): Query<PostListQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let challenge_id = path_id(&challenge_id, "challenge_id")?;
    let last_id = query_number::<i64>(query.last_id.as_deref(), "last_id")?.unwrap_or(0);

    let posts = state
        .posts()
        .list(challenge_id, last_id, state.config.pagination.posts)
        .await?;
    Ok(Json(posts))
}

/// GET /challenge/:challenge_id/post/:post_id
pub async fn get(
    State(state): State<AppState>,
    Path((challenge_id, post_id)): Path<(String, String)>,
) -> ApiResult<Json<Post>> {
    let challenge_id = path_id(&challenge_id, "challenge_id")?;
    let post_id = path_id(&post_id, "post_id")?;
    Ok(Json(state.posts().get(challenge_id, post_id).await?))
}
