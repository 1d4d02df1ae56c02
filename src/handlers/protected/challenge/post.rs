use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Post, ReactionKind};
use crate::middleware::{ApiResult, AuthUser, SuccessResp};
use crate::services::NewPost;
use crate::state::AppState;
use crate::validation::{path_id, present, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub file_url: Option<String>,
    pub content_type: Option<String>,
    pub content_size: Option<i64>,
}

impl Payload for CreatePost {
    const ALLOWED: &'static [&'static str] = &["file_url", "content_type", "content_size"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if !present(&self.file_url) {
            invalid.push("file_url");
        }
        if !present(&self.content_type) {
            invalid.push("content_type");
        }
        if !self.content_size.map(|n| n > 0).unwrap_or(false) {
            invalid.push("content_size");
        }
        invalid
    }
}

/// POST /challenge/:challenge_id/post
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Checked(body): Checked<CreatePost>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let challenge_id = path_id(&challenge_id, "challenge_id")?;
    let post = state
        .posts()
        .create(NewPost {
            user_id: user.user_id,
            challenge_id,
            file_url: body.file_url.unwrap_or_default().trim().to_string(),
            content_type: body.content_type.unwrap_or_default().trim().to_string(),
            content_size: body.content_size.unwrap_or_default(),
        })
        .await?;
    tracing::info!("User {} posted {} to challenge {}", user.user_id, post.id, challenge_id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /challenge/:challenge_id/post/:post_id/like
pub async fn like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    react(&state, &user, ids, ReactionKind::Like, true).await?;
    Ok(SuccessResp::ok("Post liked"))
}

/// PUT /challenge/:challenge_id/post/:post_id/unlike
pub async fn unlike(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    react(&state, &user, ids, ReactionKind::Like, false).await?;
    Ok(SuccessResp::ok("Post unliked"))
}

/// PUT /challenge/:challenge_id/post/:post_id/flag
pub async fn flag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    react(&state, &user, ids, ReactionKind::Flag, true).await?;
    Ok(SuccessResp::ok("Post flagged"))
}

/// PUT /challenge/:challenge_id/post/:post_id/unflag
pub async fn unflag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    react(&state, &user, ids, ReactionKind::Flag, false).await?;
    Ok(SuccessResp::ok("Post unflagged"))
}

async fn react(
    state: &AppState,
    user: &AuthUser,
    (challenge_id, post_id): (String, String),
    kind: ReactionKind,
    add: bool,
) -> ApiResult<()> {
    let challenge_id = path_id(&challenge_id, "challenge_id")?;
    let post_id = path_id(&post_id, "post_id")?;
    let posts = state.posts();
    if add {
        posts.react(kind, user.user_id, challenge_id, post_id).await?;
    } else {
        posts.unreact(kind, user.user_id, challenge_id, post_id).await?;
    }
    Ok(())
}

/// DELETE /challenge/:challenge_id/post/:post_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((challenge_id, post_id)): Path<(String, String)>,
) -> ApiResult<SuccessResp> {
    let challenge_id = path_id(&challenge_id, "challenge_id")?;
    let post_id = path_id(&post_id, "post_id")?;
    let posts = state.posts();
    let actor = user.authorize(posts.owner_of(post_id).await?)?;
    posts.delete(challenge_id, post_id, actor).await?;
    Ok(SuccessResp::ok("Post deleted"))
}
