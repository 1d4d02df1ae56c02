use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::external::storage::{extension_for, object_key};
use crate::external::PresignedUpload;
use crate::middleware::{ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SignQuery {
    #[serde(rename = "file-name")]
    pub file_name: Option<String>,
    #[serde(rename = "content-type")]
    pub content_type: Option<String>,
}

/// GET /s3Sign?file-name=&content-type= - Presigned PUT for a media upload
pub async fn sign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SignQuery>,
) -> ApiResult<Json<PresignedUpload>> {
    let file_name = query.file_name.as_deref().map(str::trim).unwrap_or_default();
    let content_type = query.content_type.as_deref().map(str::trim).unwrap_or_default();

    let mut invalid = Vec::new();
    if file_name.is_empty() {
        invalid.push("file-name");
    }
    let extension = extension_for(content_type);
    if extension.is_none() {
        invalid.push("content-type");
    }
    let extension = match extension {
        Some(ext) if invalid.is_empty() => ext,
        _ => return Err(ApiError::validation("Invalid query param", invalid)),
    };

    let key = object_key(file_name, extension);
    let upload = state.storage.presign_upload(&key, content_type)?;
    tracing::debug!("User {} signed upload {}", user.user_id, key);
    Ok(Json(upload))
}
