use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// `{"status": 200, "message": "..."}` acknowledgement body, optionally
/// carrying extra top-level fields (e.g. the `challenge_id` of an accepted request)
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResp {
    pub status: u16,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SuccessResp {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for SuccessResp {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

// Convenience type alias for handlers returning a JSON body
pub type ApiResult<T> = Result<T, crate::error::ApiError>;
