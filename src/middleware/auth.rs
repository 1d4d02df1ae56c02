use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Actor, Role};

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub facebook_user_id: String,
    pub weight: f64,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.id,
            facebook_user_id: claims.facebook_user_id,
            weight: claims.weight,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Authorization context for mutations on shared rows
    pub fn actor(&self) -> Actor {
        if self.is_admin() {
            Actor::Admin
        } else {
            Actor::Owner(self.user_id)
        }
    }

    pub fn can_act_for(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }

    /// Owner-or-admin gate
    pub fn authorize(&self, owner_id: i64) -> Result<Actor, ApiError> {
        if self.can_act_for(owner_id) {
            Ok(self.actor())
        } else {
            tracing::warn!("User {} refused access to rows owned by {}", self.user_id, owner_id);
            Err(ApiError::forbidden("Not allowed please check token"))
        }
    }

    /// Party-only gate: admins get no override
    pub fn require_self(&self, user_id: i64) -> Result<(), ApiError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            tracing::warn!("User {} refused acting as party {}", self.user_id, user_id);
            Err(ApiError::forbidden("Not allowed please check token"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!("User {} refused admin-only operation", self.user_id);
            Err(ApiError::forbidden("Admin role required"))
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_token(request.uri().query(), &headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::forbidden(msg).into_response(),
    };

    let claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Token rejected: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    // Convert claims to AuthUser and inject into request
    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}

/// Token from `?token=`, the `access-token` header, or `Authorization: Bearer`
fn extract_token(query: Option<&str>, headers: &HeaderMap) -> Result<String, String> {
    let from_query = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    });
    if let Some(token) = from_query.filter(|t| !t.trim().is_empty()) {
        return Ok(token);
    }

    if let Some(value) = headers.get("access-token") {
        let token = value.to_str().map_err(|_| "Invalid access-token header".to_string())?;
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        let auth_str = value
            .to_str()
            .map_err(|_| "Invalid Authorization header format".to_string())?;
        return match auth_str.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err("Authorization header must use Bearer token format".to_string()),
        };
    }

    Err("Missing token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_token_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("access-token", HeaderValue::from_static("header"));
        assert_eq!(extract_token(Some("a=1&token=abc"), &headers).unwrap(), "abc");
    }

    #[test]
    fn header_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("access-token", HeaderValue::from_static("xyz"));
        assert_eq!(extract_token(None, &headers).unwrap(), "xyz");

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer jwt"));
        assert_eq!(extract_token(Some("type=hot"), &headers).unwrap(), "jwt");

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_token(None, &headers).is_err());
    }

    #[test]
    fn missing_token() {
        assert_eq!(extract_token(None, &HeaderMap::new()).unwrap_err(), "Missing token");
    }

    #[test]
    fn owner_or_admin() {
        let user = AuthUser { user_id: 3, facebook_user_id: "fb".into(), weight: 0.0, role: Role::User };
        assert_eq!(user.authorize(3).unwrap(), Actor::Owner(3));
        assert_eq!(user.authorize(4).unwrap_err().status_code(), axum::http::StatusCode::FORBIDDEN);
        let admin = AuthUser { role: Role::Admin, ..user };
        assert_eq!(admin.authorize(4).unwrap(), Actor::Admin);
    }

    #[test]
    fn party_gate_has_no_admin_override() {
        let admin = AuthUser { user_id: 1, facebook_user_id: "fb".into(), weight: 0.0, role: Role::Admin };
        assert!(admin.require_self(1).is_ok());
        assert_eq!(admin.require_self(2).unwrap_err().status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
