use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full application router: public routes, protected routes behind the
/// token middleware, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, catalog, challenge, health, user};

    Router::new()
        .route("/health", get(health::get))
        .route("/login", post(auth::login_post))
        .route("/challenge", get(challenge::challenge_list))
        .route("/challenge/:challenge_id", get(challenge::challenge_get))
        .route("/challenge/:challenge_id/post", get(challenge::post_list))
        .route("/challenge/:challenge_id/post/:post_id", get(challenge::post_get))
        .route("/user", get(user::user_list))
        .route("/level", get(catalog::levels))
        .route("/vanity_item", get(catalog::vanity_items))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(challenge_routes())
        .merge(user_routes())
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn session_routes() -> Router<AppState> {
    use protected::session;

    Router::new()
        .route("/s3Sign", get(session::upload_sign))
        .route("/onesignal", put(session::device_register))
        .route("/logout", post(session::device_logout))
}

fn challenge_routes() -> Router<AppState> {
    use protected::challenge;

    Router::new()
        .route("/challenge", post(challenge::challenge_create))
        .route(
            "/challenge/:challenge_id",
            put(challenge::challenge_update).delete(challenge::challenge_delete),
        )
        .route("/challenge/:challenge_id/activate", put(challenge::challenge_activate))
        .route("/challenge/:challenge_id/deactivate", put(challenge::challenge_deactivate))
        .route("/challenge/:challenge_id/post", post(challenge::post_create))
        .route("/challenge/:challenge_id/post/:post_id", axum::routing::delete(challenge::post_delete))
        .route("/challenge/:challenge_id/post/:post_id/like", put(challenge::post_like))
        .route("/challenge/:challenge_id/post/:post_id/unlike", put(challenge::post_unlike))
        .route("/challenge/:challenge_id/post/:post_id/flag", put(challenge::post_flag))
        .route("/challenge/:challenge_id/post/:post_id/unflag", put(challenge::post_unflag))
}

fn user_routes() -> Router<AppState> {
    use protected::user;

    Router::new()
        .route("/user/:user_id", put(user::user_update).delete(user::user_delete))
        .route("/user/:user_id/weight", put(user::user_set_weight))
        .route("/user/:user_id/level", put(user::user_set_level))
        .route("/user/:user_id/score", get(user::score_get))
        .route("/user/:user_id/score/:score_id/add_coins", put(user::score_add_coins))
        .route("/user/:user_id/score/:score_id/add_exp", put(user::score_add_exp))
        .route("/user/:user_id/score/:score_id/add_likes", put(user::score_add_likes))
        .route("/user/:user_id/score/:score_id/use_likes", put(user::score_use_likes))
        .route("/user/:user_id/score/:score_id/spend_coins", put(user::score_spend_coins))
        .route(
            "/user/:user_id/challenge_request",
            get(user::request_list).post(user::request_create),
        )
        .route(
            "/user/:user_id/challenge_request/:request_id",
            put(user::request_respond).delete(user::request_withdraw),
        )
        .route(
            "/user/:user_id/bought_item",
            get(user::bought_item_list).post(user::bought_item_purchase),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::database::DatabaseManager;
    use crate::external::{IdentityError, IdentityProvider, ObjectStore, PresignedUpload, ProviderIdentity, StorageError};

    struct NoIdentity;

    #[async_trait::async_trait]
    impl IdentityProvider for NoIdentity {
        async fn verify(&self, _token: &str) -> Result<ProviderIdentity, IdentityError> {
            Err(IdentityError::Rejected("no identity in tests".to_string()))
        }
    }

    struct NoStorage;

    impl ObjectStore for NoStorage {
        fn presign_upload(&self, _key: &str, _content_type: &str) -> Result<PresignedUpload, StorageError> {
            Err(StorageError::NotConfigured)
        }
    }

    fn test_app() -> Router {
        let mut config = AppConfig::development();
        config.database.url = "postgres://localhost:1/unused".to_string();
        let db = DatabaseManager::connect_lazy(&config.database).unwrap();
        let state = AppState::new(config, db, Arc::new(NoIdentity), Arc::new(NoStorage)).unwrap();
        app(state)
    }

    #[tokio::test]
    async fn protected_route_without_token_is_forbidden() {
        let response = test_app()
            .oneshot(Request::put("/user/1/score/5/add_coins").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn tampered_token_is_forbidden() {
        let response = test_app()
            .oneshot(
                Request::get("/s3Sign?file-name=a.jpg&content-type=image/jpeg")
                    .header("access-token", "not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn disallowed_field_is_rejected_before_any_query() {
        let state_app = test_app();
        let config = AppConfig::development();
        let tokens = crate::auth::TokenIssuer::new(&config.security).unwrap();
        let token = tokens.issue(1, "fb-1", 0.0, crate::types::Role::User).unwrap();

        let response = state_app
            .oneshot(
                Request::put("/user/1/score/5/add_coins")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"amount": 50, "bonus": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["fields"], serde_json::json!(["bonus"]));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_without_token() {
        let response = test_app()
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
