#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use challengr_api::auth::TokenIssuer;
use challengr_api::config::AppConfig;
use challengr_api::database::DatabaseManager;
use challengr_api::external::{
    IdentityError, IdentityProvider, ObjectStore, PresignedUpload, ProviderIdentity, StorageError,
};
use challengr_api::types::Role;
use challengr_api::AppState;

/// Accepts tokens of the form `fb:<id>:<email>`; anything else is rejected
pub struct StubIdentity;

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify(&self, token: &str) -> Result<ProviderIdentity, IdentityError> {
        let mut parts = token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("fb"), Some(id), Some(email)) if !id.is_empty() => Ok(ProviderIdentity {
                id: id.to_string(),
                email: Some(email.to_string()),
                name: Some(format!("Tester {}", id)),
            }),
            _ => Err(IdentityError::Rejected("Invalid OAuth access token".to_string())),
        }
    }
}

pub struct StubStorage;

impl ObjectStore for StubStorage {
    fn presign_upload(&self, key: &str, content_type: &str) -> Result<PresignedUpload, StorageError> {
        Ok(PresignedUpload {
            signed_request: format!("https://bucket.test/{}?X-Amz-Signature=stub", key),
            url: format!("https://bucket.test/{}", key),
            headers: [("Content-Type".to_string(), content_type.to_string())].into(),
        })
    }
}

/// In-process server on a free port, stopped with the test's runtime
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub tokens: TokenIssuer,
    pub db: Option<DatabaseManager>,
}

impl TestServer {
    /// Server with a pool that never connects; for tests that must not reach the database
    pub async fn without_database() -> Result<Self> {
        let mut config = test_config();
        config.database.url = "postgres://challengr@127.0.0.1:1/unreachable".to_string();
        let db = DatabaseManager::connect_lazy(&config.database)?;
        Self::spawn(config, db, false).await
    }

    /// Server backed by `TEST_DATABASE_URL`, or None when it is not set
    pub async fn with_database() -> Result<Option<Self>> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("TEST_DATABASE_URL not set, skipping database test");
                return Ok(None);
            }
        };
        let mut config = test_config();
        config.database.url = url;
        let db = DatabaseManager::connect(&config.database).await?;
        db.migrate().await?;
        Ok(Some(Self::spawn(config, db, true).await?))
    }

    async fn spawn(config: AppConfig, db: DatabaseManager, keep_db: bool) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let tokens = TokenIssuer::new(&config.security)?;

        let state = AppState::new(config, db.clone(), Arc::new(StubIdentity), Arc::new(StubStorage))?;
        let app = challengr_api::app(state);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url,
            client: reqwest::Client::new(),
            tokens,
            db: keep_db.then_some(db),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        self.db.as_ref().expect("database-backed server").pool()
    }

    /// Token signed with the server's secret, without touching the database
    pub fn token_for(&self, user_id: i64, role: Role) -> String {
        self.tokens
            .issue(user_id, &format!("fb-{}", user_id), 0.0, role)
            .expect("token issues")
    }

    /// Logs a fresh Facebook identity in; returns (token, user body)
    pub async fn login_new_user(&self) -> Result<(String, Value)> {
        let fb_id = uuid::Uuid::new_v4().simple().to_string();
        let email = format!("{}@example.com", &fb_id[..12]);
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "facebook_token": format!("fb:{}:{}", fb_id, email) }))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "login failed: {}", resp.status());
        let body: Value = resp.json().await?;
        let token = body["token"].as_str().context("token in login response")?.to_string();
        Ok((token, body["user"].clone()))
    }

    pub async fn score_of(&self, token: &str, user_id: i64) -> Result<Value> {
        let resp = self
            .client
            .get(self.url(&format!("/user/{}/score", user_id)))
            .bearer_auth(token)
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "score lookup failed: {}", resp.status());
        Ok(resp.json().await?)
    }

    /// Active challenge owned by `user_id`, inserted directly
    pub async fn insert_challenge(&self, user_id: i64, name: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO challenges (user_id, name, description) VALUES ($1, $2, 'test challenge') RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(self.pool())
        .await?;
        Ok(id)
    }

    /// Live post by `user_id` on `challenge_id`, inserted directly
    pub async fn insert_post(&self, user_id: i64, challenge_id: i64) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO posts (user_id, challenge_id, file_url, content_type, content_size)
             VALUES ($1, $2, 'https://bucket.test/clip.mp4', 'video/mp4', 1024) RETURNING id",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(self.pool())
        .await?;
        Ok(id)
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.connection_timeout = 2;
    config.database.max_connections = 5;
    config.security.jwt_secret = "integration test secret".to_string();
    config
}
