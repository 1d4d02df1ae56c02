use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Identity as reported by the provider for a bearer token
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderIdentity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider refused the token
    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ProviderIdentity, IdentityError>;
}

/// Facebook Graph API `/me` lookup
pub struct FacebookIdentity {
    client: reqwest::Client,
    graph_url: String,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
}

impl FacebookIdentity {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            graph_url: config.facebook_graph_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FacebookIdentity {
    async fn verify(&self, token: &str) -> Result<ProviderIdentity, IdentityError> {
        let response = self
            .client
            .get(format!("{}/me", self.graph_url))
            .query(&[("fields", "id,email,name"), ("access_token", token)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let message = serde_json::from_str::<GraphError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(IdentityError::Rejected(message));
        }
        if !status.is_success() {
            return Err(IdentityError::Decode(format!("status {}", status)));
        }

        let identity: ProviderIdentity =
            serde_json::from_str(&body).map_err(|e| IdentityError::Decode(e.to_string()))?;
        if identity.id.is_empty() {
            return Err(IdentityError::Rejected("empty user id".to_string()));
        }
        Ok(identity)
    }
}
