use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::external::{FacebookIdentity, IdentityProvider, ObjectStore, S3Presigner};
use crate::services::{
    BoughtItemService, CatalogService, ChallengeRequestService, ChallengeService, OneSignalService, PostService,
    ScoreService, UserService,
};

/// Everything a handler needs, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub tokens: TokenIssuer,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseManager,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStore>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::new(&config.security)?;
        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            identity,
            storage,
        })
    }

    /// Production wiring: Facebook identity and S3 presigning from config
    pub fn with_default_collaborators(config: AppConfig, db: DatabaseManager) -> anyhow::Result<Self> {
        let identity = Arc::new(FacebookIdentity::new(&config.identity)?);
        let storage = Arc::new(S3Presigner::new(&config.storage));
        Self::new(config, db, identity, storage)
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.pool().clone())
    }

    pub fn scores(&self) -> ScoreService {
        ScoreService::new(self.db.pool().clone())
    }

    pub fn challenges(&self) -> ChallengeService {
        ChallengeService::new(self.db.pool().clone())
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.db.pool().clone())
    }

    pub fn requests(&self) -> ChallengeRequestService {
        ChallengeRequestService::new(self.db.pool().clone())
    }

    pub fn bought_items(&self) -> BoughtItemService {
        BoughtItemService::new(self.db.pool().clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.pool().clone())
    }

    pub fn one_signals(&self) -> OneSignalService {
        OneSignalService::new(self.db.pool().clone())
    }
}
