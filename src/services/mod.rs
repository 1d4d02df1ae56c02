pub mod bought_item_service;
pub mod catalog_service;
pub mod challenge_request_service;
pub mod challenge_service;
pub mod one_signal_service;
pub mod post_service;
pub mod score_service;
pub mod user_service;

pub use bought_item_service::{BoughtItemService, PurchaseTarget};
pub use catalog_service::CatalogService;
pub use challenge_request_service::{ChallengeRequestService, RequestDirection};
pub use challenge_service::{ChallengeListing, ChallengeService, NewChallenge};
pub use one_signal_service::OneSignalService;
pub use post_service::{NewPost, PostService};
pub use score_service::ScoreService;
pub use user_service::{RankingArea, UserService};
