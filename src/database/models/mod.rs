pub mod bought_item;
pub mod challenge;
pub mod challenge_request;
pub mod level;
pub mod one_signal;
pub mod post;
pub mod reaction;
pub mod score;
pub mod user;
pub mod vanity_item;

pub use bought_item::{BoughtItem, Currency};
pub use challenge::{Challenge, ChallengeStatus, ChallengeSummary};
pub use challenge_request::{ChallengeRequest, RequestStatus};
pub use level::Level;
pub use one_signal::OneSignal;
pub use post::Post;
pub use reaction::{Reaction, ReactionKind};
pub use score::{Score, ScoreCounter};
pub use user::{User, UserSummary};
pub use vanity_item::VanityItem;
