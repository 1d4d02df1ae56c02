// handlers/protected/challenge/mod.rs - Challenge and post mutations

pub mod manage;
pub mod post;

pub use manage::activate as challenge_activate;
pub use manage::create as challenge_create;
pub use manage::deactivate as challenge_deactivate;
pub use manage::delete as challenge_delete;
pub use manage::update as challenge_update;

pub use post::create as post_create;
pub use post::delete as post_delete;
pub use post::flag as post_flag;
pub use post::like as post_like;
pub use post::unflag as post_unflag;
pub use post::unlike as post_unlike;
