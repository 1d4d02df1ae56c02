// handlers/public/challenge/mod.rs - Challenge and post browsing

pub mod browse;
pub mod post;

pub use browse::get as challenge_get;
pub use browse::list as challenge_list;
pub use post::get as post_get;
pub use post::list as post_list;
