// handlers/protected/user/mod.rs - Per-user resources under /user/:user_id

pub mod bought_item;
pub mod profile;
pub mod request;
pub mod score;

pub use bought_item::list as bought_item_list;
pub use bought_item::purchase as bought_item_purchase;

pub use profile::delete as user_delete;
pub use profile::set_level as user_set_level;
pub use profile::set_weight as user_set_weight;
pub use profile::update as user_update;

pub use request::create as request_create;
pub use request::list as request_list;
pub use request::respond as request_respond;
pub use request::withdraw as request_withdraw;

pub use score::get as score_get;
pub use score::add_coins as score_add_coins;
pub use score::add_exp as score_add_exp;
pub use score::add_likes as score_add_likes;
pub use score::spend_coins as score_spend_coins;
pub use score::use_likes as score_use_likes;
