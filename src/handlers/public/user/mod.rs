// handlers/public/user/mod.rs - User lookup and ranking

pub mod lookup;

pub use lookup::list as user_list;
