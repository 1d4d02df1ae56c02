// handlers/public/mod.rs - Public handlers (no authentication required)

pub mod auth;
pub mod catalog;
pub mod challenge;
pub mod health;
pub mod user;
