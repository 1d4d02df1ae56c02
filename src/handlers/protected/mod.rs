// handlers/protected/mod.rs - Handlers behind jwt_auth_middleware
//
// Every handler here takes Extension<AuthUser>. Mutations on shared rows go
// through AuthUser::authorize (owner or admin) before touching the database.

pub mod challenge;
pub mod session;
pub mod user;
