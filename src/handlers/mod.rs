// handlers/mod.rs - Two handler tiers
//
// public: no token required
// protected: routed behind jwt_auth_middleware, every handler receives an AuthUser

pub mod protected;
pub mod public;
