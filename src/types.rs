/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a TEXT column holds a value outside its enumeration
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Account role carried in tokens and stored on users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

/// Authorization context for mutations on shared resources.
///
/// `Owner(id)` narrows every mutating statement with `user_id = id`;
/// `Admin` applies no ownership predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner(i64),
    Admin,
}

impl Actor {
    pub fn owner_id(&self) -> Option<i64> {
        match self {
            Actor::Owner(id) => Some(*id),
            Actor::Admin => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }
}

/// Longitude/latitude pair as sent by clients (`geo_coords`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoCoords {
    pub long: f64,
    pub lat: f64,
}

impl GeoCoords {
    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.long) && (-90.0..=90.0).contains(&self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(Role::try_from("admin".to_string()).unwrap(), Role::Admin);
        assert_eq!(Role::try_from(Role::User.as_str().to_string()).unwrap(), Role::User);
        assert!(Role::try_from("root".to_string()).is_err());
    }

    #[test]
    fn geo_coords_bounds() {
        assert!(GeoCoords { long: 180.0, lat: -90.0 }.is_valid());
        assert!(!GeoCoords { long: 181.0, lat: 0.0 }.is_valid());
        assert!(!GeoCoords { long: 0.0, lat: 90.5 }.is_valid());
    }
}
