use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A like or a flag; both tables share this shape
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Flag,
}

impl ReactionKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReactionKind::Like => "likes",
            ReactionKind::Flag => "flags",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReactionKind::Like => "Like",
            ReactionKind::Flag => "Flag",
        }
    }
}
