use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Bearer,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Bearer => "BEARER",
        }
    }
}

/// An access token the ledger has recorded. Rows are never deleted; the
/// owner is referenced by id only.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: Uuid,
    pub raw_value: String,
    pub token_type: TokenType,
    pub expired: bool,
    pub revoked: bool,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn new(owner_user_id: Uuid, raw_value: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_value,
            token_type: TokenType::Bearer,
            expired: false,
            revoked: false,
            owner_user_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.expired && !self.revoked
    }

    /// Matches the ledger's "valid" query, which uses OR.
    pub fn matches_valid_query(&self) -> bool {
        !self.expired || !self.revoked
    }
}
