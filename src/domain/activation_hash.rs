use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Lifetime of an activation link
pub const ACTIVATION_HASH_TTL_HOURS: i64 = 24;

/// Single-use activation link for an account.
#[derive(Clone, Debug)]
pub struct ActivationHash {
    id: Uuid,
    hash: String,
    expiration_date: DateTime<Utc>,
    owner_user_id: Uuid,
}

impl ActivationHash {
    pub fn new(owner_user_id: Uuid, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            hash: generate_activation_hash(),
            expiration_date: Utc::now() + ttl,
            owner_user_id,
        }
    }

    /// Rebuild from stored columns.
    pub fn from_parts(
        id: Uuid,
        hash: String,
        expiration_date: DateTime<Utc>,
        owner_user_id: Uuid,
    ) -> Self {
        Self {
            id,
            hash,
            expiration_date,
            owner_user_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    pub fn owner_user_id(&self) -> Uuid {
        self.owner_user_id
    }

    pub fn is_expired(&self) -> bool {
        self.expiration_date < Utc::now()
    }

    /// New hash and expiry, same row.
    pub fn regenerate(&mut self, ttl: Duration) {
        self.hash = generate_activation_hash();
        self.expiration_date = Utc::now() + ttl;
    }
}

/// Hex SHA-256 digest of 64 random alphanumeric characters.
pub fn generate_activation_hash() -> String {
    let seed: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    format!("{:x}", hasher.finalize())
}
