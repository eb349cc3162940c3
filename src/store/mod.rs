/// Storage collaborators
///
/// The account core only talks to these traits. `memory` holds in-process
/// implementations, `postgres` the sqlx-backed ones and `redis_cache` the
/// shared TTL cache.

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::domain::{ActivationHash, IssuedToken, User, UserStatus};
use crate::error::AppError;

pub mod memory;
pub mod postgres;
pub mod redis_cache;

pub use memory::{InMemoryActivationHashStore, InMemoryTokenStore, InMemoryTtlCache, InMemoryUserStore};
pub use postgres::{PgActivationHashStore, PgTokenStore, PgUserStore};
pub use redis_cache::RedisTtlCache;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError>;
    /// Returns false when no user has this id.
    async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<bool, AppError>;
    async fn save(&self, user: &User) -> Result<(), AppError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: IssuedToken) -> Result<IssuedToken, AppError>;
    /// Rows of `owner` with `expired = false OR revoked = false`.
    async fn find_valid_by_user(&self, owner: Uuid) -> Result<Vec<IssuedToken>, AppError>;
    /// Sets both flags on every row `find_valid_by_user` returns, in one
    /// mutation. Returns the number of rows touched.
    async fn revoke_all_valid_by_user(&self, owner: Uuid) -> Result<u64, AppError>;
    async fn find_by_raw_value(&self, raw_value: &str) -> Result<Option<IssuedToken>, AppError>;
}

#[async_trait]
pub trait ActivationHashStore: Send + Sync {
    async fn insert(&self, hash: ActivationHash) -> Result<ActivationHash, AppError>;
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ActivationHash>, AppError>;
    /// Overwrites hash and expiry of an existing row. Returns false when the
    /// row is gone; nothing is written then.
    async fn save(&self, hash: &ActivationHash) -> Result<bool, AppError>;
    /// Returns true only for the caller that actually removed the row.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Cache failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The named map does not exist or the backend is down. Carries the
    /// map name, plus the backend reason when there is one.
    Unavailable(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Unavailable(map) => write!(f, "Cache map unavailable: {}", map),
        }
    }
}

impl std::error::Error for CacheError {}

/// Key-value cache whose maps expire entries on their own.
///
/// Expired entries must be invisible to `get`; callers never poll for
/// expiry.
#[async_trait]
pub trait TtlCache: Send + Sync {
    async fn put(&self, map: &str, key: &str, user_id: Uuid) -> Result<(), CacheError>;
    async fn get(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError>;
    async fn remove(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError>;
}
