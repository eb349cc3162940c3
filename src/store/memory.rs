/// In-process store implementations
///
/// Each store guards its collection with a `tokio::sync::RwLock`; every
/// trait method takes the lock once, so single-row operations and the bulk
/// revoke are atomic with respect to each other.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ActivationHash, IssuedToken, User, UserStatus};
use crate::error::{AppError, DatabaseError};
use crate::store::{ActivationHashStore, CacheError, TokenStore, TtlCache, UserStore};

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "users.email {}",
                user.email
            ))
            .into());
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<bool, AppError> {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<Vec<IssuedToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row for `owner`, valid or not.
    pub async fn all_for_user(&self, owner: Uuid) -> Vec<IssuedToken> {
        self.tokens
            .read()
            .await
            .iter()
            .filter(|t| t.owner_user_id == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: IssuedToken) -> Result<IssuedToken, AppError> {
        self.tokens.write().await.push(token.clone());
        Ok(token)
    }

    async fn find_valid_by_user(&self, owner: Uuid) -> Result<Vec<IssuedToken>, AppError> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .filter(|t| t.owner_user_id == owner && t.matches_valid_query())
            .cloned()
            .collect())
    }

    async fn revoke_all_valid_by_user(&self, owner: Uuid) -> Result<u64, AppError> {
        let mut tokens = self.tokens.write().await;
        let mut touched = 0;
        for token in tokens
            .iter_mut()
            .filter(|t| t.owner_user_id == owner && t.matches_valid_query())
        {
            token.expired = true;
            token.revoked = true;
            touched += 1;
        }
        Ok(touched)
    }

    async fn find_by_raw_value(&self, raw_value: &str) -> Result<Option<IssuedToken>, AppError> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .find(|t| t.raw_value == raw_value)
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActivationHashStore {
    hashes: Arc<RwLock<HashMap<Uuid, ActivationHash>>>,
}

impl InMemoryActivationHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivationHashStore for InMemoryActivationHashStore {
    async fn insert(&self, hash: ActivationHash) -> Result<ActivationHash, AppError> {
        let mut hashes = self.hashes.write().await;
        if hashes.values().any(|h| h.hash() == hash.hash()) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "activation_hashes.hash".to_string(),
            )
            .into());
        }
        hashes.insert(hash.id(), hash.clone());
        Ok(hash)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<ActivationHash>, AppError> {
        Ok(self
            .hashes
            .read()
            .await
            .values()
            .find(|h| h.hash() == hash)
            .cloned())
    }

    async fn save(&self, hash: &ActivationHash) -> Result<bool, AppError> {
        match self.hashes.write().await.get_mut(&hash.id()) {
            Some(stored) => {
                *stored = hash.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.hashes.write().await.remove(&id).is_some())
    }
}

struct CacheEntry {
    user_id: Uuid,
    inserted_at: Instant,
}

struct CacheMap {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl CacheMap {
    fn live(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() < self.ttl
    }
}

/// Single-process TTL cache with named maps, used by tests. Only maps
/// declared in `new` exist; any other name is reported as unavailable.
#[derive(Clone, Default)]
pub struct InMemoryTtlCache {
    maps: Arc<RwLock<HashMap<String, CacheMap>>>,
}

impl InMemoryTtlCache {
    /// A cache holding exactly the given `(name, ttl)` maps.
    pub fn new(maps: &[(&str, Duration)]) -> Self {
        let maps = maps
            .iter()
            .map(|(name, ttl)| {
                (
                    name.to_string(),
                    CacheMap {
                        ttl: *ttl,
                        entries: HashMap::new(),
                    },
                )
            })
            .collect();
        Self {
            maps: Arc::new(RwLock::new(maps)),
        }
    }
}

#[async_trait]
impl TtlCache for InMemoryTtlCache {
    async fn put(&self, map: &str, key: &str, user_id: Uuid) -> Result<(), CacheError> {
        let mut maps = self.maps.write().await;
        let cache_map = maps
            .get_mut(map)
            .ok_or_else(|| CacheError::Unavailable(map.to_string()))?;
        let ttl = cache_map.ttl;
        cache_map.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        cache_map.entries.insert(
            key.to_string(),
            CacheEntry {
                user_id,
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError> {
        let maps = self.maps.read().await;
        let cache_map = maps
            .get(map)
            .ok_or_else(|| CacheError::Unavailable(map.to_string()))?;
        Ok(cache_map
            .entries
            .get(key)
            .filter(|e| cache_map.live(e))
            .map(|e| e.user_id))
    }

    async fn remove(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError> {
        let mut maps = self.maps.write().await;
        let cache_map = maps
            .get_mut(map)
            .ok_or_else(|| CacheError::Unavailable(map.to_string()))?;
        let ttl = cache_map.ttl;
        Ok(cache_map
            .entries
            .remove(key)
            .filter(|e| e.inserted_at.elapsed() < ttl)
            .map(|e| e.user_id))
    }
}
