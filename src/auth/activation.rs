/// Activation Hash Manager
///
/// Lifecycle of single-use account activation links.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{ActivationHash, User, UserStatus};
use crate::email_client::EmailSender;
use crate::error::{AppError, KnownError};
use crate::store::{ActivationHashStore, UserStore};

#[derive(Clone)]
pub struct ActivationHashManager {
    hashes: Arc<dyn ActivationHashStore>,
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailSender>,
    ttl: Duration,
}

impl ActivationHashManager {
    pub fn new(
        hashes: Arc<dyn ActivationHashStore>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailSender>,
        ttl: Duration,
    ) -> Self {
        Self {
            hashes,
            users,
            email,
            ttl,
        }
    }

    /// Persist a fresh activation hash for `owner`
    pub async fn create(&self, owner: Uuid) -> Result<ActivationHash, AppError> {
        let hash = self.hashes.insert(ActivationHash::new(owner, self.ttl)).await?;
        tracing::info!(user_id = %owner, "Activation hash created");
        Ok(hash)
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<ActivationHash>, AppError> {
        self.hashes.find_by_hash(hash).await
    }

    /// Consume an activation hash and activate its owner
    ///
    /// # Errors
    /// - `ActivationLinkNotFound` if the hash does not exist or another
    ///   caller consumed it first
    /// - `ActivationLinkExpired` if it is past its expiry; the row and the
    ///   user are left untouched
    /// - `UserNotFound` if the owner no longer exists
    pub async fn activate(&self, hash: &str) -> Result<User, AppError> {
        let activation = self
            .hashes
            .find_by_hash(hash)
            .await?
            .ok_or(KnownError::ActivationLinkNotFound)?;

        if activation.is_expired() {
            tracing::warn!(user_id = %activation.owner_user_id(), "Activation link expired");
            return Err(KnownError::ActivationLinkExpired.into());
        }

        // Only the caller whose delete removed the row may activate.
        if !self.hashes.delete(activation.id()).await? {
            return Err(KnownError::ActivationLinkNotFound.into());
        }

        let mut user = self
            .users
            .find_by_id(activation.owner_user_id())
            .await?
            .ok_or(KnownError::UserNotFound)?;
        user.status = UserStatus::Activated;
        user.touch();
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "Account activated");
        Ok(user)
    }

    /// Replace the hash and expiry of an existing link and email it again.
    /// Works on expired links. No email goes out for a link consumed
    /// concurrently; that case reports `ActivationLinkNotFound`.
    pub async fn regenerate(&self, old_hash: &str) -> Result<ActivationHash, AppError> {
        let mut activation = self
            .hashes
            .find_by_hash(old_hash)
            .await?
            .ok_or(KnownError::ActivationLinkNotFound)?;

        let user = self
            .users
            .find_by_id(activation.owner_user_id())
            .await?
            .ok_or(KnownError::UserNotFound)?;

        activation.regenerate(self.ttl);
        // The link may have been consumed since the lookup.
        if !self.hashes.save(&activation).await? {
            return Err(KnownError::ActivationLinkNotFound.into());
        }
        self.email
            .send_activation_email(&user, activation.hash())
            .await?;

        tracing::info!(user_id = %user.id, "Activation hash regenerated");
        Ok(activation)
    }
}
