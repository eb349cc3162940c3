/// Reset Token Cache
///
/// Short-lived password reset tokens kept in the `resetPasswordToken` TTL
/// map. Expiry is the cache's job; an expired token reads as absent.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::RESET_PASSWORD_MAP;
use crate::domain::User;
use crate::email_client::EmailSender;
use crate::error::{AppError, KnownError};
use crate::store::{CacheError, TtlCache, UserStore};

#[derive(Clone)]
pub struct ResetTokenCache {
    cache: Arc<dyn TtlCache>,
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailSender>,
}

impl ResetTokenCache {
    pub fn new(
        cache: Arc<dyn TtlCache>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self { cache, users, email }
    }

    /// Store a new reset token for `user` and email it
    ///
    /// # Returns
    /// The token (UUID v4 string)
    pub async fn issue(&self, user: &User) -> Result<String, AppError> {
        let token = Uuid::new_v4().to_string();
        self.cache
            .put(RESET_PASSWORD_MAP, &token, user.id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        self.email.send_reset_password_email(user, &token).await?;

        tracing::info!(user_id = %user.id, "Reset password token issued");
        Ok(token)
    }

    /// Consume the token and apply `new_password_hash` to its owner
    ///
    /// The token is spent even when the owner turns out to be missing.
    ///
    /// # Errors
    /// - `EmptyCache` if the reset map is unavailable
    /// - `ResetTokenExpired` if the token is unknown or expired
    /// - `UserNotFound` if the owner no longer exists
    pub async fn confirm(&self, token: &str, new_password_hash: String) -> Result<User, AppError> {
        // Removing the entry claims it; concurrent confirms see it absent.
        let user_id = self
            .cache
            .remove(RESET_PASSWORD_MAP, token)
            .await
            .map_err(empty_cache)?
            .ok_or(KnownError::ResetTokenExpired)?;

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(KnownError::UserNotFound)?;

        user.password_hash = new_password_hash;
        user.touch();
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset confirmed");
        Ok(user)
    }
}

fn empty_cache(err: CacheError) -> AppError {
    tracing::error!("Reset token cache unavailable: {}", err);
    KnownError::EmptyCache.into()
}
