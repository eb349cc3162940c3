/// Account Service
///
/// Administrative and self-service operations on existing accounts. The
/// acting user is always passed in explicitly as an `AuthenticatedUser`.

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::CredentialCodec;
use crate::auth::ledger::TokenLedger;
use crate::auth::password::{validate_password_strength, PasswordEncoder};
use crate::domain::{Role, User, UserDto, UserStatus};
use crate::email_client::EmailSender;
use crate::error::{AppError, AuthError, ErrorContext, KnownError};
use crate::store::UserStore;

const BEARER_PREFIX: &str = "Bearer ";

/// Caller resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAccountRequest {
    pub user_id: Uuid,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPasswordRequest {
    pub user_id: Uuid,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    ledger: TokenLedger,
    codec: CredentialCodec,
    encoder: Arc<dyn PasswordEncoder>,
    email: Arc<dyn EmailSender>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: TokenLedger,
        codec: CredentialCodec,
        encoder: Arc<dyn PasswordEncoder>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            users,
            ledger,
            codec,
            encoder,
            email,
        }
    }

    /// Resolve the caller of a request from its `Authorization` header
    ///
    /// The access token must verify and still be valid in the ledger.
    pub async fn resolve_caller(&self, authorization: Option<&str>) -> Result<AuthenticatedUser, AppError> {
        let token = authorization
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::MissingToken)?;

        let email = self.codec.extract_identity(token)?;

        let recorded = self
            .ledger
            .find_by_raw_value(token)
            .await?
            .filter(|t| t.is_valid())
            .ok_or(AuthError::TokenInvalid)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(KnownError::UserNotFound)?;

        if recorded.owner_user_id != user.id {
            return Err(AuthError::TokenInvalid.into());
        }

        Ok(AuthenticatedUser::from(&user))
    }

    /// Lock an account and notify its owner. Admins only.
    ///
    /// # Errors
    /// - `UserNotAuthorized` if the caller is not an admin
    /// - `UserNotFound` if the target does not exist
    /// - `UserAccountAlreadyLocked` if it is locked already
    pub async fn lock_user_account(
        &self,
        caller: &AuthenticatedUser,
        request: LockAccountRequest,
    ) -> Result<UserDto, AppError> {
        let ctx = ErrorContext::new("lock_user_account").with_user_id(caller.user_id.to_string());
        ctx.trace(self.lock_user_account_inner(caller, request).await)
    }

    async fn lock_user_account_inner(
        &self,
        caller: &AuthenticatedUser,
        request: LockAccountRequest,
    ) -> Result<UserDto, AppError> {
        if !caller.has_role(Role::Admin) {
            return Err(KnownError::UserNotAuthorized.into());
        }

        let mut user = self.find(request.user_id).await?;
        if user.status == UserStatus::Locked {
            return Err(KnownError::UserAccountAlreadyLocked.into());
        }

        user.status = UserStatus::Locked;
        user.touch();
        self.users.save(&user).await?;
        self.email.send_locked_email(&user, &request.comment).await?;

        tracing::info!(user_id = %user.id, admin_id = %caller.user_id, "User account locked");
        Ok(UserDto::from(&user))
    }

    /// Change a password after checking the old one. A locked account is
    /// returned unchanged.
    pub async fn update_user_password(&self, request: UpdateUserPasswordRequest) -> Result<UserDto, AppError> {
        let ctx = ErrorContext::new("update_user_password").with_user_id(request.user_id.to_string());
        ctx.trace(self.update_user_password_inner(request).await)
    }

    async fn update_user_password_inner(&self, request: UpdateUserPasswordRequest) -> Result<UserDto, AppError> {
        let mut user = self.find(request.user_id).await?;

        match user.status {
            UserStatus::Deleted => return Err(KnownError::UserAlreadyDeleted.into()),
            UserStatus::Deactivated => return Err(KnownError::UserAlreadyDeactivated.into()),
            UserStatus::Locked => return Ok(UserDto::from(&user)),
            UserStatus::Activated => {}
        }

        if !self.encoder.matches(&request.old_password, &user.password_hash)? {
            return Err(KnownError::OldPasswordNotMatch.into());
        }
        validate_password_strength(&request.new_password)?;

        user.password_hash = self.encoder.encode(&request.new_password)?;
        user.touch();
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "Password updated");
        Ok(UserDto::from(&user))
    }

    /// Mark an account deleted. A locked account is returned unchanged.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<UserDto, AppError> {
        let ctx = ErrorContext::new("delete_user").with_user_id(user_id.to_string());
        ctx.trace(self.delete_user_inner(user_id).await)
    }

    async fn delete_user_inner(&self, user_id: Uuid) -> Result<UserDto, AppError> {
        let mut user = self.find(user_id).await?;

        match user.status {
            UserStatus::Deleted => return Err(KnownError::UserAlreadyDeleted.into()),
            UserStatus::Locked => return Ok(UserDto::from(&user)),
            UserStatus::Activated | UserStatus::Deactivated => {}
        }

        user.status = UserStatus::Deleted;
        user.touch();
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "User deleted");
        Ok(UserDto::from(&user))
    }

    pub async fn update_user_status(&self, user_id: Uuid, status: UserStatus) -> Result<bool, AppError> {
        let ctx = ErrorContext::new("update_user_status").with_user_id(user_id.to_string());
        let result = match self.users.update_status(user_id, status).await {
            Ok(true) => Ok(true),
            Ok(false) => Err(KnownError::UserNotFound.into()),
            Err(e) => Err(e),
        };
        ctx.trace(result)
    }

    /// Role names of a user
    pub async fn user_roles(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let user = self.find(user_id).await?;
        Ok(user.roles.iter().map(|r| r.as_str().to_string()).collect())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserDto, AppError> {
        let user = self.find(user_id).await?;
        Ok(UserDto::from(&user))
    }

    async fn find(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| KnownError::UserNotFound.into())
    }
}
