/// Authentication Orchestrator
///
/// Composes the codec, the ledger, the activation manager and the reset
/// cache into the account flows. Every public flow logs its failure through
/// an `ErrorContext` before returning it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::activation::ActivationHashManager;
use crate::auth::jwt::CredentialCodec;
use crate::auth::ledger::TokenLedger;
use crate::auth::password::{validate_password_strength, PasswordEncoder};
use crate::auth::reset::ResetTokenCache;
use crate::domain::{NewUser, Role, User, UserDto, UserStatus};
use crate::email_client::EmailSender;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, KnownError, ValidationError};
use crate::store::UserStore;
use crate::validators::{aggregate, is_valid_email, is_valid_name, is_valid_phone};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
    pub token_expired_at: DateTime<Utc>,
}

/// Reset token handed back by `generate_reset_password_link`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheToken {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseMessage {
    pub code: String,
    pub message: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    ledger: TokenLedger,
    codec: CredentialCodec,
    activation: ActivationHashManager,
    reset: ResetTokenCache,
    encoder: Arc<dyn PasswordEncoder>,
    email: Arc<dyn EmailSender>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: TokenLedger,
        codec: CredentialCodec,
        activation: ActivationHashManager,
        reset: ResetTokenCache,
        encoder: Arc<dyn PasswordEncoder>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            users,
            ledger,
            codec,
            activation,
            reset,
            encoder,
            email,
        }
    }

    /// Create an active user with the requested roles and sign them in
    ///
    /// # Errors
    /// - Validation errors for malformed fields
    /// - `EmailAlreadyUsed` if the email is taken
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthenticationResponse, AppError> {
        let ctx = ErrorContext::new("register");
        ctx.trace(self.register_inner(request).await)
    }

    async fn register_inner(&self, request: RegisterRequest) -> Result<AuthenticationResponse, AppError> {
        let roles = request.roles.clone();
        let user = self
            .create_user(request, UserStatus::Activated, roles)
            .await?;

        let response = self.issue_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(response)
    }

    /// Create a deactivated user and send them an activation link.
    /// No tokens are issued.
    pub async fn create_account(&self, request: RegisterRequest) -> Result<UserDto, AppError> {
        let ctx = ErrorContext::new("create_account");
        ctx.trace(self.create_account_inner(request).await)
    }

    async fn create_account_inner(&self, request: RegisterRequest) -> Result<UserDto, AppError> {
        let user = self
            .create_user(request, UserStatus::Deactivated, vec![Role::User])
            .await?;

        let activation = self.activation.create(user.id).await?;
        self.email
            .send_activation_email(&user, activation.hash())
            .await?;

        tracing::info!(user_id = %user.id, "Account created, awaiting activation");
        Ok(UserDto::from(&user))
    }

    async fn create_user(
        &self,
        request: RegisterRequest,
        status: UserStatus,
        roles: Vec<Role>,
    ) -> Result<User, AppError> {
        let new_user = self.validate_new_user(request, status, roles)?;

        if self.users.exists_by_email(&new_user.email).await? {
            return Err(KnownError::EmailAlreadyUsed.into());
        }

        // A concurrent registration can still win the insert.
        match self.users.create(new_user.into_user()).await {
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(detail))) => {
                tracing::warn!(detail = %detail, "Email taken by a concurrent registration");
                Err(KnownError::EmailAlreadyUsed.into())
            }
            result => result,
        }
    }

    fn validate_new_user(
        &self,
        request: RegisterRequest,
        status: UserStatus,
        roles: Vec<Role>,
    ) -> Result<NewUser, AppError> {
        let first_name = is_valid_name("first_name", &request.first_name);
        let last_name = is_valid_name("last_name", &request.last_name);
        let email = is_valid_email(&request.email);
        let phone = is_valid_phone(&request.phone);
        let password = validate_password_strength(&request.password);

        let errors: Vec<ValidationError> = [
            first_name.as_ref().err(),
            last_name.as_ref().err(),
            email.as_ref().err(),
            phone.as_ref().err(),
            password.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        aggregate(errors)?;

        Ok(NewUser {
            first_name: first_name?,
            last_name: last_name?,
            email: email?,
            phone: phone?,
            password_hash: self.encoder.encode(&request.password)?,
            status,
            roles,
        })
    }

    /// Check credentials, revoke every outstanding session of the user and
    /// open a new one
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` for an unknown email or a wrong
    ///   password
    /// - `UserAlreadyDeleted` / `UserAccountAlreadyLocked` for accounts in
    ///   those states; no token is minted
    pub async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<AuthenticationResponse, AppError> {
        let ctx = ErrorContext::new("authenticate");
        ctx.trace(self.authenticate_inner(request).await)
    }

    async fn authenticate_inner(
        &self,
        request: AuthenticationRequest,
    ) -> Result<AuthenticationResponse, AppError> {
        let user = self
            .users
            .find_by_email(request.email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.encoder.matches(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        // Deactivated accounts are let through.
        match user.status {
            UserStatus::Deleted => return Err(KnownError::UserAlreadyDeleted.into()),
            UserStatus::Locked => return Err(KnownError::UserAccountAlreadyLocked.into()),
            UserStatus::Activated | UserStatus::Deactivated => {}
        }

        self.ledger.revoke_all(user.id).await?;
        let (access_token, token_expired_at) = self.codec.issue_access_token(&user)?;
        let refresh_token = self.codec.issue_refresh_token(&user)?;
        self.ledger
            .record_issued_token(user.id, access_token.clone())
            .await?;

        tracing::info!(user_id = %user.id, "User authenticated");
        Ok(AuthenticationResponse {
            access_token,
            refresh_token,
            user: UserDto::from(&user),
            token_expired_at,
        })
    }

    /// Exchange a refresh token (as an `Authorization` header value) for a
    /// new access token
    ///
    /// # Returns
    /// `None` when the header is missing or malformed, the token does not
    /// verify, or its subject is unknown. The refresh token itself is
    /// returned unchanged.
    pub async fn refresh(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<AuthenticationResponse>, AppError> {
        let ctx = ErrorContext::new("refresh");
        ctx.trace(self.refresh_inner(authorization).await)
    }

    async fn refresh_inner(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<AuthenticationResponse>, AppError> {
        let refresh_token = match authorization.and_then(|h| h.strip_prefix(BEARER_PREFIX)) {
            Some(token) => token,
            None => return Ok(None),
        };

        let email = match self.codec.extract_identity(refresh_token) {
            Ok(email) => email,
            Err(e) => {
                tracing::debug!("Refresh token rejected: {}", e);
                return Ok(None);
            }
        };

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        if !self.codec.is_valid(refresh_token, &user.email) {
            return Ok(None);
        }

        self.ledger.revoke_all(user.id).await?;
        let (access_token, token_expired_at) = self.codec.issue_access_token(&user)?;
        self.ledger
            .record_issued_token(user.id, access_token.clone())
            .await?;

        tracing::info!(user_id = %user.id, "Access token refreshed");
        Ok(Some(AuthenticationResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            user: UserDto::from(&user),
            token_expired_at,
        }))
    }

    /// Consume an activation hash and sign the activated user in
    pub async fn activate_account(&self, hash: &str) -> Result<AuthenticationResponse, AppError> {
        let ctx = ErrorContext::new("activate_account");
        ctx.trace(self.activate_account_inner(hash).await)
    }

    async fn activate_account_inner(&self, hash: &str) -> Result<AuthenticationResponse, AppError> {
        let user = self.activation.activate(hash).await?;
        self.issue_tokens(&user).await
    }

    /// Replace an activation link (expired or not) and email the new one
    pub async fn generate_new_activation_hash(&self, old_hash: &str) -> Result<ResponseMessage, AppError> {
        let ctx = ErrorContext::new("generate_new_activation_hash");
        let result = self.activation.regenerate(old_hash).await.map(|_| ResponseMessage {
            code: "200".to_string(),
            message: "New activation link generated successfully".to_string(),
        });
        ctx.trace(result)
    }

    /// Issue a password reset token for an active account and email it
    ///
    /// # Errors
    /// - `InvalidUserEmail` if no user has this email
    /// - `UserAccountAlreadyLocked`, `UserAlreadyDeactivated` or
    ///   `UserAlreadyDeleted` for accounts in those states
    pub async fn generate_reset_password_link(&self, email: &str) -> Result<CacheToken, AppError> {
        let ctx = ErrorContext::new("generate_reset_password_link");
        ctx.trace(self.generate_reset_password_link_inner(email).await)
    }

    async fn generate_reset_password_link_inner(&self, email: &str) -> Result<CacheToken, AppError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(KnownError::InvalidUserEmail)?;

        match user.status {
            UserStatus::Locked => Err(KnownError::UserAccountAlreadyLocked.into()),
            UserStatus::Deactivated => Err(KnownError::UserAlreadyDeactivated.into()),
            UserStatus::Deleted => Err(KnownError::UserAlreadyDeleted.into()),
            UserStatus::Activated => {
                let token = self.reset.issue(&user).await?;
                Ok(CacheToken { token })
            }
        }
    }

    /// Set a new password using a reset token
    pub async fn confirm_reset_password(
        &self,
        request: ConfirmResetPasswordRequest,
    ) -> Result<UserDto, AppError> {
        let ctx = ErrorContext::new("confirm_reset_password");
        ctx.trace(self.confirm_reset_password_inner(request).await)
    }

    async fn confirm_reset_password_inner(
        &self,
        request: ConfirmResetPasswordRequest,
    ) -> Result<UserDto, AppError> {
        validate_password_strength(&request.new_password)?;
        let password_hash = self.encoder.encode(&request.new_password)?;

        let user = self.reset.confirm(&request.token, password_hash).await?;
        Ok(UserDto::from(&user))
    }

    async fn issue_tokens(&self, user: &User) -> Result<AuthenticationResponse, AppError> {
        let (access_token, token_expired_at) = self.codec.issue_access_token(user)?;
        let refresh_token = self.codec.issue_refresh_token(user)?;
        self.ledger
            .record_issued_token(user.id, access_token.clone())
            .await?;

        Ok(AuthenticationResponse {
            access_token,
            refresh_token,
            user: UserDto::from(user),
            token_expired_at,
        })
    }
}
