/// Credential Codec
///
/// Signs and validates access and refresh tokens (HS256). Decoding failures
/// leave this module only as `AuthError::TokenExpired` or
/// `AuthError::TokenInvalid`.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::domain::{authorities, User};
use crate::error::{AppError, AuthError};

#[derive(Clone)]
pub struct CredentialCodec {
    config: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl CredentialCodec {
    pub fn new(config: JwtSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign an access token for a user
    ///
    /// # Returns
    /// The token and the instant it stops being accepted
    ///
    /// # Errors
    /// Returns error if signing fails
    pub fn issue_access_token(&self, user: &User) -> Result<(String, DateTime<Utc>), AppError> {
        let claims = Claims::access(
            user.email.clone(),
            authorities(&user.roles),
            self.config.access_token_expiry,
            self.config.issuer.clone(),
        );
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok((self.sign(&claims)?, expires_at))
    }

    /// Sign a refresh token for a user. Carries the identity claim only.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        let claims = Claims::refresh(
            user.email.clone(),
            self.config.refresh_token_expiry,
            self.config.issuer.clone(),
        );
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify signature, issuer and expiry and return the claims
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!("JWT validation error: {}", e);
                    AuthError::TokenInvalid
                }
            })
    }

    /// Identity claim of a valid token
    pub fn extract_identity(&self, token: &str) -> Result<String, AuthError> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// True when the token is unexpired and was issued to `identity`
    pub fn is_valid(&self, token: &str, identity: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == identity && !claims.is_expired(),
            Err(_) => false,
        }
    }
}
