/// JWT Claims structure
///
/// Payload of access and refresh tokens. The identity claim is the user's
/// email; only access tokens carry roles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Granted authorities, access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token id, unique per issued token
    pub jti: String,
}

impl Claims {
    /// Claims for an access token
    pub fn access(subject: String, roles: Vec<String>, expiry_seconds: i64, issuer: String) -> Self {
        Self::build(subject, Some(roles), expiry_seconds, issuer)
    }

    /// Claims for a refresh token: identity only
    pub fn refresh(subject: String, expiry_seconds: i64, issuer: String) -> Self {
        Self::build(subject, None, expiry_seconds, issuer)
    }

    fn build(subject: String, roles: Option<Vec<String>>, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject,
            roles,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}
