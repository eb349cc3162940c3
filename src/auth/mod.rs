/// Authentication module
///
/// Token signing, the server-side token ledger, activation links, password
/// reset tokens and the flows built on them.

pub mod accounts;
pub mod activation;
mod claims;
pub mod jwt;
pub mod ledger;
pub mod password;
pub mod reset;
pub mod service;

/// TTL map holding password reset tokens
pub const RESET_PASSWORD_MAP: &str = "resetPasswordToken";
/// Default lifetime of a reset token
pub const RESET_TOKEN_TTL_SECONDS: u64 = 300;

pub use accounts::{AccountService, AuthenticatedUser, LockAccountRequest, UpdateUserPasswordRequest};
pub use activation::ActivationHashManager;
pub use claims::Claims;
pub use jwt::CredentialCodec;
pub use ledger::TokenLedger;
pub use password::{validate_password_strength, BcryptPasswordEncoder, PasswordEncoder};
pub use reset::ResetTokenCache;
pub use service::{
    AuthService, AuthenticationRequest, AuthenticationResponse, CacheToken,
    ConfirmResetPasswordRequest, RegisterRequest, ResponseMessage,
};
