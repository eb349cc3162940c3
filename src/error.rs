/// Error Handling Module
///
/// Every failure the account core can produce maps to one `AppError`:
/// 1. Known domain errors with a stable code (status conflicts, expiry, not-found)
/// 2. Validation errors reported per field
/// 3. Authentication errors (credentials and bearer tokens)
/// 4. Unknown errors (database, email, configuration, internal), logged in
///    full and reported generically
/// 5. HTTP status mapping and structured error logging with context

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. KNOWN DOMAIN ERRORS
/// ============================================================================

/// Domain-rule violations surfaced to callers with a stable code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownError {
    EmailAlreadyUsed,
    UserNotFound,
    UserAlreadyDeleted,
    UserAlreadyDeactivated,
    OldPasswordNotMatch,
    UserAccountAlreadyLocked,
    UserNotAuthorized,
    InvalidUserEmail,
    ResetTokenExpired,
    EmptyCache,
    ActivationLinkNotFound,
    ActivationLinkExpired,
}

impl KnownError {
    pub fn code(&self) -> &'static str {
        match self {
            KnownError::EmailAlreadyUsed => "600",
            KnownError::UserNotFound => "601",
            KnownError::UserAlreadyDeleted => "602",
            KnownError::UserAlreadyDeactivated => "603",
            KnownError::OldPasswordNotMatch => "604",
            KnownError::UserAccountAlreadyLocked => "605",
            KnownError::UserNotAuthorized => "606",
            KnownError::InvalidUserEmail => "607",
            KnownError::ResetTokenExpired => "608",
            KnownError::EmptyCache => "609",
            KnownError::ActivationLinkNotFound => "610",
            KnownError::ActivationLinkExpired => "636",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            KnownError::EmailAlreadyUsed => "Email already used",
            KnownError::UserNotFound => "User not found",
            KnownError::UserAlreadyDeleted => "User already deleted",
            KnownError::UserAlreadyDeactivated => "User already deactivated",
            KnownError::OldPasswordNotMatch => "Old password do not match",
            KnownError::UserAccountAlreadyLocked => "User Account already locked.",
            KnownError::UserNotAuthorized => "You are not authorize to perform this action.",
            KnownError::InvalidUserEmail => "No user is associated with this email address",
            KnownError::ResetTokenExpired => "The reset token has expired",
            KnownError::EmptyCache => "Cache is Empty",
            KnownError::ActivationLinkNotFound => {
                "The account activation link you provided does not exist."
            }
            KnownError::ActivationLinkExpired => {
                "Your account activation link has expired; please request a new one."
            }
        }
    }

    /// Status category a caller sees for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            KnownError::UserNotFound => StatusCode::NOT_FOUND,
            KnownError::EmailAlreadyUsed
            | KnownError::UserAlreadyDeleted
            | KnownError::UserAlreadyDeactivated
            | KnownError::UserAccountAlreadyLocked => StatusCode::CONFLICT,
            KnownError::UserNotAuthorized => StatusCode::FORBIDDEN,
            KnownError::OldPasswordNotMatch
            | KnownError::InvalidUserEmail
            | KnownError::ResetTokenExpired
            | KnownError::EmptyCache
            | KnownError::ActivationLinkNotFound
            | KnownError::ActivationLinkExpired => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for KnownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl StdError for KnownError {}

/// ============================================================================
/// 2. VALIDATION, DATABASE, EMAIL, CONFIG AND AUTH ERRORS
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    /// Several fields failed at once; reported together.
    Fields(Vec<ValidationError>),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::Fields(errors) => {
                let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "Validation errors: {}", joined.join("; "))
            }
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Email service errors
#[derive(Debug, Clone)]
pub enum EmailError {
    SendFailed(String),
    ServiceUnavailable(String),
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::SendFailed(msg) => write!(f, "Failed to send email: {}", msg),
            EmailError::ServiceUnavailable(msg) => {
                write!(f, "Email service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for EmailError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication errors: credentials and bearer tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MissingToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 3. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type returned by every flow
#[derive(Debug)]
pub enum AppError {
    Known(KnownError),
    Validation(ValidationError),
    Auth(AuthError),
    Database(DatabaseError),
    Email(EmailError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    /// True for errors whose details must stay server-side.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Email(_) | AppError::Config(_) | AppError::Internal(_)
        )
    }

    /// The known domain error, if this is one.
    pub fn known(&self) -> Option<KnownError> {
        match self {
            AppError::Known(k) => Some(*k),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Known(e) => write!(f, "{}", e),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<KnownError> for AppError {
    fn from(err: KnownError) -> Self {
        AppError::Known(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Email(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(error_msg))
        } else if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else if matches!(err, sqlx::Error::Database(_)) {
            AppError::Database(DatabaseError::QueryExecution(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(ConfigError::ParseError(err.to_string()))
    }
}

// ============================================================================
// 4. RESPONSE MAPPING
// ============================================================================

/// Error body returned to callers
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Request id the server-side log line carries
    pub error_id: String,
    pub code: String,
    pub message: String,
    pub status: u16,
    pub timestamp: String,
    /// Diagnostic detail, only present when detail exposure is switched on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            code,
            message,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Converts errors to caller-facing responses and server-side log lines
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str, expose_details: bool) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str, expose_details: bool) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Known(e) => (e.status_code(), e.code().to_string(), e.message().to_string()),

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS".to_string(),
                    "Invalid credentials".to_string(),
                ),
                AuthError::TokenExpired | AuthError::TokenInvalid => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID".to_string(),
                    "Invalid or expired token".to_string(),
                ),
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN".to_string(),
                    "Missing authentication token".to_string(),
                ),
            },

            AppError::Database(DatabaseError::ConnectionPool(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE".to_string(),
                "Database service temporarily unavailable".to_string(),
            ),
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => (
                StatusCode::CONFLICT,
                "DATA_INTEGRITY_ERROR".to_string(),
                "Data constraint violation".to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR".to_string(),
                "Database error occurred".to_string(),
            ),

            AppError::Email(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "EMAIL_SERVICE_ERROR".to_string(),
                "Email service temporarily unavailable".to_string(),
            ),

            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNKNOWN_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let mut error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );
        if expose_details && self.is_unknown() {
            error_response = error_response.with_detail(format!("{:?}", self));
        }

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Known(e) => {
                tracing::warn!(
                    request_id = request_id,
                    code = e.code(),
                    error = %e.message(),
                    "Known error"
                );
            }
            AppError::Validation(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Validation error"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Authentication error"
                );
            }
            AppError::Database(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    detail = ?e,
                    "Database error"
                );
            }
            AppError::Email(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Email service error"
                );
            }
            AppError::Config(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Configuration error"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    request_id = request_id,
                    error = %msg,
                    "Internal error"
                );
            }
        }
    }
}

/// Lets an embedding actix-web application return `AppError` from handlers
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) =
            <Self as ErrorHandler>::error_response(self, &request_id, false);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        <Self as ErrorHandler>::error_response(self, "", false).0
    }
}

// ============================================================================
// 5. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-flow context attached to log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        if error.is_unknown() {
            tracing::error!(error = %error, detail = ?error, context = %context, "Unexpected failure");
        } else {
            tracing::warn!(error = %error, context = %context, "Request rejected");
        }
    }

    /// Log the error of a failed flow and pass the result through
    pub fn trace<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(error) = &result {
            self.log_error(error);
        }
        result
    }
}
