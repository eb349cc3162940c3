use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    AccountService, ActivationHashManager, AuthService, BcryptPasswordEncoder, CredentialCodec,
    PasswordEncoder, ResetTokenCache, TokenLedger, RESET_PASSWORD_MAP,
};
use crate::configuration::Settings;
use crate::email_client::{EmailClient, EmailLinks, EmailSender, SenderEmail};
use crate::error::{AppError, ConfigError, DatabaseError};
use crate::store::{
    ActivationHashStore, PgActivationHashStore, PgTokenStore, PgUserStore, RedisTtlCache,
    TokenStore, TtlCache, UserStore,
};

/// Every service of the account core, ready to be shared across handlers
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub accounts: AccountService,
}

/// Storage and delivery collaborators the services are built from
pub struct Collaborators {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub activation_hashes: Arc<dyn ActivationHashStore>,
    pub cache: Arc<dyn TtlCache>,
    pub email: Arc<dyn EmailSender>,
    pub encoder: Arc<dyn PasswordEncoder>,
}

/// Connect to Postgres and Redis and wire the services from configuration
pub async fn build(settings: &Settings) -> Result<Services, AppError> {
    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            AppError::Database(DatabaseError::ConnectionPool(e.to_string()))
        })?;
    tracing::info!("Database connection pool created successfully");

    let collaborators = Collaborators {
        users: Arc::new(PgUserStore::new(pool.clone())),
        tokens: Arc::new(PgTokenStore::new(pool.clone())),
        activation_hashes: Arc::new(PgActivationHashStore::new(pool)),
        cache: Arc::new(reset_cache(settings).await?),
        email: Arc::new(email_client(settings)?),
        encoder: Arc::new(BcryptPasswordEncoder::default()),
    };

    Ok(build_with(settings, collaborators))
}

/// Wire the services over the given collaborators
pub fn build_with(settings: &Settings, collaborators: Collaborators) -> Services {
    let Collaborators {
        users,
        tokens,
        activation_hashes,
        cache,
        email,
        encoder,
    } = collaborators;

    let codec = CredentialCodec::new(settings.jwt.clone());
    let ledger = TokenLedger::new(tokens);
    let activation = ActivationHashManager::new(
        activation_hashes,
        users.clone(),
        email.clone(),
        chrono::Duration::hours(settings.activation.ttl_hours),
    );
    let reset = ResetTokenCache::new(cache, users.clone(), email.clone());

    let auth = AuthService::new(
        users.clone(),
        ledger.clone(),
        codec.clone(),
        activation,
        reset,
        encoder.clone(),
        email.clone(),
    );
    let accounts = AccountService::new(users, ledger, codec, encoder, email);

    Services { auth, accounts }
}

/// The shared reset token cache with its single TTL map
pub async fn reset_cache(settings: &Settings) -> Result<RedisTtlCache, AppError> {
    RedisTtlCache::connect(
        &settings.cache.redis_uri,
        &[(
            RESET_PASSWORD_MAP,
            Duration::from_secs(settings.reset_password.ttl_seconds),
        )],
    )
    .await
    .map_err(|e| AppError::Internal(format!("Failed to connect to reset token cache: {}", e)))
}

pub fn email_client(settings: &Settings) -> Result<EmailClient, AppError> {
    let sender = SenderEmail::parse(settings.email_client.sender_email.clone()).map_err(|e| {
        AppError::Config(ConfigError::InvalidValue(format!("email_client.sender_email: {}", e)))
    })?;

    let http_client = reqwest::Client::builder()
        .timeout(settings.email_client.timeout())
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    Ok(EmailClient::new(
        settings.email_client.base_url.clone(),
        sender,
        http_client,
        EmailLinks {
            activation_base_url: settings.activation.link_base_url.clone(),
            reset_password_base_url: settings.reset_password.link_base_url.clone(),
        },
    ))
}
