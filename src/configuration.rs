use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub activation: ActivationSettings,
    #[serde(default)]
    pub reset_password: ResetPasswordSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Clone, Default)]
pub struct ApplicationSettings {
    /// Include diagnostic detail of unexpected failures in error responses.
    /// Off in production.
    #[serde(default)]
    pub expose_error_details: bool,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 86400 for 24 hours)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct ActivationSettings {
    pub ttl_hours: i64,
    /// Frontend page that receives `?hash=...`
    pub link_base_url: String,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            ttl_hours: crate::domain::ACTIVATION_HASH_TTL_HOURS,
            link_base_url: "http://localhost:4200/account/activate".to_string(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct ResetPasswordSettings {
    pub ttl_seconds: u64,
    /// Frontend page that receives `?token=...`
    pub link_base_url: String,
}

impl Default for ResetPasswordSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: crate::auth::RESET_TOKEN_TTL_SECONDS,
            link_base_url: "http://localhost:4200/account/reset-password".to_string(),
        }
    }
}

/// Shared cache holding reset password tokens
#[derive(serde::Deserialize, Clone)]
pub struct CacheSettings {
    pub redis_uri: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_uri: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    #[serde(default = "default_email_timeout")]
    pub timeout_milliseconds: u64,
}

fn default_email_timeout() -> u64 {
    10_000
}

impl EmailClientSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

/// Loads `configuration.{yaml,toml,json}` when present, then `APP_*`
/// environment variables (`APP_JWT__SECRET=...`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
