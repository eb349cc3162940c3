#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use authkeeper::auth::{
    AuthenticationRequest, BcryptPasswordEncoder, PasswordEncoder, RegisterRequest,
    RESET_PASSWORD_MAP,
};
use authkeeper::configuration::{
    ActivationSettings, ApplicationSettings, CacheSettings, DatabaseSettings, EmailClientSettings,
    JwtSettings, ResetPasswordSettings, Settings,
};
use authkeeper::domain::{NewUser, Role, User, UserStatus};
use authkeeper::email_client::RecordingEmailSender;
use authkeeper::startup::{build_with, Collaborators, Services};
use authkeeper::store::{
    InMemoryActivationHashStore, InMemoryTokenStore, InMemoryTtlCache, InMemoryUserStore,
    UserStore,
};

pub const PASSWORD: &str = "Secret123";

pub struct TestApp {
    pub services: Services,
    pub settings: Settings,
    pub users: InMemoryUserStore,
    pub tokens: InMemoryTokenStore,
    pub hashes: InMemoryActivationHashStore,
    pub email: RecordingEmailSender,
    pub encoder: BcryptPasswordEncoder,
}

pub fn test_settings() -> Settings {
    Settings {
        application: ApplicationSettings {
            expose_error_details: false,
        },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "accounts".to_string(),
            max_connections: 5,
        },
        jwt: JwtSettings {
            secret: "integration-secret-key-at-least-32-chars".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "authkeeper-tests".to_string(),
        },
        activation: ActivationSettings::default(),
        reset_password: ResetPasswordSettings::default(),
        cache: CacheSettings::default(),
        email_client: EmailClientSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            sender_email: "noreply@example.com".to_string(),
            timeout_milliseconds: 200,
        },
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_cache(InMemoryTtlCache::new(&[(
        RESET_PASSWORD_MAP,
        Duration::from_secs(300),
    )]))
}

pub fn spawn_app_with_cache(cache: InMemoryTtlCache) -> TestApp {
    let settings = test_settings();
    let users = InMemoryUserStore::new();
    let tokens = InMemoryTokenStore::new();
    let hashes = InMemoryActivationHashStore::new();
    let email = RecordingEmailSender::new();
    let encoder = BcryptPasswordEncoder::new(4);

    let services = build_with(
        &settings,
        Collaborators {
            users: Arc::new(users.clone()),
            tokens: Arc::new(tokens.clone()),
            activation_hashes: Arc::new(hashes.clone()),
            cache: Arc::new(cache),
            email: Arc::new(email.clone()),
            encoder: Arc::new(encoder),
        },
    );

    TestApp {
        services,
        settings,
        users,
        tokens,
        hashes,
        email,
        encoder,
    }
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Alex".to_string(),
        last_name: "Martin".to_string(),
        email: email.to_string(),
        phone: "+33 6 12 34 56 78".to_string(),
        password: PASSWORD.to_string(),
        roles: vec![Role::User],
    }
}

pub fn credentials(email: &str, password: &str) -> AuthenticationRequest {
    AuthenticationRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

impl TestApp {
    /// Insert a user directly in the store with the shared test password
    pub async fn seed_user(&self, email: &str, status: UserStatus, roles: Vec<Role>) -> User {
        self.users
            .create(
                NewUser {
                    first_name: "Sam".to_string(),
                    last_name: "Doe".to_string(),
                    email: email.to_string(),
                    phone: "0600000000".to_string(),
                    password_hash: self.encoder.encode(PASSWORD).unwrap(),
                    status,
                    roles,
                }
                .into_user(),
            )
            .await
            .unwrap()
    }

    pub async fn user(&self, email: &str) -> User {
        self.users.find_by_email(email).await.unwrap().unwrap()
    }
}
