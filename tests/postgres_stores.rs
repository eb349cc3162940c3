//! Store adapters against a real Postgres, one fresh database per test.
//! Run with `cargo test -- --ignored` once Postgres from `configuration.yaml`
//! is reachable.

use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use authkeeper::auth::{BcryptPasswordEncoder, RegisterRequest, RESET_PASSWORD_MAP};
use authkeeper::configuration::{get_configuration, DatabaseSettings};
use authkeeper::domain::{ActivationHash, IssuedToken, NewUser, Role, User, UserStatus};
use authkeeper::email_client::RecordingEmailSender;
use authkeeper::error::{AppError, DatabaseError, KnownError};
use authkeeper::startup::{build_with, Collaborators};
use authkeeper::store::{
    ActivationHashStore, InMemoryTtlCache, PgActivationHashStore, PgTokenStore, PgUserStore,
    TokenStore, UserStore,
};

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn spawn_db() -> PgPool {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    configure_database(&configuration.database).await
}

fn new_user(email: &str, status: UserStatus, roles: Vec<Role>) -> User {
    NewUser {
        first_name: "Alex".to_string(),
        last_name: "Martin".to_string(),
        email: email.to_string(),
        phone: "0600000000".to_string(),
        password_hash: "hash".to_string(),
        status,
        roles,
    }
    .into_user()
}

// --- Users ---

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn user_round_trip_keeps_roles_and_status() {
    let pool = spawn_db().await;
    let store = PgUserStore::new(pool);
    let user = store
        .create(new_user(
            "alex@example.com",
            UserStatus::Locked,
            vec![Role::Admin, Role::Enterprise],
        ))
        .await
        .unwrap();

    let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
    let by_email = store.find_by_email("alex@example.com").await.unwrap().unwrap();

    assert_eq!(by_id.roles, vec![Role::Admin, Role::Enterprise]);
    assert_eq!(by_id.status, UserStatus::Locked);
    assert_eq!(by_email.id, user.id);
    assert!(by_id.last_update_on.is_none());
    assert!(store.exists_by_email("alex@example.com").await.unwrap());
    assert!(!store.exists_by_email("nobody@example.com").await.unwrap());
    assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn duplicate_email_is_a_unique_violation() {
    let pool = spawn_db().await;
    let store = PgUserStore::new(pool);
    store
        .create(new_user("alex@example.com", UserStatus::Activated, vec![Role::User]))
        .await
        .unwrap();

    let result = store
        .create(new_user("alex@example.com", UserStatus::Activated, vec![Role::User]))
        .await;

    assert!(matches!(
        result,
        Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn update_status_and_save() {
    let pool = spawn_db().await;
    let store = PgUserStore::new(pool);
    let mut user = store
        .create(new_user("alex@example.com", UserStatus::Deactivated, vec![Role::User]))
        .await
        .unwrap();

    assert!(!store.update_status(Uuid::new_v4(), UserStatus::Locked).await.unwrap());
    assert!(store.update_status(user.id, UserStatus::Activated).await.unwrap());

    user.status = UserStatus::Activated;
    user.password_hash = "changed".to_string();
    user.roles = vec![Role::User, Role::Admin];
    user.touch();
    store.save(&user).await.unwrap();

    let stored = store.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UserStatus::Activated);
    assert_eq!(stored.password_hash, "changed");
    assert_eq!(stored.roles, vec![Role::User, Role::Admin]);
    assert!(stored.last_update_on.is_some());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn unknown_status_code_fails_on_read() {
    let pool = spawn_db().await;
    let store = PgUserStore::new(pool.clone());
    let user = store
        .create(new_user("alex@example.com", UserStatus::Activated, vec![Role::User]))
        .await
        .unwrap();
    sqlx::query("UPDATE users SET status = 9 WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let result = store.find_by_id(user.id).await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

// --- Tokens ---

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn valid_token_query_matches_either_flag_and_revoke_is_bulk() {
    let pool = spawn_db().await;
    let users = PgUserStore::new(pool.clone());
    let tokens = PgTokenStore::new(pool);
    let owner = users
        .create(new_user("alex@example.com", UserStatus::Activated, vec![Role::User]))
        .await
        .unwrap();
    let other = users
        .create(new_user("sam@example.com", UserStatus::Activated, vec![Role::User]))
        .await
        .unwrap();

    tokens.insert(IssuedToken::new(owner.id, "fresh".to_string())).await.unwrap();
    let mut half = IssuedToken::new(owner.id, "half".to_string());
    half.expired = true;
    tokens.insert(half).await.unwrap();
    let mut spent = IssuedToken::new(owner.id, "spent".to_string());
    spent.expired = true;
    spent.revoked = true;
    tokens.insert(spent).await.unwrap();
    tokens.insert(IssuedToken::new(other.id, "theirs".to_string())).await.unwrap();

    let mut valid: Vec<String> = tokens
        .find_valid_by_user(owner.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.raw_value)
        .collect();
    valid.sort();
    assert_eq!(valid, vec!["fresh".to_string(), "half".to_string()]);

    assert_eq!(tokens.revoke_all_valid_by_user(owner.id).await.unwrap(), 2);
    assert!(tokens.find_valid_by_user(owner.id).await.unwrap().is_empty());
    assert_eq!(tokens.revoke_all_valid_by_user(owner.id).await.unwrap(), 0);

    let fresh = tokens.find_by_raw_value("fresh").await.unwrap().unwrap();
    assert!(fresh.expired && fresh.revoked);
    assert_eq!(tokens.find_valid_by_user(other.id).await.unwrap().len(), 1);
    assert!(tokens.find_by_raw_value("missing").await.unwrap().is_none());
}

// --- Activation hashes ---

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn activation_hash_save_and_delete_report_the_row() {
    let pool = spawn_db().await;
    let users = PgUserStore::new(pool.clone());
    let hashes = PgActivationHashStore::new(pool);
    let owner = users
        .create(new_user("alex@example.com", UserStatus::Deactivated, vec![Role::User]))
        .await
        .unwrap();

    let mut link = hashes
        .insert(ActivationHash::new(owner.id, chrono::Duration::hours(24)))
        .await
        .unwrap();
    let old_hash = link.hash().to_string();
    assert_eq!(
        hashes.find_by_hash(&old_hash).await.unwrap().map(|h| h.id()),
        Some(link.id())
    );

    link.regenerate(chrono::Duration::hours(24));
    assert!(hashes.save(&link).await.unwrap());
    assert!(hashes.find_by_hash(&old_hash).await.unwrap().is_none());
    assert!(hashes.find_by_hash(link.hash()).await.unwrap().is_some());

    assert!(hashes.delete(link.id()).await.unwrap());
    assert!(!hashes.delete(link.id()).await.unwrap());
    assert!(!hashes.save(&link).await.unwrap());
}

// --- Flows over Postgres ---

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Alex".to_string(),
        last_name: "Martin".to_string(),
        email: email.to_string(),
        phone: "0600000000".to_string(),
        password: "Secret123".to_string(),
        roles: vec![Role::User],
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_registrations_for_one_email_yield_one_account() {
    let pool = spawn_db().await;
    let settings = get_configuration().expect("Failed to read configuration.");
    let services = build_with(
        &settings,
        Collaborators {
            users: Arc::new(PgUserStore::new(pool.clone())),
            tokens: Arc::new(PgTokenStore::new(pool.clone())),
            activation_hashes: Arc::new(PgActivationHashStore::new(pool.clone())),
            cache: Arc::new(InMemoryTtlCache::new(&[(
                RESET_PASSWORD_MAP,
                Duration::from_secs(300),
            )])),
            email: Arc::new(RecordingEmailSender::new()),
            encoder: Arc::new(BcryptPasswordEncoder::new(4)),
        },
    );

    let (first, second) = tokio::join!(
        services.auth.register(register_request("alex@example.com")),
        services.auth.register(register_request("alex@example.com"))
    );

    let failure = match (first, second) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        (a, b) => panic!("expected one success, got {} and {}", a.is_ok(), b.is_ok()),
    };
    assert_eq!(failure.known(), Some(KnownError::EmailAlreadyUsed));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("alex@example.com")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
