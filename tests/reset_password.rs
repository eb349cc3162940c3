mod common;

use std::time::Duration;

use authkeeper::auth::{ConfirmResetPasswordRequest, RESET_PASSWORD_MAP};
use authkeeper::domain::{Role, UserStatus};
use authkeeper::email_client::EmailKind;
use authkeeper::error::{AppError, AuthError, KnownError};
use authkeeper::store::InMemoryTtlCache;
use common::{credentials, spawn_app, spawn_app_with_cache, PASSWORD};

const NEW_PASSWORD: &str = "Fresh4567";

fn confirm(token: &str, password: &str) -> ConfirmResetPasswordRequest {
    ConfirmResetPasswordRequest {
        token: token.to_string(),
        new_password: password.to_string(),
    }
}

#[tokio::test]
async fn reset_link_then_confirm_changes_password() {
    let app = spawn_app();
    app.seed_user("alex@example.com", UserStatus::Activated, vec![Role::User])
        .await;

    let cache_token = app
        .services
        .auth
        .generate_reset_password_link("alex@example.com")
        .await
        .unwrap();

    let sent = app.email.last_of(EmailKind::ResetPassword).await.unwrap();
    assert_eq!(sent.recipient, "alex@example.com");
    assert_eq!(sent.payload, cache_token.token);

    let dto = app
        .services
        .auth
        .confirm_reset_password(confirm(&cache_token.token, NEW_PASSWORD))
        .await
        .unwrap();
    assert_eq!(dto.email, "alex@example.com");

    let old = app
        .services
        .auth
        .authenticate(credentials("alex@example.com", PASSWORD))
        .await;
    assert!(matches!(old, Err(AppError::Auth(AuthError::InvalidCredentials))));

    app.services
        .auth
        .authenticate(credentials("alex@example.com", NEW_PASSWORD))
        .await
        .unwrap();
}

#[tokio::test]
async fn reset_link_rejected_by_account_status() {
    let app = spawn_app();
    app.seed_user("locked@example.com", UserStatus::Locked, vec![Role::User])
        .await;
    app.seed_user("pending@example.com", UserStatus::Deactivated, vec![Role::User])
        .await;
    app.seed_user("deleted@example.com", UserStatus::Deleted, vec![Role::User])
        .await;
    let auth = &app.services.auth;

    let locked = auth
        .generate_reset_password_link("locked@example.com")
        .await
        .unwrap_err();
    assert_eq!(locked.known().map(|k| k.code()), Some("605"));

    assert_eq!(
        auth.generate_reset_password_link("pending@example.com")
            .await
            .unwrap_err()
            .known(),
        Some(KnownError::UserAlreadyDeactivated)
    );
    assert_eq!(
        auth.generate_reset_password_link("deleted@example.com")
            .await
            .unwrap_err()
            .known(),
        Some(KnownError::UserAlreadyDeleted)
    );
    assert_eq!(
        auth.generate_reset_password_link("nobody@example.com")
            .await
            .unwrap_err()
            .known(),
        Some(KnownError::InvalidUserEmail)
    );

    assert!(app.email.sent().await.is_empty());
}

#[tokio::test]
async fn reset_token_is_single_use() {
    let app = spawn_app();
    app.seed_user("alex@example.com", UserStatus::Activated, vec![Role::User])
        .await;
    let token = app
        .services
        .auth
        .generate_reset_password_link("alex@example.com")
        .await
        .unwrap()
        .token;

    app.services
        .auth
        .confirm_reset_password(confirm(&token, NEW_PASSWORD))
        .await
        .unwrap();
    let second = app
        .services
        .auth
        .confirm_reset_password(confirm(&token, "Another789"))
        .await;

    assert_eq!(second.unwrap_err().known(), Some(KnownError::ResetTokenExpired));
}

#[tokio::test]
async fn reset_token_expires_after_ttl() {
    let app = spawn_app_with_cache(InMemoryTtlCache::new(&[(
        RESET_PASSWORD_MAP,
        Duration::from_millis(50),
    )]));
    app.seed_user("alex@example.com", UserStatus::Activated, vec![Role::User])
        .await;
    let token = app
        .services
        .auth
        .generate_reset_password_link("alex@example.com")
        .await
        .unwrap()
        .token;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = app
        .services
        .auth
        .confirm_reset_password(confirm(&token, NEW_PASSWORD))
        .await;
    assert_eq!(result.unwrap_err().known(), Some(KnownError::ResetTokenExpired));

    app.services
        .auth
        .authenticate(credentials("alex@example.com", PASSWORD))
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_reset_token() {
    let app = spawn_app();

    let result = app
        .services
        .auth
        .confirm_reset_password(confirm("dd54f7b6-ad53-42c4-bc21-ece598e0b841", NEW_PASSWORD))
        .await;

    assert_eq!(result.unwrap_err().known(), Some(KnownError::ResetTokenExpired));
}

#[tokio::test]
async fn weak_new_password_is_rejected() {
    let app = spawn_app();
    app.seed_user("alex@example.com", UserStatus::Activated, vec![Role::User])
        .await;
    let token = app
        .services
        .auth
        .generate_reset_password_link("alex@example.com")
        .await
        .unwrap()
        .token;

    let result = app
        .services
        .auth
        .confirm_reset_password(confirm(&token, "short"))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    app.services
        .auth
        .confirm_reset_password(confirm(&token, NEW_PASSWORD))
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_reset_map_reports_empty_cache() {
    let app = spawn_app_with_cache(InMemoryTtlCache::default());

    let result = app
        .services
        .auth
        .confirm_reset_password(confirm("any-token", NEW_PASSWORD))
        .await;

    assert_eq!(result.unwrap_err().known(), Some(KnownError::EmptyCache));
}
