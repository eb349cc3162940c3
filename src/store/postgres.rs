/// Postgres-backed stores
///
/// Schema lives in `migrations/`. Roles use a native `TEXT[]` column and
/// status a `SMALLINT` holding `UserStatus::code`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActivationHash, IssuedToken, Role, TokenType, User, UserStatus};
use crate::error::AppError;
use crate::store::{ActivationHashStore, TokenStore, UserStore};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    password_hash: String,
    status: i16,
    roles: Vec<String>,
    created_on: DateTime<Utc>,
    last_update_on: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = UserStatus::from_code(row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown status {} for user {}", row.status, row.id))
        })?;
        let roles = row
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::Internal)?;

        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            status,
            roles,
            created_on: row.created_on,
            last_update_on: row.last_update_on,
        })
    }
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, status, roles, created_on, last_update_on";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> Result<User, AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone, password_hash, status, roles, created_on, last_update_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.status.code())
        .bind(role_names(&user.roles))
        .bind(user.created_on)
        .bind(user.last_update_on)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status.code())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, email = $3, phone = $4,
                password_hash = $5, status = $6, roles = $7, last_update_on = $8
            WHERE id = $9
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.status.code())
        .bind(role_names(&user.roles))
        .bind(user.last_update_on)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    raw_value: String,
    expired: bool,
    revoked: bool,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for IssuedToken {
    fn from(row: TokenRow) -> Self {
        IssuedToken {
            id: row.id,
            raw_value: row.raw_value,
            token_type: TokenType::Bearer,
            expired: row.expired,
            revoked: row.revoked,
            owner_user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: IssuedToken) -> Result<IssuedToken, AppError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (id, raw_value, token_type, expired, revoked, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(&token.raw_value)
        .bind(token.token_type.as_str())
        .bind(token.expired)
        .bind(token.revoked)
        .bind(token.owner_user_id)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_valid_by_user(&self, owner: Uuid) -> Result<Vec<IssuedToken>, AppError> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, raw_value, expired, revoked, user_id, created_at
            FROM tokens
            WHERE user_id = $1 AND (expired = false OR revoked = false)
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IssuedToken::from).collect())
    }

    async fn revoke_all_valid_by_user(&self, owner: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET expired = true, revoked = true
            WHERE user_id = $1 AND (expired = false OR revoked = false)
            "#,
        )
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_raw_value(&self, raw_value: &str) -> Result<Option<IssuedToken>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, raw_value, expired, revoked, user_id, created_at
            FROM tokens
            WHERE raw_value = $1
            "#,
        )
        .bind(raw_value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IssuedToken::from))
    }
}

#[derive(Clone)]
pub struct PgActivationHashStore {
    pool: PgPool,
}

impl PgActivationHashStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivationHashStore for PgActivationHashStore {
    async fn insert(&self, hash: ActivationHash) -> Result<ActivationHash, AppError> {
        sqlx::query(
            r#"
            INSERT INTO activation_hashes (id, hash, expiration_date, user_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(hash.id())
        .bind(hash.hash())
        .bind(hash.expiration_date())
        .bind(hash.owner_user_id())
        .execute(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<ActivationHash>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>, Uuid)>(
            "SELECT id, hash, expiration_date, user_id FROM activation_hashes WHERE hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, hash, expiration_date, user_id)| {
            ActivationHash::from_parts(id, hash, expiration_date, user_id)
        }))
    }

    async fn save(&self, hash: &ActivationHash) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE activation_hashes SET hash = $1, expiration_date = $2 WHERE id = $3")
                .bind(hash.hash())
                .bind(hash.expiration_date())
                .bind(hash.id())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM activation_hashes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
