//! Repository trait definitions for testability and dependency injection.
//!
//! User persistence sits behind [`UserRepository`] so the auth and user
//! managers can be exercised against any backing store.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::{now_timestamp, unique_violation};
use crate::auth::{AuthError, AuthResult, Power, User, UserId};

const USER_COLUMNS: &str =
    "id, email, username, hashed_password, avatar, power, created_at, updated_at";

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub power: Power,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub power: Option<Power>,
}

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; unique violations map to the matching conflict error
    async fn create_user(&self, new_user: &NewUser) -> AuthResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Find user by exact username
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Find user by exact email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Resolve a login identifier against both username and email.
    ///
    /// A row whose username matches takes precedence over a row whose email
    /// matches.
    async fn find_by_username_or_email(&self, identifier: &str) -> AuthResult<Option<User>>;

    /// Apply a partial update and bump `updated_at`; `None` if the user is absent
    async fn update_user(&self, user_id: UserId, changes: &UserChanges)
    -> AuthResult<Option<User>>;

    /// Replace the stored avatar filename; `None` if the user is absent
    async fn set_avatar(&self, user_id: UserId, avatar: Option<&str>)
    -> AuthResult<Option<User>>;

    /// Total number of users
    async fn count_users(&self) -> AuthResult<i64>;

    /// Users ordered by id
    async fn list_users(&self, offset: i64, limit: i64) -> AuthResult<Vec<User>>;
}

/// Default SQL implementation of `UserRepository`
#[derive(Clone)]
pub struct SqlUserRepository {
    pool: SqlitePool,
}

impl SqlUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let raw_power: i16 = row.try_get("power")?;
    let power = Power::try_from(raw_power).map_err(|e| sqlx::Error::ColumnDecode {
        index: "power".to_string(),
        source: Box::new(e),
    })?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        hashed_password: row.try_get("hashed_password")?,
        avatar: row.try_get("avatar")?,
        power,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_write_error(err: sqlx::Error) -> AuthError {
    let conflict = match unique_violation(&err) {
        Some(message) if message.contains("users.email") => {
            Some(AuthError::UserEmailAlreadyExists)
        }
        Some(message) if message.contains("users.username") => {
            Some(AuthError::UserNameAlreadyExists)
        }
        _ => None,
    };
    conflict.unwrap_or(AuthError::Database(err))
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn create_user(&self, new_user: &NewUser) -> AuthResult<User> {
        let now = now_timestamp();
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, username, hashed_password, power, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.hashed_password)
        .bind(i16::from(new_user.power))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(user_from_row(&row)?)
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE username = ?1 OR email = ?1
             ORDER BY CASE WHEN username = ?1 THEN 0 ELSE 1 END
             LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn update_user(
        &self,
        user_id: UserId,
        changes: &UserChanges,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET
                 username = COALESCE(?2, username),
                 email = COALESCE(?3, email),
                 hashed_password = COALESCE(?4, hashed_password),
                 power = COALESCE(?5, power),
                 updated_at = ?6
             WHERE id = ?1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.hashed_password.as_deref())
        .bind(changes.power.map(i16::from))
        .bind(now_timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn set_avatar(
        &self,
        user_id: UserId,
        avatar: Option<&str>,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET avatar = ?2, updated_at = ?3
             WHERE id = ?1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(avatar)
        .bind(now_timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn count_users(&self) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_users(&self, offset: i64, limit: i64) -> AuthResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
