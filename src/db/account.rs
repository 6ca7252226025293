//! Account storage.
//!
//! The refresh_token column is the revocation anchor: a presented refresh
//! token is only honored while it is byte-equal to the stored value, and
//! rotation swaps it with a single conditional UPDATE so two concurrent
//! refreshes can never both win.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

/// Full account row including secret columns.
/// Never serialized; handlers project to [`PublicAccount`] before responding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Account projection without password hash or refresh token.
/// This is the view the authentication middleware loads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountProfile {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub created_at: String,
}

impl AccountProfile {
    pub fn to_public(&self) -> PublicAccount {
        PublicAccount {
            id: self.uuid.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Caller-facing account view.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    pub created_at: String,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account. Returns the row ID.
    /// Fails with a unique violation if the email is already registered.
    pub async fn create(
        &self,
        uuid: &str,
        email: &str,
        full_name: &str,
        avatar: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO accounts (uuid, email, full_name, avatar, password_hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(email)
        .bind(full_name)
        .bind(avatar)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a full account (secret columns included) by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, email, full_name, avatar, password_hash, refresh_token, created_at, updated_at FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a full account (secret columns included) by row ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, email, full_name, avatar, password_hash, refresh_token, created_at, updated_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get the secret-free profile projection by UUID.
    pub async fn get_profile_by_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<AccountProfile>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, email, full_name, avatar, created_at FROM accounts WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update full name and/or avatar. Absent fields keep their value.
    pub async fn update_profile(
        &self,
        id: i64,
        full_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET full_name = COALESCE(?, full_name), avatar = COALESCE(?, avatar), updated_at = datetime('now') WHERE id = ?",
        )
        .bind(full_name)
        .bind(avatar)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a new refresh token, replacing whatever was there.
    /// Login and registration use this; any prior session dies here.
    pub async fn set_refresh_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(token)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically replace the stored refresh token, but only if it still
    /// equals `current`. Returns false when the stored value has moved on
    /// (rotation replay) or the account is gone.
    pub async fn rotate_refresh_token(
        &self,
        id: i64,
        current: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token = ?, updated_at = datetime('now') WHERE id = ? AND refresh_token = ?",
        )
        .bind(next)
        .bind(id)
        .bind(current)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unset the stored refresh token. Idempotent.
    pub async fn clear_refresh_token(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET refresh_token = NULL, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and revoke the refresh token in one
    /// statement, forcing re-authentication everywhere.
    pub async fn set_password_hash(&self, id: i64, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = ?, refresh_token = NULL, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account by row ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
