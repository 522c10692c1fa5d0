use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, warn};

use crate::users::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("username or email already taken")]
    UniquenessViolation,
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            // 23505: unique_violation
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniquenessViolation
            }
            _ => {
                error!(error = %err, "database error");
                StoreError::Storage(err.to_string())
            }
        }
    }
}

/// Persistence contract for users. Uniqueness of username and email is enforced here.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning its id and timestamps.
    async fn create(&self, user: User) -> Result<User, StoreError>;
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError>;
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError>;
    /// Replace the password of `user.id` and bump `updated_at`. Other fields are ignored.
    async fn update(&self, user: User) -> Result<User, StoreError>;
    /// Physically delete; returns the number of rows removed (0 if absent).
    async fn delete(&self, id: i64) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a pool and apply the embedded migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        Ok(Self::new(db))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password, created_at, updated_at
            "#,
        )
        .bind(&user.info.username)
        .bind(&user.info.email)
        .bind(&user.password)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password = $2, updated_at = now()
             WHERE id = $1
            RETURNING id, username, email, password, created_at, updated_at
            "#,
        )
        .bind(user.info.id)
        .bind(&user.password)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn pg_store_enforces_contract(pool: PgPool) {
        let store = PgUserStore::new(pool);

        let created = store
            .create(User::new("pguser", "pguser@example.com", "hash-1"))
            .await
            .expect("create");
        assert!(created.id() > 0);
        assert_eq!(created.info.created_at, created.info.updated_at);

        let dup = store
            .create(User::new("pguser", "other@example.com", "hash-2"))
            .await
            .unwrap_err();
        assert!(matches!(dup, StoreError::UniquenessViolation));

        let by_name = store.get_by_username("pguser").await.expect("by username");
        assert_eq!(by_name.id(), created.id());

        let mut changed = created.clone();
        changed.password = "hash-3".into();
        let updated = store.update(changed).await.expect("update");
        assert_eq!(updated.password, "hash-3");
        assert!(updated.info.updated_at >= created.info.updated_at);

        assert_eq!(store.delete(created.id()).await.unwrap(), 1);
        assert_eq!(store.delete(created.id()).await.unwrap(), 0);
        assert!(matches!(
            store.get_by_id(created.id()).await,
            Err(StoreError::NotFound)
        ));
    }
}
