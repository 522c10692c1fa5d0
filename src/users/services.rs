use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        jwt::{JwtKeys, TokenError},
        password::{hash_password_blocking, verify_password_blocking, PasswordError},
    },
    users::{
        repo::{StoreError, UserStore},
        repo_types::User,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// User business logic over any [`UserStore`] backend.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    keys: Arc<JwtKeys>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, keys: Arc<JwtKeys>) -> Self {
        Self { store, keys }
    }

    /// Sanitize a user payload destined for update.
    ///
    /// Clears the id so identity must come from elsewhere (the verified token),
    /// trims and HTML-escapes username/email, and resets both timestamps to now.
    /// The password is left untouched.
    pub fn prepare(user: &mut User) {
        let now = OffsetDateTime::now_utc();
        user.info.id = 0;
        user.info.username = escape_html(user.info.username.trim());
        user.info.email = escape_html(user.info.email.trim());
        user.info.created_at = now;
        user.info.updated_at = now;
    }

    /// Replace the plaintext password with its hash. Must run before any store write.
    async fn before_save(&self, user: &mut User) -> Result<(), ServiceError> {
        let plain = std::mem::take(&mut user.password);
        user.password = hash_password_blocking(plain).await?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(username = %user.info.username))]
    pub async fn create_user(&self, mut user: User) -> Result<User, ServiceError> {
        self.before_save(&mut user).await?;
        let user = self.store.create(user).await?;
        info!(user_id = user.id(), "user created");
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = user.info.id))]
    pub async fn update_user(&self, mut user: User) -> Result<User, ServiceError> {
        self.before_save(&mut user).await?;
        let user = self.store.update(user).await?;
        info!("user password updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<u64, ServiceError> {
        let rows = self.store.delete(id).await?;
        info!(rows, "user delete executed");
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: i64) -> Result<User, ServiceError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Check credentials and issue a bearer token for the matching user.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let user = match self.store.get_by_username(username).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!("login unknown username");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        match verify_password_blocking(user.password.clone(), password.to_owned()).await {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                warn!(user_id = user.id(), "login invalid password");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        }

        let token = self.keys.issue(user.id())?;
        info!(user_id = user.id(), "user logged in");
        Ok(token)
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
