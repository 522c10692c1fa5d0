use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::User,
};

/// Process-local [`UserStore`]. Same uniqueness and not-found semantics as postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, mut user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let taken = inner.users.values().any(|u| {
            u.info.username == user.info.username || u.info.email == user.info.email
        });
        if taken {
            return Err(StoreError::UniquenessViolation);
        }

        inner.last_id += 1;
        let now = OffsetDateTime::now_utc();
        user.info.id = inner.last_id;
        user.info.created_at = now;
        user.info.updated_at = now;
        inner.users.insert(user.info.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.info.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .get_mut(&user.info.id)
            .ok_or(StoreError::NotFound)?;
        stored.password = user.password;
        stored.info.updated_at = OffsetDateTime::now_utc();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let removed = self.inner.write().await.users.remove(&id);
        Ok(u64::from(removed.is_some()))
    }
}
