use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use tracing::info;

use crate::{
    auth::jwt::JwtKeys,
    config::{AppConfig, StoreConfig},
    users::{
        memory::MemoryUserStore,
        repo::{PgUserStore, UserStore},
        services::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub users: UserService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match &config.store {
            StoreConfig::Postgres {
                database_url,
                max_connections,
                acquire_timeout_secs,
            } => {
                info!("using postgres user store");
                Arc::new(
                    PgUserStore::connect(
                        database_url,
                        *max_connections,
                        Duration::from_secs(*acquire_timeout_secs),
                    )
                    .await?,
                )
            }
            StoreConfig::Memory => {
                info!("using in-memory user store");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let keys = Arc::new(JwtKeys::new(&config.jwt));
        let users = UserService::new(store, keys.clone());
        Self {
            config,
            keys,
            users,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store: StoreConfig::Memory,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                ttl_minutes: 60,
            },
            seed_demo_users: false,
        });
        Self::from_parts(config, Arc::new(MemoryUserStore::new()))
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
