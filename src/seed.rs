//! Demo accounts for local development (`SEED_DEMO_USERS=true`).
//!
//! | username | email             | password         |
//! |----------|-------------------|------------------|
//! | user1    | user1@gmail.com   | user1-password   |
//! | user2    | user2@gmail.com   | user2-password   |

use tracing::{info, warn};

use crate::users::{
    repo::StoreError,
    repo_types::User,
    services::{ServiceError, UserService},
};

pub const DEMO_USERS: [(&str, &str, &str); 2] = [
    ("user1", "user1@gmail.com", "user1-password"),
    ("user2", "user2@gmail.com", "user2-password"),
];

/// Create the demo users through the normal create path. Existing ones are left alone.
pub async fn seed_demo_users(users: &UserService) -> anyhow::Result<()> {
    for (username, email, password) in DEMO_USERS {
        match users.create_user(User::new(username, email, password)).await {
            Ok(user) => info!(user_id = user.id(), username, "seeded demo user"),
            Err(ServiceError::Store(StoreError::UniquenessViolation)) => {
                warn!(username, "demo user already present; skipping")
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
