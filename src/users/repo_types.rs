use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Public part of a user: everything except the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// User record in the database. Not serializable, so the hash cannot leak into a response.
#[derive(Clone, FromRow)]
pub struct User {
    #[sqlx(flatten)]
    pub info: UserInfo,
    pub password: String, // Argon2 PHC string once saved
}

impl User {
    /// A not-yet-persisted user; the store assigns `id` and timestamps.
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            info: UserInfo {
                id: 0,
                username: username.into(),
                email: email.into(),
                created_at: now,
                updated_at: now,
            },
            password: password.into(),
        }
    }

    pub fn id(&self) -> i64 {
        self.info.id
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        user.info
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("info", &self.info)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_info_never_carries_the_password() {
        let user = User::new("user1", "user1@gmail.com", "$argon2id$secret-hash");
        let json = serde_json::to_value(UserInfo::from(user.clone())).unwrap();
        assert_eq!(json["username"], "user1");
        assert_eq!(json["email"], "user1@gmail.com");
        assert!(json.get("password").is_none());
        assert!(!format!("{user:?}").contains("secret-hash"));
    }
}
