use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 30;
pub const EMAIL_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for updating the caller's own account. Only the password can change.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: u64,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!("{field} must be between {min} and {max} characters"));
    }
    Ok(())
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username is required".into());
        }
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        Ok(())
    }
}

impl CreateUserRequest {
    /// Trim identity fields, then check them against the stored column limits.
    pub fn normalize_and_validate(&mut self) -> Result<(), String> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();

        check_len("username", &self.username, USERNAME_MIN, USERNAME_MAX)?;
        if self.email.chars().count() > EMAIL_MAX || !is_valid_email(&self.email) {
            return Err("email must be a valid address".into());
        }
        check_len("password", &self.password, PASSWORD_MIN, PASSWORD_MAX)
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_len("password", &self.password, PASSWORD_MIN, PASSWORD_MAX)
    }
}
