use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::JwtConfig;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),
    #[error("token is expired or invalid: {0}")]
    ExpiredOrInvalid(String),
    #[error("token subject is missing or not numeric")]
    ClaimDecode,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Claims written into every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub authorized: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys, built once from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::seconds(config.ttl_minutes.saturating_mul(60)),
            validation,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    /// Issue a token as if it had been created at `issued_at`.
    pub fn issue_at(&self, user_id: i64, issued_at: OffsetDateTime) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".into()))?;
        let claims = Claims {
            sub: user_id,
            authorized: true,
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<(), TokenError> {
        self.decode_claims(token).map(|_| ())
    }

    pub fn extract_subject(&self, token: &str) -> Result<i64, TokenError> {
        let claims = self.decode_claims(token)?;
        let user_id = subject_of(&claims)?;
        debug!(user_id, "jwt verified");
        Ok(user_id)
    }

    fn decode_claims(&self, token: &str) -> Result<Value, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed("no token supplied".into()));
        }
        let data = decode::<Value>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(token, e))?;
        if data.claims.get("authorized").and_then(Value::as_bool) != Some(true) {
            return Err(TokenError::ExpiredOrInvalid("token is not authorized".into()));
        }
        Ok(data.claims)
    }
}

fn classify(token: &str, err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => TokenError::Malformed(err.to_string()),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            let alg = decode_header(token)
                .map(|h| format!("{:?}", h.alg))
                .unwrap_or_else(|_| "unknown".into());
            TokenError::UnexpectedSigningMethod(alg)
        }
        _ => TokenError::ExpiredOrInvalid(err.to_string()),
    }
}

/// The subject may arrive as a JSON number or a numeric string.
fn subject_of(claims: &Value) -> Result<i64, TokenError> {
    match claims.get("sub") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or(TokenError::ClaimDecode)
}
