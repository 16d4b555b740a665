//! Signed session tokens.
//!
//! Teachers and students hold the same kind of session: an HS256 JWT signed with `secret_key`
//! whose claims carry the account id, role and, for students, the display name shown in the
//! classroom UI. Tokens are stateless, so logout only clears the cookie.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    api::models::users::CurrentUser,
    config::Config,
    errors::Error,
    types::{Role, UserId},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: UserId,
    pub email: String,
    /// Student username; teachers use their email
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(user: &CurrentUser, config: &Config) -> Self {
        let issued_at = Utc::now();
        let expires_at = issued_at + config.auth.security.jwt_expiry;

        Self {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            name: user.display_name.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        }
    }
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
            role: claims.role,
            display_name: claims.name,
        }
    }
}

/// A signed session token and when it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

fn secret_key(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: secret_key is required".to_string(),
    })
}

/// Create a JWT token for a user session
pub fn create_session_token(user: &CurrentUser, config: &Config) -> Result<IssuedSession, Error> {
    let claims = SessionClaims::new(user, config);
    let key = EncodingKey::from_secret(secret_key(config)?.as_bytes());

    let access_token = encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })?;
    let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| Error::Internal {
        operation: format!("convert session expiry {}", claims.exp),
    })?;

    Ok(IssuedSession { access_token, expires_at })
}

/// Verify and decode a JWT session token
pub fn verify_session_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let key = DecodingKey::from_secret(secret_key(config)?.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(rejection)?;
    Ok(CurrentUser::from(token_data.claims))
}

/// Anything wrong with the token itself is the client's problem; key and crypto failures are ours
fn rejection(e: jsonwebtoken::errors::Error) -> Error {
    match e.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::ImmatureSignature
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },
        _ => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },
    }
}
