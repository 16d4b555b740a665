//! API request/response models for login and sessions.

use axum::{
    Json,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::CurrentUser;
use crate::auth::session::IssuedSession;
use crate::errors::Error;
use crate::types::UserId;

/// Student login. Fields are optional so a missing field is reported as 400 rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PinLoginRequest {
    #[schema(example = "student1")]
    pub username: Option<String>,
    #[schema(example = "1234")]
    pub pin: Option<String>,
}

/// Teacher login with email and password
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "teacher@school.test")]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A session token as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedSession> for SessionResponse {
    fn from(session: IssuedSession) -> Self {
        Self {
            access_token: session.access_token,
            token_type: "bearer".to_string(),
            expires_at: session.expires_at,
        }
    }
}

/// Public view of a logged-in student
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
}

impl From<&CurrentUser> for StudentSummary {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PinLoginResponse {
    pub success: bool,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub user: StudentSummary,
    pub session: SessionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: CurrentUser,
    pub session: SessionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// A JSON body sent together with a `Set-Cookie` header
pub struct WithCookie<T> {
    pub body: T,
    pub cookie: String,
}

impl<T: Serialize> IntoResponse for WithCookie<T> {
    fn into_response(self) -> Response {
        let cookie = match HeaderValue::from_str(&self.cookie) {
            Ok(value) => value,
            Err(e) => {
                return Error::Internal {
                    operation: format!("build session cookie: {e}"),
                }
                .into_response();
            }
        };

        let mut response = Json(self.body).into_response();
        response.headers_mut().insert(header::SET_COOKIE, cookie);
        response
    }
}
