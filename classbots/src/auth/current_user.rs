use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Extract user from JWT session cookie if present and valid
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but unreadable, or every session cookie rejected
#[instrument(skip(parts, config))]
fn try_session_cookie_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    let mut last_error = None;
    for cookie in cookie_str.split(';') {
        let Some((name, value)) = cookie.trim().split_once('=') else {
            continue;
        };
        if name != cookie_name {
            continue;
        }
        match session::verify_session_token(value, config) {
            Ok(user) => return Some(Ok(user)),
            // Expired tokens are expected; keep looking in case a fresher cookie follows
            Err(e) => last_error = Some(e),
        }
    }
    last_error.map(Err)
}

/// Extract user from an `Authorization: Bearer <token>` header
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    Some(session::verify_session_token(token.trim(), config))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but invalid
        let mut auth_errors = Vec::new();

        match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer token authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Bearer token authentication failed: {:?}", e);
                auth_errors.push(("Bearer token", e));
            }
            None => trace!("No bearer token authentication attempted"),
        }

        match try_session_cookie_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found session cookie authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Session cookie authentication failed: {:?}", e);
                auth_errors.push(("Session cookie", e));
            }
            None => trace!("No session cookie authentication attempted"),
        }

        if auth_errors.is_empty() {
            trace!("No authentication credentials found in request");
        } else {
            trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        }
        Err(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::CurrentUser,
        auth::session::create_session_token,
        store::InMemoryDatastore,
        test_utils::{create_test_state, teacher_user},
        types::Role,
    };
    use axum::{extract::FromRequestParts as _, http::request::Parts};

    fn create_test_parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    #[tokio::test]
    async fn test_session_cookie_extraction() {
        let state = create_test_state(InMemoryDatastore::new());
        let user = teacher_user();
        let token = create_session_token(&user, &state.config).unwrap().access_token;

        let cookie = format!("other=1; {}={}", state.config.auth.native.session.cookie_name, token);
        let mut parts = create_test_parts_with_header("cookie", &cookie);

        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current_user.id, user.id);
        assert_eq!(current_user.role, Role::Teacher);
    }

    #[tokio::test]
    async fn test_bearer_extraction() {
        let state = create_test_state(InMemoryDatastore::new());
        let user = teacher_user();
        let token = create_session_token(&user, &state.config).unwrap().access_token;

        let mut parts = create_test_parts_with_header("authorization", &format!("Bearer {token}"));

        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current_user.email, user.email);
    }

    #[tokio::test]
    async fn test_invalid_bearer_falls_back_to_cookie() {
        let state = create_test_state(InMemoryDatastore::new());
        let user = teacher_user();
        let token = create_session_token(&user, &state.config).unwrap().access_token;

        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header("authorization", "Bearer garbage")
            .header("cookie", format!("{}={}", state.config.auth.native.session.cookie_name, token))
            .body(())
            .unwrap();
        let (mut parts, _body) = request.into_parts();

        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current_user.id, user.id);
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_unauthorized() {
        let state = create_test_state(InMemoryDatastore::new());

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_cookie_returns_unauthorized() {
        let state = create_test_state(InMemoryDatastore::new());
        let cookie = format!("{}=not-a-jwt", state.config.auth.native.session.cookie_name);
        let mut parts = create_test_parts_with_header("cookie", &cookie);

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
