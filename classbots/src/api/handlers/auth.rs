use axum::{Json, extract::State};

use crate::{
    AppState,
    access::PinAuthenticator,
    api::models::{
        auth::{LoginRequest, LoginResponse, LogoutResponse, PinLoginRequest, PinLoginResponse, StudentSummary, WithCookie},
        users::CurrentUser,
    },
    auth::credentials::{CredentialError, CredentialExchange},
    config::Config,
    errors::{Error, ErrorBody},
};

/// Returns the trimmed value, or a 400 naming the missing field
fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::BadRequest {
            message: format!("Missing required field: {field}"),
        }),
    }
}

/// Log in as a student with username and PIN
#[utoipa::path(
    post,
    path = "/api/auth/student-pin-login",
    request_body = PinLoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful, session cookie set", body = PinLoginResponse),
        (status = 400, description = "Username or PIN missing", body = ErrorBody),
        (status = 401, description = "Invalid username or PIN", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody),
        (status = 500, description = "Session could not be created", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn student_pin_login(
    State(state): State<AppState>,
    Json(request): Json<PinLoginRequest>,
) -> Result<WithCookie<PinLoginResponse>, Error> {
    if !state.config.auth.pin.enabled {
        return Err(Error::BadRequest {
            message: "PIN login is disabled".to_string(),
        });
    }

    let username = required(request.username, "username")?;
    // PINs are compared exactly, so only emptiness is checked here
    let pin = request.pin.filter(|p| !p.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Missing required field: pin".to_string(),
    })?;

    let limiter_key = username.to_lowercase();
    if let Some(limiter) = &state.limiters.pin_login {
        limiter.check(&limiter_key)?;
    }

    let auth = PinAuthenticator::new(state.store.as_ref(), &state.config, &state.decoy_hash)
        .authenticate(&username, &pin)
        .await?;

    if let Some(limiter) = &state.limiters.pin_login {
        limiter.reset(&limiter_key);
    }

    let cookie = create_session_cookie(&auth.session.access_token, &state.config);
    let body = PinLoginResponse {
        success: true,
        user_id: auth.user.id,
        user: StudentSummary::from(&auth.user),
        session: auth.session.into(),
    };

    Ok(WithCookie { body, cookie })
}

/// Log in as a teacher with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<WithCookie<LoginResponse>, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let email = required(request.email, "email")?;
    let password = request.password.filter(|p| !p.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Missing required field: password".to_string(),
    })?;

    let invalid = || Error::InvalidCredentials {
        message: "Invalid email or password".to_string(),
    };

    let exchange = CredentialExchange::new(state.store.as_ref(), &state.config);
    let auth = match exchange.create_session(&email, &password).await {
        Ok(auth) => auth,
        Err(CredentialError::NoSuchCredential { .. }) => {
            state.decoy_hash.verify(&password).await?;
            return Err(invalid());
        }
        Err(CredentialError::InvalidCredential) => return Err(invalid()),
        Err(CredentialError::Infrastructure(e)) => return Err(e),
    };

    // Students sign in through the PIN flow
    if !auth.user.is_teacher() {
        return Err(invalid());
    }

    let cookie = create_session_cookie(&auth.session.access_token, &state.config);
    let body = LoginResponse {
        success: true,
        user: auth.user,
        session: auth.session.into(),
    };

    Ok(WithCookie { body, cookie })
}

/// Log out (clear the session cookie)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> WithCookie<LogoutResponse> {
    let session_config = &state.config.auth.native.session;
    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_secure, session_config.cookie_same_site
    );

    WithCookie {
        body: LogoutResponse {
            success: true,
            message: "Logout successful".to_string(),
        },
        cookie,
    }
}

/// The user the current session belongs to
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<CurrentUser> {
    Json(current_user)
}

fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.native.session;
    let max_age = config.auth.security.jwt_expiry.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}
