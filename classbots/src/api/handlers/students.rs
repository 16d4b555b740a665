use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    access::{
        pin::{derived_email, validate_pin},
        reconcile_membership,
    },
    api::models::{
        students::{PinReset, StudentCreate, StudentResponse},
        users::CurrentUser,
    },
    auth::password::{Argon2Params, hash_secret},
    db::{
        errors::DbError,
        models::{accounts::AccountCreateDBRequest, profiles::StudentProfileCreateDBRequest},
    },
    errors::{Error, ErrorBody},
    store::constraints,
    types::{Operation, Resource, Role, UserId},
};

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 32;

/// Usernames are 3-32 characters of letters, digits, `_`, `.` or `-`
fn validate_username(username: &str) -> Result<(), Error> {
    let length = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length) {
        return Err(Error::BadRequest {
            message: format!("Username must be between {USERNAME_MIN_LENGTH} and {USERNAME_MAX_LENGTH} characters"),
        });
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err(Error::BadRequest {
            message: "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        });
    }
    Ok(())
}

/// The username or its derived email already belongs to someone
fn is_taken(e: &DbError) -> bool {
    e.is_unique_violation(Some(constraints::USERNAME_UNIQUE)) || e.is_unique_violation(Some(constraints::ACCOUNT_EMAIL_UNIQUE))
}

/// Hash a PIN twice: once for the profile and once as the account password
async fn hash_pin(pin: &str, params: Argon2Params) -> Result<(String, String), Error> {
    let pin_hash = hash_secret(pin.to_string(), params).await?;
    let password_hash = hash_secret(pin.to_string(), params).await?;
    Ok((pin_hash, password_hash))
}

/// Create a student account
#[utoipa::path(
    post,
    path = "/api/teacher/students",
    tag = "teacher",
    request_body = StudentCreate,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Invalid username or PIN", body = ErrorBody),
        (status = 403, description = "Caller is not a teacher or does not own the room", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_student(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), Error> {
    current_user.require_teacher(Operation::Create, Resource::Students)?;

    let username = request.username.trim().to_string();
    validate_username(&username)?;
    validate_pin(&request.pin, &state.config.auth.pin)?;

    if let Some(room_id) = request.room_id {
        let room = state.store.find_room(room_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Room".to_string(),
            id: room_id.to_string(),
        })?;
        current_user.require_owner(room.teacher_id, Operation::Update, Resource::Rooms)?;
    }

    let display_name = request
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| username.clone());

    let params = Argon2Params::from(&state.config.auth.native.password);
    let (pin_hash, password_hash) = hash_pin(&request.pin, params).await?;

    let account = AccountCreateDBRequest {
        email: derived_email(&username, &state.config.auth.pin.derived_email_domain),
        password_hash,
        role: Role::Student,
    };
    let profile = StudentProfileCreateDBRequest {
        username,
        display_name,
        pin_hash,
    };

    let (account, profile) = match state.store.create_student(&account, &profile).await {
        Ok(created) => created,
        Err(e) if is_taken(&e) => {
            return Err(Error::Conflict {
                message: format!("Username '{}' is already taken", profile.username),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(room_id) = request.room_id {
        reconcile_membership(state.store.as_ref(), room_id, account.id).await?;
    }

    tracing::info!(student_id = %account.id, "Student created");
    Ok((
        StatusCode::CREATED,
        Json(StudentResponse {
            id: account.id,
            username: profile.username,
            display_name: profile.display_name,
            email: account.email,
            created_at: profile.created_at,
            room_id: request.room_id,
        }),
    ))
}

/// Reset a student's PIN
#[utoipa::path(
    put,
    path = "/api/teacher/students/{student_id}/pin",
    tag = "teacher",
    request_body = PinReset,
    params(("student_id" = String, Path, description = "Student user ID")),
    responses(
        (status = 204, description = "PIN reset"),
        (status = 400, description = "Invalid PIN", body = ErrorBody),
        (status = 403, description = "Caller is not a teacher", body = ErrorBody),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_student_pin(
    State(state): State<AppState>,
    Path(student_id): Path<UserId>,
    current_user: CurrentUser,
    Json(request): Json<PinReset>,
) -> Result<StatusCode, Error> {
    current_user.require_teacher(Operation::Update, Resource::Students)?;
    validate_pin(&request.pin, &state.config.auth.pin)?;

    if state.store.find_profile(student_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Student".to_string(),
            id: student_id.to_string(),
        });
    }

    let params = Argon2Params::from(&state.config.auth.native.password);
    let (pin_hash, password_hash) = hash_pin(&request.pin, params).await?;
    state.store.update_student_pin(student_id, &pin_hash, &password_hash).await?;

    tracing::info!(student_id = %student_id, "Student PIN reset");
    Ok(StatusCode::NO_CONTENT)
}
