use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    access::{RoomCode, rooms::invalidate_room},
    api::models::{
        rooms::{RoomCreate, RoomMemberResponse, RoomResponse, RoomUpdate},
        users::CurrentUser,
    },
    db::models::rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
    errors::{Error, ErrorBody},
    store::{Datastore, constraints},
    types::{ChatbotId, Operation, Resource, RoomId},
};

const MAX_ROOM_NAME_LENGTH: usize = 100;

fn validate_room_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_ROOM_NAME_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Room name must be between 1 and {MAX_ROOM_NAME_LENGTH} characters"),
        });
    }
    Ok(name.to_string())
}

/// Load a room and check the caller owns it
async fn owned_room(store: &dyn Datastore, current_user: &CurrentUser, room_id: RoomId, action: Operation) -> Result<RoomDBResponse, Error> {
    current_user.require_teacher(action, Resource::Rooms)?;
    let room = store.find_room(room_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Room".to_string(),
        id: room_id.to_string(),
    })?;
    current_user.require_owner(room.teacher_id, action, Resource::Rooms)?;
    Ok(room)
}

/// Check the caller owns a chatbot
async fn ensure_chatbot_owned(store: &dyn Datastore, current_user: &CurrentUser, chatbot_id: ChatbotId) -> Result<(), Error> {
    let chatbot = store.find_chatbot(chatbot_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Chatbot".to_string(),
        id: chatbot_id.to_string(),
    })?;
    current_user.require_owner(chatbot.teacher_id, Operation::Update, Resource::Chatbots)
}

/// Insert a room under a fresh code, regenerating on collision
async fn create_with_unique_code(state: &AppState, room_name: String, teacher_id: crate::types::UserId) -> Result<RoomDBResponse, Error> {
    let attempts = state.config.rooms.code_generation_attempts;
    for attempt in 1..=attempts {
        let request = RoomCreateDBRequest {
            room_code: RoomCode::generate().into_inner(),
            room_name: room_name.clone(),
            teacher_id,
        };
        match state.store.create_room(&request).await {
            Ok(room) => return Ok(room),
            Err(e) if e.is_unique_violation(Some(constraints::ROOM_CODE_UNIQUE)) => {
                tracing::debug!(attempt, code = %request.room_code, "Room code collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Internal {
        operation: format!("generate a unique room code after {attempts} attempts"),
    })
}

/// List the caller's rooms
#[utoipa::path(
    get,
    path = "/api/teacher/rooms",
    tag = "teacher",
    responses(
        (status = 200, description = "Rooms owned by the caller", body = [RoomResponse]),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Caller is not a teacher", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_rooms(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<RoomResponse>>, Error> {
    current_user.require_teacher(Operation::Read, Resource::Rooms)?;
    let rooms = state.store.list_rooms(current_user.id).await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

/// Create a room with a generated code
#[utoipa::path(
    post,
    path = "/api/teacher/rooms",
    tag = "teacher",
    request_body = RoomCreate,
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 400, description = "Invalid room name", body = ErrorBody),
        (status = 403, description = "Caller is not a teacher or does not own a chatbot", body = ErrorBody),
        (status = 404, description = "Chatbot not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_room(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<RoomCreate>,
) -> Result<(StatusCode, Json<RoomResponse>), Error> {
    current_user.require_teacher(Operation::Create, Resource::Rooms)?;
    let room_name = validate_room_name(&request.room_name)?;

    // Check every chatbot before creating anything
    for chatbot_id in &request.chatbot_ids {
        ensure_chatbot_owned(state.store.as_ref(), &current_user, *chatbot_id).await?;
    }

    let room = create_with_unique_code(&state, room_name, current_user.id).await?;
    for chatbot_id in &request.chatbot_ids {
        state.store.attach_chatbot(room.id, *chatbot_id).await?;
    }

    tracing::info!(room_id = %room.id, code = %room.room_code, "Room created");
    Ok((StatusCode::CREATED, Json(RoomResponse::from(room))))
}

/// Rename, activate, or deactivate a room
#[utoipa::path(
    patch,
    path = "/api/teacher/rooms/{room_id}",
    tag = "teacher",
    request_body = RoomUpdate,
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room updated", body = RoomResponse),
        (status = 400, description = "Invalid room name", body = ErrorBody),
        (status = 403, description = "Caller does not own the room", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    current_user: CurrentUser,
    Json(request): Json<RoomUpdate>,
) -> Result<Json<RoomResponse>, Error> {
    owned_room(state.store.as_ref(), &current_user, room_id, Operation::Update).await?;

    let update = RoomUpdateDBRequest {
        room_name: request.room_name.as_deref().map(validate_room_name).transpose()?,
        is_active: request.is_active,
    };
    let room = state.store.update_room(room_id, &update).await?;
    invalidate_room(&state.room_cache, room_id).await;

    Ok(Json(RoomResponse::from(room)))
}

/// Delete a room with its memberships and chatbot links
#[utoipa::path(
    delete,
    path = "/api/teacher/rooms/{room_id}",
    tag = "teacher",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 403, description = "Caller does not own the room", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    current_user: CurrentUser,
) -> Result<StatusCode, Error> {
    owned_room(state.store.as_ref(), &current_user, room_id, Operation::Delete).await?;

    if !state.store.delete_room(room_id).await? {
        return Err(Error::NotFound {
            resource: "Room".to_string(),
            id: room_id.to_string(),
        });
    }
    invalidate_room(&state.room_cache, room_id).await;

    tracing::info!(room_id = %room_id, "Room deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List the students who have joined a room
#[utoipa::path(
    get,
    path = "/api/teacher/rooms/{room_id}/members",
    tag = "teacher",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room members", body = [RoomMemberResponse]),
        (status = 403, description = "Caller does not own the room", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_room_members(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<RoomMemberResponse>>, Error> {
    owned_room(state.store.as_ref(), &current_user, room_id, Operation::Read).await?;
    let members = state.store.list_room_members(room_id).await?;
    Ok(Json(members.into_iter().map(RoomMemberResponse::from).collect()))
}

/// Attach a chatbot to a room
#[utoipa::path(
    post,
    path = "/api/teacher/rooms/{room_id}/chatbots/{chatbot_id}",
    tag = "teacher",
    params(
        ("room_id" = String, Path, description = "Room ID"),
        ("chatbot_id" = String, Path, description = "Chatbot ID"),
    ),
    responses(
        (status = 204, description = "Chatbot attached"),
        (status = 403, description = "Caller does not own the room or chatbot", body = ErrorBody),
        (status = 404, description = "Room or chatbot not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn attach_chatbot(
    State(state): State<AppState>,
    Path((room_id, chatbot_id)): Path<(RoomId, ChatbotId)>,
    current_user: CurrentUser,
) -> Result<StatusCode, Error> {
    owned_room(state.store.as_ref(), &current_user, room_id, Operation::Update).await?;
    ensure_chatbot_owned(state.store.as_ref(), &current_user, chatbot_id).await?;

    state.store.attach_chatbot(room_id, chatbot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Detach a chatbot from a room
#[utoipa::path(
    delete,
    path = "/api/teacher/rooms/{room_id}/chatbots/{chatbot_id}",
    tag = "teacher",
    params(
        ("room_id" = String, Path, description = "Room ID"),
        ("chatbot_id" = String, Path, description = "Chatbot ID"),
    ),
    responses(
        (status = 204, description = "Chatbot detached"),
        (status = 403, description = "Caller does not own the room", body = ErrorBody),
        (status = 404, description = "Room not found or chatbot not attached", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn detach_chatbot(
    State(state): State<AppState>,
    Path((room_id, chatbot_id)): Path<(RoomId, ChatbotId)>,
    current_user: CurrentUser,
) -> Result<StatusCode, Error> {
    owned_room(state.store.as_ref(), &current_user, room_id, Operation::Update).await?;

    if !state.store.detach_chatbot(room_id, chatbot_id).await? {
        return Err(Error::NotFound {
            resource: "Chatbot".to_string(),
            id: chatbot_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
