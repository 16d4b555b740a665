use axum::{
    Json,
    extract::{Query, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    access::{RoomCode, RoomLookup, reconcile_membership},
    api::models::{
        rooms::{
            JoinRoomRequest, JoinRoomResponse, RoomSummary, VerifyMembershipQuery, VerifyMembershipResponse,
            VerifyRoomCodeQuery, VerifyRoomCodeResponse,
        },
        users::CurrentUser,
    },
    errors::{Error, ErrorBody},
    types::{Operation, Resource},
};

/// Parse and normalize a room code, mapping format errors to 400
fn parse_room_code(raw: Option<&str>) -> Result<RoomCode, Error> {
    let raw = raw.map(str::trim).filter(|c| !c.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Room code is required".to_string(),
    })?;
    RoomCode::parse(raw).map_err(|e| {
        tracing::debug!(error = %e, "Rejected room code");
        Error::InvalidRoomCode
    })
}

fn parse_id(raw: Option<&str>, name: &str) -> Result<Uuid, Error> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| Error::BadRequest {
        message: format!("Missing required parameter: {name}"),
    })?;
    Uuid::parse_str(raw).map_err(|_| Error::BadRequest {
        message: format!("Invalid {name}: expected a UUID"),
    })
}

/// Resolve a room code to an active room and its chatbot count
#[utoipa::path(
    get,
    path = "/api/student/verify-room-code",
    tag = "student",
    params(VerifyRoomCodeQuery),
    responses(
        (status = 200, description = "Room found and active", body = VerifyRoomCodeResponse),
        (status = 400, description = "Code missing, malformed, or room inactive", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody),
        (status = 500, description = "Database error", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_room_code(
    State(state): State<AppState>,
    Query(query): Query<VerifyRoomCodeQuery>,
) -> Result<Json<VerifyRoomCodeResponse>, Error> {
    let code = parse_room_code(query.code.as_deref())?;

    if let Some(limiter) = &state.limiters.room_code {
        limiter.check(code.as_str())?;
    }

    let room = RoomLookup::new(state.store.as_ref(), &state.room_cache)
        .find_active(&code)
        .await?;
    let chatbot_count = state.store.count_room_chatbots(room.id).await?;

    Ok(Json(VerifyRoomCodeResponse {
        room: RoomSummary::from(&room),
        chatbot_count,
    }))
}

/// Check that a student belongs to a room, adding them if not
#[utoipa::path(
    get,
    path = "/api/student/verify-membership",
    tag = "student",
    params(VerifyMembershipQuery),
    responses(
        (status = 200, description = "Student is a member", body = VerifyMembershipResponse),
        (status = 400, description = "Missing or malformed parameters", body = ErrorBody),
        (status = 404, description = "User or room not found", body = ErrorBody),
        (status = 500, description = "Database error", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_membership(
    State(state): State<AppState>,
    Query(query): Query<VerifyMembershipQuery>,
) -> Result<Json<VerifyMembershipResponse>, Error> {
    let room_id = parse_id(query.room_id.as_deref(), "roomId")?;
    let user_id = parse_id(query.user_id.as_deref(), "userId")?;

    // Only student accounts can hold a membership
    if state.store.find_profile(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }
    if state.store.find_room(room_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Room".to_string(),
            id: room_id.to_string(),
        });
    }

    let outcome = reconcile_membership(state.store.as_ref(), room_id, user_id).await?;

    Ok(Json(VerifyMembershipResponse {
        is_member: true,
        newly_joined: outcome.newly_joined(),
    }))
}

/// Join a room by code as the logged-in student
#[utoipa::path(
    post,
    path = "/api/student/join-room",
    tag = "student",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Student is a member of the room", body = JoinRoomResponse),
        (status = 400, description = "Code missing, malformed, or room inactive", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Caller is not a student", body = ErrorBody),
        (status = 404, description = "Room not found", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn join_room(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, Error> {
    current_user.require_student(Operation::Join, Resource::Rooms)?;
    let code = parse_room_code(request.room_code.as_deref())?;

    if let Some(limiter) = &state.limiters.room_code {
        limiter.check(code.as_str())?;
    }

    let room = RoomLookup::new(state.store.as_ref(), &state.room_cache)
        .find_active(&code)
        .await?;
    let outcome = reconcile_membership(state.store.as_ref(), room.id, current_user.id).await?;

    Ok(Json(JoinRoomResponse {
        room: RoomSummary::from(&room),
        newly_joined: outcome.newly_joined(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::{
        store::{InMemoryDatastore, MembershipStore, RoomStore},
        test_utils::{auth_header, create_test_app, create_test_config, seed_chatbot, seed_room, seed_student, seed_teacher, student_user},
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_verify_room_code_found() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        for name in ["Tutor", "Quiz"] {
            let bot = seed_chatbot(&store, teacher.id, name).await;
            store.attach_chatbot(room.id, bot.id).await.unwrap();
        }
        let server = create_test_app(store);

        let response = server.get("/api/student/verify-room-code").add_query_param("code", "ab12cd").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["room"]["room_id"], room.id.to_string());
        assert_eq!(body["room"]["room_code"], "AB12CD");
        assert_eq!(body["room"]["is_active"], true);
        assert_eq!(body["chatbot_count"], 2);
    }

    #[tokio::test]
    async fn test_verify_room_code_not_found_vs_inactive() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        seed_room(&store, teacher.id, "SHUT01", false).await;
        let server = create_test_app(store);

        let missing = server.get("/api/student/verify-room-code").add_query_param("code", "NOPE99").await;
        missing.assert_status(StatusCode::NOT_FOUND);
        let body: Value = missing.json();
        assert_eq!(body["error"], "Room not found");

        let inactive = server.get("/api/student/verify-room-code").add_query_param("code", "SHUT01").await;
        inactive.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = inactive.json();
        assert_eq!(body["code"], "ROOM_INACTIVE");
    }

    #[tokio::test]
    async fn test_verify_room_code_rejects_bad_format() {
        let server = create_test_app(InMemoryDatastore::new());

        for code in ["AB12C", "AB12C$"] {
            let response = server.get("/api/student/verify-room-code").add_query_param("code", code).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["code"], "INVALID_ROOM_CODE");
        }

        server
            .get("/api/student/verify-room-code")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_membership_creates_once() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let student = seed_student(&store, &config, "student1", "1234").await;
        let server = create_test_app(store.clone());

        let request = || {
            server
                .get("/api/student/verify-membership")
                .add_query_param("roomId", room.id)
                .add_query_param("userId", student.user_id)
        };

        let first = request().await;
        first.assert_status_ok();
        let body: Value = first.json();
        assert_eq!(body["isMember"], true);
        assert_eq!(body["newlyJoined"], true);
        assert_eq!(store.list_room_members(room.id).await.unwrap().len(), 1);

        let second = request().await;
        second.assert_status_ok();
        let body: Value = second.json();
        assert_eq!(body["isMember"], true);
        assert_eq!(body["newlyJoined"], false);
        assert_eq!(store.list_room_members(room.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_membership_errors() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let student = seed_student(&store, &config, "student1", "1234").await;
        let server = create_test_app(store);

        // Missing userId
        server
            .get("/api/student/verify-membership")
            .add_query_param("roomId", room.id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Malformed id
        server
            .get("/api/student/verify-membership")
            .add_query_param("roomId", "not-a-uuid")
            .add_query_param("userId", student.user_id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Unknown user
        let response = server
            .get("/api/student/verify-membership")
            .add_query_param("roomId", room.id)
            .add_query_param("userId", uuid::Uuid::new_v4())
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "User not found");

        // Unknown room
        server
            .get("/api/student/verify-membership")
            .add_query_param("roomId", uuid::Uuid::new_v4())
            .add_query_param("userId", student.user_id)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_verify_membership_rejects_teacher_account() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let other = seed_teacher(&store, &config, "other@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let server = create_test_app(store.clone());

        let response = server
            .get("/api/student/verify-membership")
            .add_query_param("roomId", room.id)
            .add_query_param("userId", other.id)
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "User not found");
        assert!(store.list_room_members(room.id).await.unwrap().is_empty());
        assert!(store.insert_membership(room.id, other.id).await.is_err());
    }

    #[tokio::test]
    async fn test_join_room_as_student() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let student = seed_student(&store, &config, "student1", "1234").await;
        let server = create_test_app(store.clone());

        let (name, value) = auth_header(&student_user(&student), &config);
        let response = server
            .post("/api/student/join-room")
            .add_header(name.clone(), value.clone())
            .json(&json!({"room_code": "ab12cd"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["room"]["room_id"], room.id.to_string());
        assert_eq!(body["newly_joined"], true);

        let response = server
            .post("/api/student/join-room")
            .add_header(name, value)
            .json(&json!({"room_code": "AB12CD"}))
            .await;
        let body: Value = response.json();
        assert_eq!(body["newly_joined"], false);
        assert!(store.find_membership(room.id, student.user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_join_room_requires_student_session() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        seed_room(&store, teacher.id, "AB12CD", true).await;
        let server = create_test_app(store);

        server
            .post("/api/student/join-room")
            .json(&json!({"room_code": "AB12CD"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = auth_header(&crate::test_utils::teacher_user_for(&teacher), &config);
        server
            .post("/api/student/join-room")
            .add_header(name, value)
            .json(&json!({"room_code": "AB12CD"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_deactivated_room_rejected_after_cached_lookup() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let server = create_test_app(store);

        server
            .get("/api/student/verify-room-code")
            .add_query_param("code", "AB12CD")
            .await
            .assert_status_ok();

        let (name, value) = auth_header(&crate::test_utils::teacher_user_for(&teacher), &config);
        server
            .patch(&format!("/api/teacher/rooms/{}", room.id))
            .add_header(name, value)
            .json(&json!({"is_active": false}))
            .await
            .assert_status_ok();

        server
            .get("/api/student/verify-room-code")
            .add_query_param("code", "AB12CD")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
