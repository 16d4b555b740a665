//! OpenAPI documentation for the HTTP API.
//!
//! [`ApiDoc`] is served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Session security schemes: the JWT as a bearer token or as the session cookie.
struct SessionSecurityAddon;

impl Modify for SessionSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "The `access_token` returned by a login endpoint:\n\n\
                            ```\nAuthorization: Bearer <access_token>\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("classbots_session"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::student_pin_login,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::student::verify_room_code,
        api::handlers::student::verify_membership,
        api::handlers::student::join_room,
        api::handlers::rooms::list_rooms,
        api::handlers::rooms::create_room,
        api::handlers::rooms::update_room,
        api::handlers::rooms::delete_room,
        api::handlers::rooms::list_room_members,
        api::handlers::rooms::attach_chatbot,
        api::handlers::rooms::detach_chatbot,
        api::handlers::chatbots::list_chatbots,
        api::handlers::chatbots::create_chatbot,
        api::handlers::students::create_student,
        api::handlers::students::reset_student_pin,
    ),
    components(schemas(
        crate::errors::ErrorBody,
        crate::types::Role,
        api::models::users::CurrentUser,
        api::models::auth::PinLoginRequest,
        api::models::auth::PinLoginResponse,
        api::models::auth::LoginRequest,
        api::models::auth::LoginResponse,
        api::models::auth::LogoutResponse,
        api::models::auth::SessionResponse,
        api::models::auth::StudentSummary,
        api::models::rooms::RoomSummary,
        api::models::rooms::VerifyRoomCodeResponse,
        api::models::rooms::VerifyMembershipResponse,
        api::models::rooms::JoinRoomRequest,
        api::models::rooms::JoinRoomResponse,
        api::models::rooms::RoomCreate,
        api::models::rooms::RoomUpdate,
        api::models::rooms::RoomResponse,
        api::models::rooms::RoomMemberResponse,
        api::models::chatbots::ChatbotCreate,
        api::models::chatbots::ChatbotResponse,
        api::models::students::StudentCreate,
        api::models::students::StudentResponse,
        api::models::students::PinReset,
    )),
    modifiers(&SessionSecurityAddon),
    tags(
        (name = "authentication", description = "Student PIN login, teacher password login, and sessions"),
        (name = "student", description = "Room code verification, membership, and joining rooms"),
        (name = "teacher", description = "Room, chatbot, and student management. Every operation checks ownership."),
    ),
    info(
        title = "ClassBots API",
        version = "1.0.0",
        description = "Classroom access to AI chatbots.

## Authentication

Log in with `POST /api/auth/student-pin-login` (students) or `POST /api/auth/login` (teachers). \
The session is returned both as a cookie and as `session.access_token`, usable as a bearer token.

## Errors

Errors share one body shape: `{\"error\": \"<message>\", \"code\": \"<MACHINE_CODE>\"}`. \
`code` is omitted for plain validation and internal errors.",
    ),
)]
pub struct ApiDoc;
