use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        chatbots::{ChatbotCreate, ChatbotResponse},
        users::CurrentUser,
    },
    db::models::chatbots::ChatbotCreateDBRequest,
    errors::{Error, ErrorBody},
    types::{Operation, Resource},
};

/// List the caller's chatbots
#[utoipa::path(
    get,
    path = "/api/teacher/chatbots",
    tag = "teacher",
    responses(
        (status = 200, description = "Chatbots owned by the caller", body = [ChatbotResponse]),
        (status = 403, description = "Caller is not a teacher", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_chatbots(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<ChatbotResponse>>, Error> {
    current_user.require_teacher(Operation::Read, Resource::Chatbots)?;
    let chatbots = state.store.list_chatbots(current_user.id).await?;
    Ok(Json(chatbots.into_iter().map(ChatbotResponse::from).collect()))
}

/// Create a chatbot
#[utoipa::path(
    post,
    path = "/api/teacher/chatbots",
    tag = "teacher",
    request_body = ChatbotCreate,
    responses(
        (status = 201, description = "Chatbot created", body = ChatbotResponse),
        (status = 400, description = "Name or model missing", body = ErrorBody),
        (status = 403, description = "Caller is not a teacher", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_chatbot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChatbotCreate>,
) -> Result<(StatusCode, Json<ChatbotResponse>), Error> {
    current_user.require_teacher(Operation::Create, Resource::Chatbots)?;

    let name = request.name.trim();
    let model = request.model.trim();
    if name.is_empty() || model.is_empty() {
        return Err(Error::BadRequest {
            message: "Chatbot name and model are required".to_string(),
        });
    }

    let chatbot = state
        .store
        .create_chatbot(&ChatbotCreateDBRequest {
            teacher_id: current_user.id,
            name: name.to_string(),
            model: model.to_string(),
            system_prompt: request.system_prompt,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ChatbotResponse::from(chatbot))))
}
