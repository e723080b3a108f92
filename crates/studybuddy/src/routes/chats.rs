//! AI chats API

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::resource::{self, created, item_json};
use super::{AppState, JsonBody};
use crate::error::{StudyError, StudyResult};
use crate::models::AiChat;
use crate::services::{ChatService, GenerateRequest};
use crate::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(rename = "userMessage", default)]
    pub user_message: String,
}

pub fn chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chats", get(resource::list::<AiChat>))
        .route("/chats/generate", post(start_chat))
        .route(
            "/chats/folder/{folder_id}",
            get(resource::list_by_folder::<AiChat>),
        )
        .route(
            "/chats/{id}",
            get(resource::get_one::<AiChat>).delete(resource::delete_one::<AiChat>),
        )
        .route("/chats/{id}/messages", post(send_message))
        .route("/chats/{id}/name", put(resource::rename::<AiChat>))
        .route("/chats/{id}/folder", put(resource::assign_folder::<AiChat>))
}

async fn start_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    if req.message().is_none() {
        return Err(StudyError::validation("userMessage is required"));
    }
    let chat: AiChat = state
        .generation()
        .create(&user, &state.config, &req)
        .await?;
    created(chat)
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> StudyResult<Json<Value>> {
    let chat = ChatService::new((*state.db).clone())
        .send_message(&state.generation(), &id, &user.user_id, &req.user_message)
        .await?;
    item_json(chat)
}
