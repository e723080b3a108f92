//! Flashcards API

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
use crate::error::StudyResult;
use crate::models::{Flashcard, FlashcardSession};
use crate::services::{GenerateRequest, SaveFlashcardsRequest, StudyService};
use crate::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct ReplaceCardsRequest {
    #[serde(rename = "studyCards", default)]
    pub study_cards: Vec<Flashcard>,
}

pub fn flashcard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/flashcards",
            get(resource::list::<FlashcardSession>).post(save_flashcards),
        )
        .route("/flashcards/generate", post(generate_flashcards))
        .route(
            "/flashcards/folder/{folder_id}",
            get(resource::list_by_folder::<FlashcardSession>),
        )
        .route(
            "/flashcards/{id}",
            get(resource::get_one::<FlashcardSession>)
                .delete(resource::delete_one::<FlashcardSession>),
        )
        .route(
            "/flashcards/{id}/name",
            put(resource::rename::<FlashcardSession>),
        )
        .route(
            "/flashcards/{id}/folder",
            put(resource::assign_folder::<FlashcardSession>),
        )
        .route("/flashcards/{id}/cards", put(replace_cards))
}

async fn save_flashcards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<SaveFlashcardsRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let session = StudyService::new((*state.db).clone())
        .save_flashcards(&user, &state.config, req)
        .await?;
    created(session)
}

async fn generate_flashcards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let session: FlashcardSession = state
        .generation()
        .create(&user, &state.config, &req)
        .await?;
    created(session)
}

async fn replace_cards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReplaceCardsRequest>,
) -> StudyResult<Json<Value>> {
    let session = StudyService::new((*state.db).clone())
        .replace_cards(&id, &user.user_id, req.study_cards)
        .await?;
    item_json(session)
}
