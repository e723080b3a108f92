//! Multiple-choice quizzes API

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::resource::{self, created};
use super::{AppState, JsonBody};
use crate::error::StudyResult;
use crate::models::MultipleChoiceQuiz;
use crate::services::{GenerateRequest, SaveQuizRequest, StudyService};
use crate::AuthenticatedUser;

pub fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/quizzes",
            get(resource::list::<MultipleChoiceQuiz>).post(save_quiz),
        )
        .route("/quizzes/generate", post(generate_quiz))
        .route(
            "/quizzes/folder/{folder_id}",
            get(resource::list_by_folder::<MultipleChoiceQuiz>),
        )
        .route(
            "/quizzes/{id}",
            get(resource::get_one::<MultipleChoiceQuiz>)
                .delete(resource::delete_one::<MultipleChoiceQuiz>),
        )
        .route(
            "/quizzes/{id}/name",
            put(resource::rename::<MultipleChoiceQuiz>),
        )
        .route(
            "/quizzes/{id}/folder",
            put(resource::assign_folder::<MultipleChoiceQuiz>),
        )
}

async fn save_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<SaveQuizRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let quiz = StudyService::new((*state.db).clone())
        .save_quiz(&user, &state.config, req)
        .await?;
    created(quiz)
}

async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let quiz: MultipleChoiceQuiz = state
        .generation()
        .create(&user, &state.config, &req)
        .await?;
    created(quiz)
}
