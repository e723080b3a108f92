//! HTTP routes for uploads, study resources and folders

pub mod chats;
pub mod flashcards;
pub mod folders;
pub mod quizzes;
pub mod resource;
pub mod summaries;
pub mod uploads;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::Router;
use std::sync::Arc;

use crate::ai::Generator;
use crate::config::StudyConfig;
use crate::db::MongoDb;
use crate::error::StudyError;
use crate::services::GenerationService;

/// State shared by every handler
pub struct AppState {
    pub db: Arc<MongoDb>,
    /// `None` when no OpenAI API key is configured
    pub generator: Option<Generator>,
    pub config: StudyConfig,
}

impl AppState {
    pub fn generation(&self) -> GenerationService {
        GenerationService::new((*self.db).clone(), self.generator.clone())
    }
}

/// JSON body extractor whose rejections render as `{error, code}` with 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(StudyError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for StudyError {
    fn from(rejection: JsonRejection) -> Self {
        StudyError::Validation(rejection.body_text())
    }
}

/// Configure all resource routes. Handlers expect an `AuthenticatedUser`
/// extension, so the caller must wrap this router in its auth layer.
pub fn configure(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(uploads::upload_routes(state.config.max_upload_bytes))
        .merge(flashcards::flashcard_routes())
        .merge(quizzes::quiz_routes())
        .merge(summaries::summary_routes())
        .merge(chats::chat_routes())
        .merge(folders::folder_routes())
        .with_state(state)
}
