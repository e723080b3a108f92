//! Summaries API

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
use crate::models::Summary;
use crate::services::{GenerateRequest, SaveSummaryRequest, StudyService};
use crate::AuthenticatedUser;

pub fn summary_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/summaries",
            get(resource::list::<Summary>).post(save_summary),
        )
        .route("/summaries/generate", post(generate_summary))
        .route(
            "/summaries/folder/{folder_id}",
            get(resource::list_by_folder::<Summary>),
        )
        .route(
            "/summaries/{id}",
            get(resource::get_one::<Summary>).delete(resource::delete_one::<Summary>),
        )
        .route("/summaries/{id}/name", put(resource::rename::<Summary>))
        .route(
            "/summaries/{id}/folder",
            put(resource::assign_folder::<Summary>),
        )
}

async fn save_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<SaveSummaryRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let summary = StudyService::new((*state.db).clone())
        .save_summary(&user, &state.config, req)
        .await?;
    created(summary)
}

async fn generate_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let summary: Summary = state
        .generation()
        .create(&user, &state.config, &req)
        .await?;
    created(summary)
}
