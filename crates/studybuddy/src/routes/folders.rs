//! Folders API

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::resource::{self, created, item_json};
use super::{AppState, JsonBody};
use crate::error::StudyResult;
use crate::models::Folder;
use crate::services::{FolderContents, FolderService};
use crate::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct FolderNameRequest {
    #[serde(rename = "folderName", default)]
    pub folder_name: String,
}

pub fn folder_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/folders",
            get(resource::list::<Folder>).post(create_folder),
        )
        .route(
            "/folders/{id}",
            get(resource::get_one::<Folder>)
                .put(rename_folder)
                .delete(delete_folder),
        )
        .route("/folders/{id}/contents", get(folder_contents))
}

async fn create_folder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<FolderNameRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let folder = FolderService::new((*state.db).clone())
        .create(&user.user_id, &req.folder_name)
        .await?;
    created(folder)
}

async fn rename_folder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<FolderNameRequest>,
) -> StudyResult<Json<Value>> {
    let folder = FolderService::new((*state.db).clone())
        .rename(&id, &user.user_id, &req.folder_name)
        .await?;
    item_json(folder)
}

async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> StudyResult<Json<Value>> {
    FolderService::new((*state.db).clone())
        .delete(&id, &user.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Folder deleted" })))
}

async fn folder_contents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> StudyResult<Json<FolderContents>> {
    let contents = FolderService::new((*state.db).clone())
        .contents(&id, &user.user_id)
        .await?;
    Ok(Json(contents))
}
