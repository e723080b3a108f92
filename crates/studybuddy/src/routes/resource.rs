//! Handlers shared by every owned resource type

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{AppState, JsonBody};
use crate::error::{StudyError, StudyResult};
use crate::models::OwnedResource;
use crate::services::ResourceStore;
use crate::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignFolderRequest {
    /// `null`, missing or empty unassigns
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

impl AssignFolderRequest {
    pub fn target(&self) -> Option<&str> {
        self.folder_id
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

fn store<T: OwnedResource>(state: &AppState) -> ResourceStore<T> {
    ResourceStore::new((*state.db).clone())
}

/// `{ "<singular>": item }`
pub fn item_json<T: OwnedResource>(item: T) -> StudyResult<Json<Value>> {
    let mut body = Map::new();
    body.insert(
        T::SINGULAR.to_string(),
        serde_json::to_value(T::Response::from(item))?,
    );
    Ok(Json(Value::Object(body)))
}

/// `{ "<plural>": [items] }`
pub fn list_json<T: OwnedResource>(items: Vec<T>) -> StudyResult<Json<Value>> {
    let responses: Vec<T::Response> = items.into_iter().map(T::Response::from).collect();
    let mut body = Map::new();
    body.insert(T::PLURAL.to_string(), serde_json::to_value(responses)?);
    Ok(Json(Value::Object(body)))
}

/// 201 with `{ "<singular>": item }`
pub fn created<T: OwnedResource>(item: T) -> StudyResult<(StatusCode, Json<Value>)> {
    Ok((StatusCode::CREATED, item_json(item)?))
}

pub async fn list<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> StudyResult<Json<Value>> {
    let items = store::<T>(&state).list(&user.user_id).await?;
    list_json(items)
}

pub async fn get_one<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> StudyResult<Json<Value>> {
    let item = store::<T>(&state).find_owned(&id, &user.user_id).await?;
    item_json(item)
}

pub async fn list_by_folder<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(folder_id): Path<String>,
) -> StudyResult<Json<Value>> {
    // 404 for a folder the caller does not own, rather than an empty list
    let folder = store::<crate::models::Folder>(&state)
        .find_owned(&folder_id, &user.user_id)
        .await?;
    let fid = folder.id.map(|id| id.to_hex()).unwrap_or_default();
    let items = store::<T>(&state).list_by_folder(&user.user_id, &fid).await?;
    list_json(items)
}

pub async fn rename<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RenameRequest>,
) -> StudyResult<Json<Value>> {
    let name =
        crate::models::NameValidator::validate(&req.name).map_err(StudyError::Validation)?;
    let item = store::<T>(&state).rename(&id, &user.user_id, &name).await?;
    item_json(item)
}

pub async fn assign_folder<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignFolderRequest>,
) -> StudyResult<Json<Value>> {
    let item = store::<T>(&state)
        .assign_folder(&id, &user.user_id, req.target())
        .await?;
    item_json(item)
}

pub async fn delete_one<T: OwnedResource>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> StudyResult<Json<Value>> {
    store::<T>(&state).delete(&id, &user.user_id).await?;
    Ok(Json(serde_json::json!({ "message": format!("{} deleted", T::LABEL) })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Flashcard, FlashcardSession};
    use chrono::Utc;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_item_json_wraps_in_singular_key() {
        let id = ObjectId::new();
        let session = FlashcardSession {
            id: Some(id),
            user_id: "user-1".to_string(),
            upload_id: None,
            study_session: "Bio".to_string(),
            flashcards: vec![Flashcard {
                question: "Q".to_string(),
                answer: "A".to_string(),
            }],
            transcript: Some("T".to_string()),
            folder_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let Json(body) = item_json(session.clone()).unwrap();
        assert_eq!(body["flashcard"]["id"], id.to_hex());
        assert_eq!(body["flashcard"]["studySession"], "Bio");
        assert_eq!(body["flashcard"]["flashcardsJSON"][0]["answer"], "A");
        assert!(body["flashcard"]["folderID"].is_null());

        let Json(list) = list_json(vec![session]).unwrap();
        assert_eq!(list["flashcards"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_assign_folder_target() {
        let req: AssignFolderRequest = serde_json::from_str(r#"{"folderID": null}"#).unwrap();
        assert_eq!(req.target(), None);
        let req: AssignFolderRequest = serde_json::from_str(r#"{"folderID": " "}"#).unwrap();
        assert_eq!(req.target(), None);
        let req: AssignFolderRequest = serde_json::from_str(r#"{"folderID": "abc"}"#).unwrap();
        assert_eq!(req.target(), Some("abc"));
    }
}
