//! Notion connection and page import routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use studybuddy::models::{FileType, NameValidator};
use studybuddy::routes::resource::created;
use studybuddy::routes::JsonBody;
use studybuddy::services::UploadService;
use studybuddy::{AuthenticatedUser, StudyError, StudyResult};

use super::client::{parse_page_id, NotionClient, NotionPage};
use crate::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(rename = "pageId", default)]
    pub page_id: String,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
}

pub fn notion_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notion/auth-url", get(auth_url))
        .route("/notion/callback", post(callback))
        .route("/notion/pages", get(list_pages))
        .route("/notion/import", post(import_page))
}

fn notion(state: &AppState) -> StudyResult<&NotionClient> {
    state
        .notion
        .as_ref()
        .ok_or_else(|| StudyError::NotConfigured("Notion OAuth client is not set".to_string()))
}

/// Stored access token of the caller; 400 when Notion is not connected
async fn access_token(state: &AppState, user_id: &str) -> StudyResult<String> {
    AuthService::new((*state.db).clone())
        .find_by_id(user_id)
        .await?
        .notion_access_token
        .ok_or_else(|| StudyError::validation("Notion is not connected"))
}

async fn auth_url(State(state): State<Arc<AppState>>) -> StudyResult<Json<Value>> {
    let url = notion(&state)?.authorize_url()?;
    Ok(Json(json!({ "url": url })))
}

async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(request): JsonBody<CallbackRequest>,
) -> StudyResult<Json<Value>> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(StudyError::validation("code is required"));
    }
    let token = notion(&state)?.exchange_code(code).await?;

    AuthService::new((*state.db).clone())
        .set_notion_connection(
            &user.user_id,
            &token.access_token,
            token.workspace_name.as_deref(),
        )
        .await?;

    tracing::info!(user_id = %user.user_id, "Notion connected");
    Ok(Json(json!({
        "connected": true,
        "workspaceName": token.workspace_name,
    })))
}

async fn list_pages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> StudyResult<Json<Vec<NotionPage>>> {
    let client = notion(&state)?;
    let token = access_token(&state, &user.user_id).await?;
    Ok(Json(client.search_pages(&token).await?))
}

/// Page title usable as an upload name: control characters become spaces
fn import_title(raw: &str) -> String {
    let title: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(NameValidator::MAX_LEN)
        .collect();
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

/// Fetch a page's text and store it as an upload
async fn import_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(request): JsonBody<ImportRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    if request.page_id.trim().is_empty() {
        return Err(StudyError::validation("pageId is required"));
    }
    let page_id = parse_page_id(&request.page_id)?;
    let client = notion(&state)?;
    let token = access_token(&state, &user.user_id).await?;

    let title = import_title(&client.page_title(&token, &page_id).await?);
    let text = client.page_text(&token, &page_id).await?;
    if text.trim().is_empty() {
        return Err(StudyError::validation("Notion page has no text content"));
    }

    let upload = UploadService::new((*state.db).clone())
        .create_from_text(
            &user,
            &state.study.config,
            Some(&title),
            FileType::Notion,
            &text,
            request.folder_id.as_deref(),
        )
        .await?;

    tracing::info!(user_id = %user.user_id, page_id = %page_id, "Notion page imported");
    created(upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_title_replaces_control_characters() {
        let title = import_title("Lecture 3\n\tCell\u{0007}biology ");
        assert_eq!(title, "Lecture 3 Cell biology");
        assert!(NameValidator::validate(&title).is_ok());
    }

    #[test]
    fn test_import_title_fallback_and_length() {
        assert_eq!(import_title("\r\n"), "Untitled");
        let long = "a".repeat(NameValidator::MAX_LEN + 10);
        assert_eq!(import_title(&long).chars().count(), NameValidator::MAX_LEN);
    }
}
