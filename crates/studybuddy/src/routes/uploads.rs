//! Uploads API

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        DefaultBodyLimit, Extension, Multipart, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::resource::{self, created};
use super::{AppState, JsonBody};
use crate::error::{StudyError, StudyResult};
use crate::models::{FileType, Upload};
use crate::services::{IncomingFile, UploadService};
use crate::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct TextUploadRequest {
    #[serde(default)]
    pub transcript: String,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

/// Room for multipart framing and the small form fields next to the file
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;
/// Longest `folderID` form field accepted
const MAX_FOLDER_ID_BYTES: usize = 64;

pub fn upload_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/uploads",
            get(resource::list::<Upload>)
                .post(upload_file)
                // The file field is also capped while streaming
                .layer(DefaultBodyLimit::max(
                    max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
                )),
        )
        .route("/uploads/text", post(upload_text))
        .route(
            "/uploads/folder/{folder_id}",
            get(resource::list_by_folder::<Upload>),
        )
        .route(
            "/uploads/{id}",
            get(resource::get_one::<Upload>).delete(resource::delete_one::<Upload>),
        )
        .route(
            "/uploads/{id}/folder",
            put(resource::assign_folder::<Upload>),
        )
}

/// Keep only the final path component of a client supplied file name
fn clean_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

/// Read a short text field, failing once it passes `max_bytes`
async fn read_short_field(
    field: &mut Field<'_>,
    name: &str,
    max_bytes: usize,
) -> StudyResult<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| StudyError::validation(e.body_text()))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(StudyError::validation(format!("{} is too long", name)));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes)
        .map_err(|_| StudyError::validation(format!("{} must be valid UTF-8", name)))
}

/// Read the multipart body, rejecting the file as soon as it passes `max_bytes`
async fn read_upload_form(
    mut multipart: Multipart,
    max_bytes: usize,
) -> StudyResult<(Option<IncomingFile>, Option<String>)> {
    let mut file: Option<IncomingFile> = None;
    let mut folder_id: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| StudyError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = clean_file_name(field.file_name().unwrap_or(""));
                let content_type = field
                    .content_type()
                    .filter(|ct| *ct != "application/octet-stream")
                    .map(|ct| ct.to_string())
                    .or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first()
                            .map(|m| m.essence_str().to_string())
                    });

                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| StudyError::validation(e.body_text()))?
                {
                    if bytes.len() + chunk.len() > max_bytes {
                        tracing::warn!(file_name = %file_name, "Rejected oversize upload");
                        return Err(StudyError::validation(format!(
                            "File exceeds the {} MB limit",
                            max_bytes / (1024 * 1024)
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                file = Some(IncomingFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "folderID" => {
                let text =
                    read_short_field(&mut field, "folderID", MAX_FOLDER_ID_BYTES).await?;
                let text = text.trim();
                if !text.is_empty() && text != "null" {
                    folder_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    Ok((file, folder_id))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let multipart = multipart.map_err(|e| StudyError::validation(e.body_text()))?;
    let (file, folder_id) = read_upload_form(multipart, state.config.max_upload_bytes).await?;

    let file = file.ok_or_else(|| StudyError::validation("No file uploaded"))?;
    if file.bytes.is_empty() {
        return Err(StudyError::validation("Uploaded file is empty"));
    }
    // Reject unsupported types before touching the database
    file.file_type()?;

    let upload = UploadService::new((*state.db).clone())
        .create_from_file(&user, &state.config, file, folder_id.as_deref())
        .await?;
    created(upload)
}

async fn upload_text(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<TextUploadRequest>,
) -> StudyResult<(StatusCode, Json<Value>)> {
    let upload = UploadService::new((*state.db).clone())
        .create_from_text(
            &user,
            &state.config,
            req.file_name.as_deref(),
            FileType::Text,
            &req.transcript,
            req.folder_id.as_deref(),
        )
        .await?;
    created(upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_file_name() {
        assert_eq!(clean_file_name("notes.pdf"), "notes.pdf");
        assert_eq!(clean_file_name("C:\\Users\\me\\notes.docx"), "notes.docx");
        assert_eq!(clean_file_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_file_name(""), "upload");
    }
}
