//! Upload service: turns files and pasted text into stored transcripts

use chrono::Utc;

use super::extract::extract_text;
use super::folder_service::FolderService;
use super::resource_store::ResourceStore;
use crate::config::StudyConfig;
use crate::db::MongoDb;
use crate::error::{StudyError, StudyResult};
use crate::models::{FileType, NameValidator, Upload};
use crate::AuthenticatedUser;

const PASTED_TEXT_NAME: &str = "Pasted text";

/// A file received from the client, fully buffered in memory
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    /// Resolve the file type from the extension, falling back to the MIME type
    pub fn file_type(&self) -> StudyResult<FileType> {
        let by_ext = std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FileType::from_extension);
        by_ext
            .or_else(|| self.content_type.as_deref().and_then(FileType::from_mime))
            .ok_or_else(|| {
                StudyError::validation("Unsupported file type. Upload a PDF, DOC, DOCX or TXT file")
            })
    }
}

pub struct UploadService {
    store: ResourceStore<Upload>,
    folders: FolderService,
}

impl UploadService {
    pub fn new(db: MongoDb) -> Self {
        Self {
            store: ResourceStore::new(db.clone()),
            folders: FolderService::new(db),
        }
    }

    /// Extract a file's text and store it as a new upload
    pub async fn create_from_file(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        file: IncomingFile,
        folder_id: Option<&str>,
    ) -> StudyResult<Upload> {
        if file.bytes.len() > config.max_upload_bytes {
            return Err(StudyError::validation(format!(
                "File exceeds the {} MB limit",
                config.max_upload_bytes / (1024 * 1024)
            )));
        }
        let file_type = file.file_type()?;
        let folder_id = self.folders.resolve(folder_id, &user.user_id).await?;
        self.store.ensure_quota(user, config).await?;

        let IncomingFile {
            file_name, bytes, ..
        } = file;
        let size = bytes.len();
        let transcript = tokio::task::spawn_blocking(move || extract_text(file_type, &bytes))
            .await
            .map_err(|e| StudyError::Extraction(format!("Extraction task failed: {}", e)))??;
        if transcript.is_empty() {
            return Err(StudyError::validation(
                "No text could be extracted from the file",
            ));
        }
        tracing::info!(
            file_type = ?file_type,
            size,
            chars = transcript.len(),
            "Extracted upload text"
        );

        self.insert(user, file_name, file_type, transcript, folder_id)
            .await
    }

    /// Store pasted text, or text fetched from another source, as an upload
    pub async fn create_from_text(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        file_name: Option<&str>,
        file_type: FileType,
        transcript: &str,
        folder_id: Option<&str>,
    ) -> StudyResult<Upload> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(StudyError::validation("transcript is required"));
        }
        let file_name = match file_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => NameValidator::validate(name).map_err(StudyError::Validation)?,
            None => PASTED_TEXT_NAME.to_string(),
        };
        let folder_id = self.folders.resolve(folder_id, &user.user_id).await?;
        self.store.ensure_quota(user, config).await?;

        self.insert(user, file_name, file_type, transcript.to_string(), folder_id)
            .await
    }

    async fn insert(
        &self,
        user: &AuthenticatedUser,
        file_name: String,
        file_type: FileType,
        transcript: String,
        folder_id: Option<String>,
    ) -> StudyResult<Upload> {
        let now = Utc::now();
        self.store
            .insert(Upload {
                id: None,
                user_id: user.user_id.clone(),
                file_name,
                file_type,
                transcript,
                folder_id,
                created_at: now,
                updated_at: now,
            })
            .await
    }
}
