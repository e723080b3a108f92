//! Upload model: source material for every generated resource

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// Where an upload's transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Doc,
    Docx,
    Txt,
    /// Pasted directly as text
    Text,
    /// Imported from a Notion page
    Notion,
}

impl FileType {
    /// Map a file extension (without dot, any case) to a supported type
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "doc" => Some(FileType::Doc),
            "docx" => Some(FileType::Docx),
            "txt" => Some(FileType::Txt),
            _ => None,
        }
    }

    /// Map a MIME type to a supported type
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(FileType::Pdf),
            "application/msword" => Some(FileType::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileType::Docx)
            }
            "text/plain" => Some(FileType::Txt),
            _ => None,
        }
    }
}

/// Upload document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub file_name: String,
    pub file_type: FileType,
    pub transcript: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Upload {
    const COLLECTION: &'static str = collections::UPLOADS;
    const LABEL: &'static str = "Upload";
    const NAME_FIELD: &'static str = "file_name";
    const SINGULAR: &'static str = "upload";
    const PLURAL: &'static str = "uploads";

    type Response = UploadResponse;

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Upload as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub file_type: FileType,
    pub transcript: String,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Upload> for UploadResponse {
    fn from(u: Upload) -> Self {
        Self {
            id: oid_hex(&u.id),
            user_id: u.user_id,
            file_name: u.file_name,
            file_type: u.file_type,
            transcript: u.transcript,
            folder_id: u.folder_id,
            created_at: u.created_at,
        }
    }
}
