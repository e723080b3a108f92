//! Folder model: flat, non-nested grouping of a user's resources

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// Folder document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub folder_name: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Folder {
    const COLLECTION: &'static str = collections::FOLDERS;
    const LABEL: &'static str = "Folder";
    const NAME_FIELD: &'static str = "folder_name";
    const SINGULAR: &'static str = "folder";
    const PLURAL: &'static str = "folders";

    type Response = FolderResponse;

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

/// Folder as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct FolderResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "folderName")]
    pub folder_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Folder> for FolderResponse {
    fn from(f: Folder) -> Self {
        Self {
            id: oid_hex(&f.id),
            user_id: f.user_id,
            folder_name: f.folder_name,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}
