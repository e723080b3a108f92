//! Summary model

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// Summary document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    #[serde(default)]
    pub upload_id: Option<String>,
    pub summary_name: String,
    pub summary: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Summary {
    const COLLECTION: &'static str = collections::SUMMARIES;
    const LABEL: &'static str = "Summary";
    const NAME_FIELD: &'static str = "summary_name";
    const SINGULAR: &'static str = "summary";
    const PLURAL: &'static str = "summaries";

    type Response = SummaryResponse;

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

/// Summary as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "summaryName")]
    pub summary_name: String,
    pub summary: String,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Summary> for SummaryResponse {
    fn from(s: Summary) -> Self {
        Self {
            id: oid_hex(&s.id),
            user_id: s.user_id,
            upload_id: s.upload_id,
            summary_name: s.summary_name,
            summary: s.summary,
            folder_id: s.folder_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
