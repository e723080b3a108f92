//! Flashcard session model

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// One question/answer card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// Flashcard session document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSession {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    #[serde(default)]
    pub upload_id: Option<String>,
    pub study_session: String,
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for FlashcardSession {
    const COLLECTION: &'static str = collections::FLASHCARDS;
    const LABEL: &'static str = "Flashcard session";
    const NAME_FIELD: &'static str = "study_session";
    const SINGULAR: &'static str = "flashcard";
    const PLURAL: &'static str = "flashcards";

    type Response = FlashcardSessionResponse;

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

/// Flashcard session as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct FlashcardSessionResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "studySession")]
    pub study_session: String,
    #[serde(rename = "flashcardsJSON")]
    pub flashcards: Vec<Flashcard>,
    pub transcript: Option<String>,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<FlashcardSession> for FlashcardSessionResponse {
    fn from(s: FlashcardSession) -> Self {
        Self {
            id: oid_hex(&s.id),
            user_id: s.user_id,
            upload_id: s.upload_id,
            study_session: s.study_session,
            flashcards: s.flashcards,
            transcript: s.transcript,
            folder_id: s.folder_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
