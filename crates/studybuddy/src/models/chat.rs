//! AI chat model

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// AI chat document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub upload_id: String,
    pub chat_name: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for AiChat {
    const COLLECTION: &'static str = collections::CHATS;
    const LABEL: &'static str = "Chat";
    const NAME_FIELD: &'static str = "chat_name";
    const SINGULAR: &'static str = "chat";
    const PLURAL: &'static str = "chats";

    type Response = ChatResponse;

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

/// Chat turn as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub role: ChatRole,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Chat as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    #[serde(rename = "chatName")]
    pub chat_name: String,
    #[serde(rename = "messagesJSON")]
    pub messages: Vec<ChatMessageResponse>,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<AiChat> for ChatResponse {
    fn from(c: AiChat) -> Self {
        Self {
            id: oid_hex(&c.id),
            user_id: c.user_id,
            upload_id: c.upload_id,
            chat_name: c.chat_name,
            messages: c
                .messages
                .into_iter()
                .map(|m| ChatMessageResponse {
                    role: m.role,
                    content: m.content,
                    created_at: m.created_at,
                })
                .collect(),
            folder_id: c.folder_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
