//! Chat service: follow-up turns on an existing chat

use mongodb::bson::{doc, to_bson};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use super::generation::GenerationService;
use super::resource_store::{parse_object_id, ResourceStore};
use crate::ai::ChatReplyShape;
use crate::db::MongoDb;
use crate::error::{StudyError, StudyResult};
use crate::models::{AiChat, ChatMessage, OwnedResource, Upload};

pub struct ChatService {
    db: MongoDb,
    store: ResourceStore<AiChat>,
}

impl ChatService {
    pub fn new(db: MongoDb) -> Self {
        Self {
            store: ResourceStore::new(db.clone()),
            db,
        }
    }

    /// Append a user turn and the model's answer to an owned chat.
    ///
    /// The prompt carries the chat's earlier turns. Both turns are written in
    /// one update, and only after the answer validates.
    pub async fn send_message(
        &self,
        generation: &GenerationService,
        chat_id: &str,
        user_id: &str,
        user_message: &str,
    ) -> StudyResult<AiChat> {
        let user_message = user_message.trim();
        if user_message.is_empty() {
            return Err(StudyError::validation("userMessage is required"));
        }
        let generator = generation.generator()?;

        let chat = self.store.find_owned(chat_id, user_id).await?;
        let upload = ResourceStore::<Upload>::new(self.db.clone())
            .find_owned(&chat.upload_id, user_id)
            .await?;

        let reply: ChatReplyShape = generator
            .generate(&upload.transcript, &chat.messages, Some(user_message))
            .await?;

        let turns = vec![
            ChatMessage::user(user_message),
            ChatMessage::assistant(reply.answer),
        ];
        let oid = parse_object_id(chat_id, AiChat::LABEL)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .db
            .collection::<AiChat>(AiChat::COLLECTION)
            .find_one_and_update(
                doc! { "_id": oid, "user_id": user_id },
                doc! {
                    "$push": { "messages": { "$each": to_bson(&turns)? } },
                    "$set": { "updated_at": bson::DateTime::from_chrono(chrono::Utc::now()) },
                },
                options,
            )
            .await?
            .ok_or_else(|| StudyError::not_found(AiChat::LABEL))?;

        tracing::info!(chat_id, turns = updated.messages.len(), "Chat message answered");
        Ok(updated)
    }
}
