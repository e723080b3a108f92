//! Folder service for MongoDB

use chrono::Utc;
use mongodb::bson::{doc, Bson, Document};
use serde::Serialize;

use super::resource_store::ResourceStore;
use crate::db::{collections, MongoDb};
use crate::error::{StudyError, StudyResult};
use crate::models::{
    AiChat, ChatResponse, FlashcardSession, FlashcardSessionResponse, Folder, FolderResponse,
    MultipleChoiceQuiz, NameValidator, QuizResponse, Summary, SummaryResponse, Upload,
    UploadResponse,
};

const MAX_FOLDER_NAME_LEN: usize = 100;

/// Everything a user keeps in one folder
#[derive(Debug, Serialize)]
pub struct FolderContents {
    pub folder: FolderResponse,
    pub uploads: Vec<UploadResponse>,
    pub flashcards: Vec<FlashcardSessionResponse>,
    pub quizzes: Vec<QuizResponse>,
    pub summaries: Vec<SummaryResponse>,
    pub chats: Vec<ChatResponse>,
}

pub struct FolderService {
    db: MongoDb,
    store: ResourceStore<Folder>,
}

impl FolderService {
    pub fn new(db: MongoDb) -> Self {
        Self {
            store: ResourceStore::new(db.clone()),
            db,
        }
    }

    fn validate_name(name: &str) -> StudyResult<String> {
        let name = NameValidator::validate(name).map_err(StudyError::Validation)?;
        if name.chars().count() > MAX_FOLDER_NAME_LEN {
            return Err(StudyError::validation(format!(
                "Folder name must be {} characters or less",
                MAX_FOLDER_NAME_LEN
            )));
        }
        Ok(name)
    }

    pub async fn create(&self, user_id: &str, folder_name: &str) -> StudyResult<Folder> {
        let folder_name = Self::validate_name(folder_name)?;
        let now = Utc::now();
        let folder = Folder {
            id: None,
            user_id: user_id.to_string(),
            folder_name,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(folder).await
    }

    pub async fn rename(&self, folder_id: &str, user_id: &str, name: &str) -> StudyResult<Folder> {
        let name = Self::validate_name(name)?;
        self.store.rename(folder_id, user_id, &name).await
    }

    /// Normalise an optional folder reference from a request body.
    /// Empty means none; anything else must be a folder owned by `user_id`.
    pub async fn resolve(
        &self,
        folder_id: Option<&str>,
        user_id: &str,
    ) -> StudyResult<Option<String>> {
        match folder_id.map(str::trim).filter(|f| !f.is_empty()) {
            Some(fid) => {
                let folder = self.store.find_owned(fid, user_id).await?;
                Ok(folder.id.map(|id| id.to_hex()))
            }
            None => Ok(None),
        }
    }

    /// Hard delete the folder and unassign every resource that referenced it
    pub async fn delete(&self, folder_id: &str, user_id: &str) -> StudyResult<()> {
        let folder = self.store.find_owned(folder_id, user_id).await?;
        let folder_hex = folder.id.map(|id| id.to_hex()).unwrap_or_default();
        self.store.delete(&folder_hex, user_id).await?;

        let now = bson::DateTime::from_chrono(Utc::now());
        for name in collections::RESOURCES {
            let result = self
                .db
                .collection::<Document>(name)
                .update_many(
                    doc! { "user_id": user_id, "folder_id": &folder_hex },
                    doc! { "$set": { "folder_id": Bson::Null, "updated_at": now } },
                    None,
                )
                .await?;
            if result.modified_count > 0 {
                tracing::debug!(
                    collection = name,
                    "Unassigned {} documents from deleted folder",
                    result.modified_count
                );
            }
        }
        Ok(())
    }

    /// All resources of the user in this folder
    pub async fn contents(&self, folder_id: &str, user_id: &str) -> StudyResult<FolderContents> {
        let folder = self.store.find_owned(folder_id, user_id).await?;
        let fid = folder.id.map(|id| id.to_hex()).unwrap_or_default();

        let uploads = ResourceStore::<Upload>::new(self.db.clone())
            .list_by_folder(user_id, &fid)
            .await?;
        let flashcards = ResourceStore::<FlashcardSession>::new(self.db.clone())
            .list_by_folder(user_id, &fid)
            .await?;
        let quizzes = ResourceStore::<MultipleChoiceQuiz>::new(self.db.clone())
            .list_by_folder(user_id, &fid)
            .await?;
        let summaries = ResourceStore::<Summary>::new(self.db.clone())
            .list_by_folder(user_id, &fid)
            .await?;
        let chats = ResourceStore::<AiChat>::new(self.db.clone())
            .list_by_folder(user_id, &fid)
            .await?;

        Ok(FolderContents {
            folder: folder.into(),
            uploads: uploads.into_iter().map(Into::into).collect(),
            flashcards: flashcards.into_iter().map(Into::into).collect(),
            quizzes: quizzes.into_iter().map(Into::into).collect(),
            summaries: summaries.into_iter().map(Into::into).collect(),
            chats: chats.into_iter().map(Into::into).collect(),
        })
    }
}
