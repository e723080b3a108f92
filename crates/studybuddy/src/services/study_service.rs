//! Manually saved study resources: flashcards, quizzes and summaries

use chrono::Utc;
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use validator::Validate;

use super::folder_service::FolderService;
use super::resource_store::ResourceStore;
use crate::config::StudyConfig;
use crate::db::MongoDb;
use crate::error::{StudyError, StudyResult};
use crate::models::{
    Flashcard, FlashcardSession, MultipleChoiceQuiz, NameValidator, OwnedResource, QuizQuestion,
    Summary, Upload,
};
use crate::AuthenticatedUser;

/// Body of `POST /api/flashcards`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveFlashcardsRequest {
    #[serde(rename = "sessionName", default)]
    pub session_name: String,
    #[serde(rename = "studyCards", default)]
    #[validate(length(min = 1, message = "studyCards must contain at least one card"))]
    pub study_cards: Vec<Flashcard>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(rename = "uploadId", default)]
    pub upload_id: Option<String>,
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

/// Body of `POST /api/quizzes`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveQuizRequest {
    #[serde(rename = "quizName", default)]
    pub quiz_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "questions must contain at least one question"))]
    pub questions: Vec<QuizQuestion>,
    #[serde(rename = "uploadId", default)]
    pub upload_id: Option<String>,
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

/// Body of `POST /api/summaries`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveSummaryRequest {
    #[serde(rename = "summaryName", default)]
    pub summary_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "summary is required"))]
    pub summary: String,
    #[serde(rename = "uploadId", default)]
    pub upload_id: Option<String>,
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

fn check<V: Validate>(request: &V) -> StudyResult<()> {
    request.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| e.to_string());
        StudyError::Validation(message)
    })
}

fn required_name(name: &str, field: &str) -> StudyResult<String> {
    NameValidator::validate(name).map_err(|e| StudyError::validation(format!("{}: {}", field, e)))
}

fn check_cards(cards: &[Flashcard]) -> StudyResult<()> {
    for (i, card) in cards.iter().enumerate() {
        if card.question.trim().is_empty() || card.answer.trim().is_empty() {
            return Err(StudyError::validation(format!(
                "studyCards[{}] needs a question and an answer",
                i
            )));
        }
    }
    Ok(())
}

pub struct StudyService {
    db: MongoDb,
    folders: FolderService,
}

impl StudyService {
    pub fn new(db: MongoDb) -> Self {
        Self {
            folders: FolderService::new(db.clone()),
            db,
        }
    }

    /// Optional upload reference: must be owned by the caller when given
    async fn resolve_upload(
        &self,
        upload_id: Option<&str>,
        user_id: &str,
    ) -> StudyResult<Option<String>> {
        match upload_id.map(str::trim).filter(|u| !u.is_empty()) {
            Some(uid) => {
                let upload = ResourceStore::<Upload>::new(self.db.clone())
                    .find_owned(uid, user_id)
                    .await?;
                Ok(upload.id.map(|id| id.to_hex()))
            }
            None => Ok(None),
        }
    }

    /// Insert `item` after the quota check shared by every manual save
    async fn save<T: OwnedResource>(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        item: T,
    ) -> StudyResult<T> {
        let store = ResourceStore::<T>::new(self.db.clone());
        store.ensure_quota(user, config).await?;
        store.insert(item).await
    }

    pub async fn save_flashcards(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        request: SaveFlashcardsRequest,
    ) -> StudyResult<FlashcardSession> {
        let study_session = required_name(&request.session_name, "sessionName")?;
        check(&request)?;
        check_cards(&request.study_cards)?;

        let upload_id = self
            .resolve_upload(request.upload_id.as_deref(), &user.user_id)
            .await?;
        let folder_id = self
            .folders
            .resolve(request.folder_id.as_deref(), &user.user_id)
            .await?;

        let now = Utc::now();
        let session = FlashcardSession {
            id: None,
            user_id: user.user_id.clone(),
            upload_id,
            study_session,
            flashcards: request.study_cards,
            transcript: request.transcript,
            folder_id,
            created_at: now,
            updated_at: now,
        };
        self.save(user, config, session).await
    }

    /// Replace the card list of an owned flashcard session
    pub async fn replace_cards(
        &self,
        session_id: &str,
        user_id: &str,
        cards: Vec<Flashcard>,
    ) -> StudyResult<FlashcardSession> {
        if cards.is_empty() {
            return Err(StudyError::validation(
                "studyCards must contain at least one card",
            ));
        }
        check_cards(&cards)?;
        ResourceStore::<FlashcardSession>::new(self.db.clone())
            .update_fields(session_id, user_id, doc! { "flashcards": to_bson(&cards)? })
            .await
    }

    pub async fn save_quiz(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        request: SaveQuizRequest,
    ) -> StudyResult<MultipleChoiceQuiz> {
        let quiz_name = required_name(&request.quiz_name, "quizName")?;
        check(&request)?;
        for (i, question) in request.questions.iter().enumerate() {
            question
                .check()
                .map_err(|e| StudyError::validation(format!("questions[{}]: {}", i, e)))?;
        }

        let upload_id = self
            .resolve_upload(request.upload_id.as_deref(), &user.user_id)
            .await?;
        let folder_id = self
            .folders
            .resolve(request.folder_id.as_deref(), &user.user_id)
            .await?;

        let now = Utc::now();
        let quiz = MultipleChoiceQuiz {
            id: None,
            user_id: user.user_id.clone(),
            upload_id,
            quiz_name,
            questions: request.questions,
            folder_id,
            created_at: now,
            updated_at: now,
        };
        self.save(user, config, quiz).await
    }

    pub async fn save_summary(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        request: SaveSummaryRequest,
    ) -> StudyResult<Summary> {
        let summary_name = required_name(&request.summary_name, "summaryName")?;
        check(&request)?;
        if request.summary.trim().is_empty() {
            return Err(StudyError::validation("summary is required"));
        }

        let upload_id = self
            .resolve_upload(request.upload_id.as_deref(), &user.user_id)
            .await?;
        let folder_id = self
            .folders
            .resolve(request.folder_id.as_deref(), &user.user_id)
            .await?;

        let now = Utc::now();
        let summary = Summary {
            id: None,
            user_id: user.user_id.clone(),
            upload_id,
            summary_name,
            summary: request.summary,
            folder_id,
            created_at: now,
            updated_at: now,
        };
        self.save(user, config, summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_request_checks() {
        let request: SaveFlashcardsRequest =
            serde_json::from_str(r#"{"sessionName": "Bio", "studyCards": []}"#).unwrap();
        let err = check(&request).unwrap_err();
        assert!(matches!(err, StudyError::Validation(ref m) if m.contains("studyCards")));

        let err = required_name("  ", "sessionName").unwrap_err();
        assert!(matches!(err, StudyError::Validation(ref m) if m.starts_with("sessionName")));

        let blank = vec![Flashcard {
            question: "Q".to_string(),
            answer: " ".to_string(),
        }];
        assert!(check_cards(&blank).is_err());
    }

    #[test]
    fn test_summary_request_checks() {
        let request: SaveSummaryRequest =
            serde_json::from_str(r#"{"summaryName": "Week 1"}"#).unwrap();
        assert!(check(&request).is_err());

        let request: SaveSummaryRequest =
            serde_json::from_str(r#"{"summaryName": "Week 1", "summary": "Cells."}"#).unwrap();
        assert!(check(&request).is_ok());
    }
}
