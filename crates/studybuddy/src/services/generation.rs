//! Generation of study resources from an upload's transcript

use chrono::Utc;
use serde::Deserialize;

use super::folder_service::FolderService;
use super::resource_store::ResourceStore;
use crate::ai::{
    ChatReplyShape, FlashcardsShape, GeneratedShape, Generator, QuizShape, SummaryShape,
};
use crate::config::StudyConfig;
use crate::db::MongoDb;
use crate::error::{StudyError, StudyResult};
use crate::models::{
    AiChat, ChatMessage, FlashcardSession, MultipleChoiceQuiz, OwnedResource, Summary, Upload,
};
use crate::AuthenticatedUser;

/// Body of every `/generate` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(rename = "uploadId", default)]
    pub upload_id: String,
    #[serde(rename = "userMessage", default)]
    pub user_message: Option<String>,
    #[serde(rename = "folderID", default)]
    pub folder_id: Option<String>,
}

impl GenerateRequest {
    pub fn validate(&self) -> StudyResult<()> {
        if self.upload_id.trim().is_empty() {
            return Err(StudyError::validation("uploadId is required"));
        }
        Ok(())
    }

    /// The user's message, if it has any content
    pub fn message(&self) -> Option<&str> {
        self.user_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// What a new generated document is stamped with
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub user_id: &'a str,
    pub upload: &'a Upload,
    pub folder_id: Option<String>,
    pub user_message: Option<&'a str>,
}

impl GenerationContext<'_> {
    fn upload_id(&self) -> String {
        self.upload.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// A stored resource built from one validated model output
pub trait GeneratedResource: OwnedResource {
    type Shape: GeneratedShape;

    fn from_generation(shape: Self::Shape, ctx: &GenerationContext<'_>) -> Self;
}

impl GeneratedResource for FlashcardSession {
    type Shape = FlashcardsShape;

    fn from_generation(shape: FlashcardsShape, ctx: &GenerationContext<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: ctx.user_id.to_string(),
            upload_id: Some(ctx.upload_id()),
            study_session: shape.session_name,
            flashcards: shape.cards,
            transcript: Some(ctx.upload.transcript.clone()),
            folder_id: ctx.folder_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl GeneratedResource for MultipleChoiceQuiz {
    type Shape = QuizShape;

    fn from_generation(shape: QuizShape, ctx: &GenerationContext<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: ctx.user_id.to_string(),
            upload_id: Some(ctx.upload_id()),
            quiz_name: shape.quiz_name,
            questions: shape.questions,
            folder_id: ctx.folder_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl GeneratedResource for Summary {
    type Shape = SummaryShape;

    fn from_generation(shape: SummaryShape, ctx: &GenerationContext<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: ctx.user_id.to_string(),
            upload_id: Some(ctx.upload_id()),
            summary_name: shape.summary_name,
            summary: shape.summary,
            folder_id: ctx.folder_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl GeneratedResource for AiChat {
    type Shape = ChatReplyShape;

    fn from_generation(shape: ChatReplyShape, ctx: &GenerationContext<'_>) -> Self {
        let now = Utc::now();
        let mut messages = Vec::with_capacity(2);
        if let Some(message) = ctx.user_message {
            messages.push(ChatMessage::user(message));
        }
        messages.push(ChatMessage::assistant(shape.answer));
        Self {
            id: None,
            user_id: ctx.user_id.to_string(),
            upload_id: ctx.upload_id(),
            chat_name: shape.title,
            messages,
            folder_id: ctx.folder_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

pub struct GenerationService {
    db: MongoDb,
    generator: Option<Generator>,
}

impl GenerationService {
    pub fn new(db: MongoDb, generator: Option<Generator>) -> Self {
        Self { db, generator }
    }

    /// The configured generator, or an error when no model is available.
    /// Checked before any database access.
    pub fn generator(&self) -> StudyResult<&Generator> {
        self.generator
            .as_ref()
            .ok_or_else(|| StudyError::NotConfigured("OPENAI_API_KEY is not set".to_string()))
    }

    /// Generate and persist one `R` from the caller's upload.
    /// Nothing is written unless the model output validates.
    pub async fn create<R: GeneratedResource>(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
        request: &GenerateRequest,
    ) -> StudyResult<R> {
        request.validate()?;
        let generator = self.generator()?;

        let upload = ResourceStore::<Upload>::new(self.db.clone())
            .find_owned(&request.upload_id, &user.user_id)
            .await?;
        let folder_id = FolderService::new(self.db.clone())
            .resolve(request.folder_id.as_deref(), &user.user_id)
            .await?;
        let store = ResourceStore::<R>::new(self.db.clone());
        store.ensure_quota(user, config).await?;

        let user_message = request.message();
        let shape: R::Shape = generator
            .generate(&upload.transcript, &[], user_message)
            .await?;

        let ctx = GenerationContext {
            user_id: &user.user_id,
            upload: &upload,
            folder_id,
            user_message,
        };
        store.insert(R::from_generation(shape, &ctx)).await
    }
}
