//! Services module - business logic layer over MongoDB

pub mod chat_service;
pub mod extract;
pub mod folder_service;
pub mod generation;
pub mod resource_store;
pub mod study_service;
pub mod upload_service;

pub use chat_service::ChatService;
pub use extract::extract_text;
pub use folder_service::{FolderContents, FolderService};
pub use generation::{GenerateRequest, GeneratedResource, GenerationContext, GenerationService};
pub use resource_store::{parse_object_id, ResourceStore};
pub use study_service::{SaveFlashcardsRequest, SaveQuizRequest, SaveSummaryRequest, StudyService};
pub use upload_service::{IncomingFile, UploadService};
