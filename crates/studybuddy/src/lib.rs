//! StudyBuddy core
//!
//! Storage, AI generation and HTTP routes for the study-aid backend.
//!
//! # Features
//! - Document uploads with text extraction (PDF, DOCX, TXT)
//! - Flashcards, multiple-choice quizzes, summaries and chats generated
//!   from an upload's transcript through one shared generation helper
//! - Flat folders for organising a user's resources
//! - MongoDB persistence with per-user ownership checks on every access

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use config::StudyConfig;
pub use db::MongoDb;
pub use error::{StudyError, StudyResult};
pub use models::AccountType;

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub account_type: AccountType,
}

impl AuthenticatedUser {
    pub fn is_paid(&self) -> bool {
        self.account_type == AccountType::Paid
    }
}
