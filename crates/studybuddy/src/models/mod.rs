//! Data models stored in MongoDB and their API representations

mod chat;
mod common;
mod flashcard;
mod folder;
mod quiz;
mod summary;
mod upload;

pub use chat::*;
pub use common::*;
pub use flashcard::*;
pub use folder::*;
pub use quiz::*;
pub use summary::*;
pub use upload::*;

use mongodb::bson::oid::ObjectId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Billing tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Free,
    Paid,
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Free => write!(f, "free"),
            AccountType::Paid => write!(f, "paid"),
        }
    }
}

/// A user-owned document living in its own collection.
///
/// Every query built from this trait filters on both `_id` and `user_id`.
pub trait OwnedResource:
    Serialize + DeserializeOwned + Unpin + Send + Sync + std::fmt::Debug + 'static
{
    /// MongoDB collection name
    const COLLECTION: &'static str;
    /// Human readable label used in error messages
    const LABEL: &'static str;
    /// Field holding the user-visible name (target of rename)
    const NAME_FIELD: &'static str;
    /// JSON key wrapping a single item in API responses
    const SINGULAR: &'static str;
    /// JSON key wrapping a list in API responses
    const PLURAL: &'static str;

    /// API representation
    type Response: Serialize + From<Self> + Send;

    fn id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);
    fn user_id(&self) -> &str;
}
