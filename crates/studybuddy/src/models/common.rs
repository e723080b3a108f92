//! Shared helpers for models

use mongodb::bson::oid::ObjectId;

/// Hex string of an optional ObjectId, empty when unset
pub fn oid_hex(id: &Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

/// Validator for user supplied names (sessions, quizzes, folders...)
pub struct NameValidator;

impl NameValidator {
    pub const MAX_LEN: usize = 200;

    /// Validate and normalise a name. Returns the trimmed value.
    pub fn validate(name: &str) -> Result<String, String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(format!(
                "Name must be {} characters or less",
                Self::MAX_LEN
            ));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err("Name contains control characters".to_string());
        }
        Ok(trimmed.to_string())
    }
}
