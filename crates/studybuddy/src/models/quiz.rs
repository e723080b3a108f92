//! Multiple-choice quiz model

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{oid_hex, OwnedResource};
use crate::db::collections;

/// One multiple-choice question. `answer` is one of `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    /// Check the structural rules a stored question must satisfy
    pub fn check(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question must not be empty".to_string());
        }
        if self.options.len() < 2 {
            return Err("a question needs at least two options".to_string());
        }
        if !self.options.iter().any(|o| o == &self.answer) {
            return Err(format!(
                "answer '{}' is not one of the options",
                self.answer
            ));
        }
        Ok(())
    }
}

/// Multiple-choice quiz document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceQuiz {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    #[serde(default)]
    pub upload_id: Option<String>,
    pub quiz_name: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for MultipleChoiceQuiz {
    const COLLECTION: &'static str = collections::QUIZZES;
    const LABEL: &'static str = "Quiz";
    const NAME_FIELD: &'static str = "quiz_name";
    const SINGULAR: &'static str = "quiz";
    const PLURAL: &'static str = "quizzes";

    type Response = QuizResponse;

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

/// Quiz as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "quizName")]
    pub quiz_name: String,
    #[serde(rename = "questionsJSON")]
    pub questions: Vec<QuizQuestion>,
    #[serde(rename = "folderID")]
    pub folder_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<MultipleChoiceQuiz> for QuizResponse {
    fn from(q: MultipleChoiceQuiz) -> Self {
        Self {
            id: oid_hex(&q.id),
            user_id: q.user_id,
            upload_id: q.upload_id,
            quiz_name: q.quiz_name,
            questions: q.questions,
            folder_id: q.folder_id,
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], answer: &str) -> QuizQuestion {
        QuizQuestion {
            question: "What is 2 + 2?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            answer: answer.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_check_question() {
        assert!(question(&["3", "4"], "4").check().is_ok());
        assert!(question(&["4"], "4").check().is_err());
        assert!(question(&["3", "5"], "4").check().is_err());
    }
}
