//! Shared generation helper: prompt, one completion call, parse, validate

use std::sync::Arc;

use super::client::{ChatModel, CompletionRequest, PromptMessage};
use super::output::{parse_model_output, GeneratedShape};
use super::prompts::build_system_prompt;
use crate::error::{StudyError, StudyResult};
use crate::models::ChatMessage;

/// Runs generation requests against a chat model
#[derive(Clone)]
pub struct Generator {
    model: Arc<dyn ChatModel>,
}

impl Generator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Generate `S` from `transcript`.
    ///
    /// `history` holds earlier chat turns and is empty for one-shot kinds.
    /// No retry is attempted when the output cannot be parsed or validated.
    pub async fn generate<S: GeneratedShape>(
        &self,
        transcript: &str,
        history: &[ChatMessage],
        user_message: Option<&str>,
    ) -> StudyResult<S> {
        let kind = S::KIND;
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::new(
            "system",
            build_system_prompt(kind, transcript),
        ));
        messages.extend(
            history
                .iter()
                .map(|m| PromptMessage::new(m.role.as_str(), m.content.clone())),
        );
        let request_text = user_message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| kind.default_request());
        messages.push(PromptMessage::new("user", request_text));

        let raw = self
            .model
            .complete(CompletionRequest {
                messages,
                temperature: kind.temperature(),
            })
            .await?;

        parse_model_output::<S>(&raw).map_err(|e| {
            tracing::warn!(kind = ?kind, "Unusable model output: {}", e);
            StudyError::from(e)
        })
    }
}
