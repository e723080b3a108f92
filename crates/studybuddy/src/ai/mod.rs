//! AI generation: OpenAI client, prompts and model-output parsing
//!
//! Flashcards, quizzes, summaries and chat answers all go through the same
//! path: build a prompt around the transcript, make one chat-completion call,
//! strip a code fence, parse JSON and validate the shape for the kind.

mod client;
mod generator;
mod output;
mod prompts;

pub use client::{
    build_http_client, ChatModel, CompletionRequest, OpenAiClient, PromptMessage,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_OPENAI_URL,
};
pub use generator::Generator;
pub use output::{
    parse_model_output, strip_code_fence, ChatReplyShape, FlashcardsShape, GeneratedShape,
    ModelOutputError, QuizShape, SummaryShape,
};
pub use prompts::{build_system_prompt, GenerationKind};
