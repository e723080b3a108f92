//! Prompt templates for each generation kind

/// What is being generated from a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Flashcards,
    Quiz,
    Summary,
    Chat,
}

impl GenerationKind {
    pub fn temperature(&self) -> f32 {
        match self {
            GenerationKind::Flashcards | GenerationKind::Quiz => 0.3,
            GenerationKind::Summary => 0.5,
            GenerationKind::Chat => 0.7,
        }
    }

    /// User turn sent when the caller supplied no message
    pub fn default_request(&self) -> &'static str {
        match self {
            GenerationKind::Flashcards => {
                "Create flashcards that cover the key facts and concepts of the transcript."
            }
            GenerationKind::Quiz => {
                "Create a multiple-choice quiz that tests the key facts and concepts of the transcript."
            }
            GenerationKind::Summary => "Summarize the transcript.",
            GenerationKind::Chat => "What is this transcript about?",
        }
    }

    fn role(&self) -> &'static str {
        match self {
            GenerationKind::Flashcards => "You write study flashcards from a transcript.",
            GenerationKind::Quiz => "You write multiple-choice quizzes from a transcript.",
            GenerationKind::Summary => "You write clear study summaries of a transcript.",
            GenerationKind::Chat => {
                "You are a tutor answering questions about a transcript. Base every answer on the transcript."
            }
        }
    }

    fn format(&self) -> &'static str {
        match self {
            GenerationKind::Flashcards => {
                r#"Respond with a JSON array of exactly two elements: [sessionName, cards].
- sessionName: a short title for this study session (string).
- cards: a non-empty array of objects {"question": string, "answer": string}."#
            }
            GenerationKind::Quiz => {
                r#"Respond with a JSON array of exactly two elements: [quizName, questions].
- quizName: a short title for the quiz (string).
- questions: a non-empty array of objects {"question": string, "options": [string, ...], "answer": string, "explanation": string}.
- Every question has at least two options and "answer" is copied exactly from "options"."#
            }
            GenerationKind::Summary => {
                r#"Respond with a JSON array of exactly two strings: [summaryName, summary].
- summaryName: a short title for the summary.
- summary: the summary text. Use line breaks between sections."#
            }
            GenerationKind::Chat => {
                r#"Respond with a JSON array of exactly two strings: [chatTitle, answer].
- chatTitle: a short title for this conversation.
- answer: your reply to the latest user message."#
            }
        }
    }
}

/// Build the system prompt for `kind`, embedding the transcript verbatim
pub fn build_system_prompt(kind: GenerationKind, transcript: &str) -> String {
    format!(
        "{role}\n\n{format}\n\nRequirements:\n\
         - Write in the language of the user's request; without a request, use the transcript's language.\n\
         - Output only the JSON array. No commentary before or after it.\n\
         - Do not wrap the JSON in markdown or code fences.\n\n\
         Transcript:\n\"\"\"\n{transcript}\n\"\"\"",
        role = kind.role(),
        format = kind.format(),
        transcript = transcript,
    )
}
