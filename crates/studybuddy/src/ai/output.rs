//! Parsing and shape validation of model output

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use super::prompts::GenerationKind;
use crate::models::{Flashcard, QuizQuestion};

/// A surrounding triple-backtick fence, with an optional language tag
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)\s*```$").unwrap());

/// Why model output could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelOutputError {
    #[error("output is not valid JSON: {0}")]
    Parse(String),

    #[error("output has an unexpected shape: {0}")]
    Validation(String),
}

/// A validated structure extracted from model output
pub trait GeneratedShape: Sized + Send {
    const KIND: GenerationKind;

    fn from_value(value: Value) -> Result<Self, ModelOutputError>;
}

/// Remove a surrounding code fence and outer whitespace
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Strip fences, parse JSON and validate it as `S`
pub fn parse_model_output<S: GeneratedShape>(raw: &str) -> Result<S, ModelOutputError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| ModelOutputError::Parse(e.to_string()))?;
    S::from_value(value)
}

/// Split `[name, payload]`, checking arity and that the name is a non-empty string
fn split_named_pair(value: Value) -> Result<(String, Value), ModelOutputError> {
    let Value::Array(items) = value else {
        return Err(ModelOutputError::Validation(
            "expected a JSON array".to_string(),
        ));
    };
    if items.len() != 2 {
        return Err(ModelOutputError::Validation(format!(
            "expected 2 elements, got {}",
            items.len()
        )));
    }
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Err(ModelOutputError::Validation(
                "first element must be a non-empty string".to_string(),
            ))
        }
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok((name, payload))
}

fn require_string_field(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<String, ModelOutputError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(ModelOutputError::Validation(format!(
            "item {}: \"{}\" must be a non-empty string",
            index, field
        ))),
    }
}

fn non_empty_array(value: Value, what: &str) -> Result<Vec<Value>, ModelOutputError> {
    match value {
        Value::Array(items) if !items.is_empty() => Ok(items),
        _ => Err(ModelOutputError::Validation(format!(
            "{} must be a non-empty array",
            what
        ))),
    }
}

/// `[sessionName, [{question, answer}, ...]]`
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardsShape {
    pub session_name: String,
    pub cards: Vec<Flashcard>,
}

impl GeneratedShape for FlashcardsShape {
    const KIND: GenerationKind = GenerationKind::Flashcards;

    fn from_value(value: Value) -> Result<Self, ModelOutputError> {
        let (session_name, payload) = split_named_pair(value)?;
        let cards = non_empty_array(payload, "cards")?
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let Value::Object(obj) = item else {
                    return Err(ModelOutputError::Validation(format!(
                        "item {}: expected an object",
                        i
                    )));
                };
                Ok(Flashcard {
                    question: require_string_field(&obj, "question", i)?,
                    answer: require_string_field(&obj, "answer", i)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            session_name,
            cards,
        })
    }
}

/// `[quizName, [{question, options, answer, explanation}, ...]]`
#[derive(Debug, Clone, PartialEq)]
pub struct QuizShape {
    pub quiz_name: String,
    pub questions: Vec<QuizQuestion>,
}

impl GeneratedShape for QuizShape {
    const KIND: GenerationKind = GenerationKind::Quiz;

    fn from_value(value: Value) -> Result<Self, ModelOutputError> {
        let (quiz_name, payload) = split_named_pair(value)?;
        let questions = non_empty_array(payload, "questions")?
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let Value::Object(obj) = item else {
                    return Err(ModelOutputError::Validation(format!(
                        "item {}: expected an object",
                        i
                    )));
                };
                let options = match obj.get("options") {
                    Some(Value::Array(opts)) => opts
                        .iter()
                        .map(|o| o.as_str().map(|s| s.to_string()))
                        .collect::<Option<Vec<_>>>(),
                    _ => None,
                }
                .ok_or_else(|| {
                    ModelOutputError::Validation(format!(
                        "item {}: \"options\" must be an array of strings",
                        i
                    ))
                })?;
                let question = QuizQuestion {
                    question: require_string_field(&obj, "question", i)?,
                    options,
                    answer: require_string_field(&obj, "answer", i)?,
                    explanation: require_string_field(&obj, "explanation", i)?,
                };
                question
                    .check()
                    .map_err(|e| ModelOutputError::Validation(format!("item {}: {}", i, e)))?;
                Ok(question)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            quiz_name,
            questions,
        })
    }
}

fn string_payload(payload: Value, what: &str) -> Result<String, ModelOutputError> {
    match payload {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ModelOutputError::Validation(format!(
            "{} must be a non-empty string",
            what
        ))),
    }
}

/// `[summaryName, summary]`
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryShape {
    pub summary_name: String,
    pub summary: String,
}

impl GeneratedShape for SummaryShape {
    const KIND: GenerationKind = GenerationKind::Summary;

    fn from_value(value: Value) -> Result<Self, ModelOutputError> {
        let (summary_name, payload) = split_named_pair(value)?;
        Ok(Self {
            summary_name,
            summary: string_payload(payload, "summary")?,
        })
    }
}

/// `[chatTitle, answer]`
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReplyShape {
    pub title: String,
    pub answer: String,
}

impl GeneratedShape for ChatReplyShape {
    const KIND: GenerationKind = GenerationKind::Chat;

    fn from_value(value: Value) -> Result<Self, ModelOutputError> {
        let (title, payload) = split_named_pair(value)?;
        Ok(Self {
            title,
            answer: string_payload(payload, "answer")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("  \n```JSON\r\n[\"a\"]\r\n```\n  "), "[\"a\"]");
        assert_eq!(strip_code_fence("[1]"), "[1]");
        // Inner backticks are kept
        assert_eq!(
            strip_code_fence("```\n[\"use `x`\"]\n```"),
            "[\"use `x`\"]"
        );
    }

    #[test]
    fn test_parse_flashcards() {
        let raw = r#"```json
["Cell biology", [{"question": "Powerhouse of the cell?", "answer": "Mitochondria"}]]
```"#;
        let shape: FlashcardsShape = parse_model_output(raw).unwrap();
        assert_eq!(shape.session_name, "Cell biology");
        assert_eq!(shape.cards.len(), 1);
        assert_eq!(shape.cards[0].answer, "Mitochondria");
    }

    #[test]
    fn test_parse_error_is_tagged() {
        let err = parse_model_output::<FlashcardsShape>("Sure! Here are your cards:").unwrap_err();
        assert!(matches!(err, ModelOutputError::Parse(_)));
    }

    #[test]
    fn test_flashcard_validation_errors() {
        let cases = [
            r#"{"name": "x"}"#,
            r#"["only one"]"#,
            r#"["a", [], "extra"]"#,
            r#"["", [{"question": "q", "answer": "a"}]]"#,
            r#"["name", []]"#,
            r#"["name", [{"question": "q"}]]"#,
            r#"["name", [{"question": "q", "answer": 42}]]"#,
            r#"["name", ["not an object"]]"#,
        ];
        for raw in cases {
            let err = parse_model_output::<FlashcardsShape>(raw).unwrap_err();
            assert!(
                matches!(err, ModelOutputError::Validation(_)),
                "{} -> {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_parse_quiz() {
        let raw = r#"["Cells", [{"question": "Q?", "options": ["A", "B"], "answer": "B", "explanation": "Because."}]]"#;
        let shape: QuizShape = parse_model_output(raw).unwrap();
        assert_eq!(shape.quiz_name, "Cells");
        assert_eq!(shape.questions[0].options, vec!["A", "B"]);

        let bad_answer = r#"["Cells", [{"question": "Q?", "options": ["A", "B"], "answer": "C", "explanation": "x"}]]"#;
        assert!(matches!(
            parse_model_output::<QuizShape>(bad_answer),
            Err(ModelOutputError::Validation(_))
        ));

        let missing_explanation = r#"["Cells", [{"question": "Q?", "options": ["A", "B"], "answer": "A"}]]"#;
        assert!(matches!(
            parse_model_output::<QuizShape>(missing_explanation),
            Err(ModelOutputError::Validation(_))
        ));

        let numeric_option = r#"["Cells", [{"question": "Q?", "options": ["A", 2], "answer": "A", "explanation": "x"}]]"#;
        assert!(matches!(
            parse_model_output::<QuizShape>(numeric_option),
            Err(ModelOutputError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_string_pairs() {
        let summary: SummaryShape = parse_model_output(r#"["Week 1", "Cells divide."]"#).unwrap();
        assert_eq!(summary.summary_name, "Week 1");
        assert_eq!(summary.summary, "Cells divide.");

        let reply: ChatReplyShape = parse_model_output(r#"["Mitosis", "It is cell division."]"#).unwrap();
        assert_eq!(reply.answer, "It is cell division.");

        assert!(matches!(
            parse_model_output::<SummaryShape>(r#"["Week 1", ["not", "a string"]]"#),
            Err(ModelOutputError::Validation(_))
        ));
    }
}
