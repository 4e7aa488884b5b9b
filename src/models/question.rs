// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use super::text_enum;

text_enum!(
    /// How a question is presented and answered.
    QuestionType, "question type" {
        MultipleChoice => "multiple_choice",
        TrueFalse => "true_false",
        Labeling => "labeling",
        DragDrop => "drag_drop",
        ShortAnswer => "short_answer",
    }
);

text_enum!(
    /// Difficulty tier used when drawing questions for ad hoc quizzes.
    Difficulty, "difficulty" {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
);

/// Represents the 'questions' table (the question bank).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,

    /// Anatomy topic tag (e.g. "skeletal", "cardiovascular").
    pub topic: String,

    pub content: String,

    /// Stored as a JSON array; absent for free-form questions.
    pub options: Option<Json<Vec<String>>>,

    /// Canonical answer representation compared against submissions.
    pub correct_answer: String,

    pub explanation: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending question to client (excludes answer and explanation).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub topic: String,
    pub content: String,
    pub options: Option<Json<Vec<String>>>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            difficulty: q.difficulty,
            topic: q.topic.clone(),
            content: q.content.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for creating a new bank question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

impl CreateQuestionRequest {
    /// Cross-field checks the derive cannot express.
    pub fn check_answer_shape(&self) -> Result<(), &'static str> {
        match self.question_type {
            QuestionType::MultipleChoice => match &self.options {
                Some(options) if options.contains(&self.correct_answer) => Ok(()),
                Some(_) => Err("correctAnswer must be one of the options"),
                None => Err("multiple_choice questions require options"),
            },
            QuestionType::TrueFalse => match self.correct_answer.as_str() {
                "true" | "false" => Ok(()),
                _ => Err("true_false answers must be \"true\" or \"false\""),
            },
            _ => Ok(()),
        }
    }
}

/// Insert payload for the question bank, already sanitized.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub topic: String,
    pub content: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}
