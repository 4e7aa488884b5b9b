// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::{
    question::{Difficulty, Question},
    text_enum,
};

text_enum!(
    /// Where a quiz definition came from.
    QuizKind, "quiz kind" {
        Module => "module",
        TimedExam => "timed_exam",
        Adaptive => "adaptive",
    }
);

/// Represents the 'modules' table: one anatomy training unit.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub title: String,
    /// Topic tag matched against `questions.topic` when populating the module quiz.
    pub topic: String,
    pub description: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quizzes' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub module_id: Option<i64>,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub kind: QuizKind,
    /// Seconds.
    pub time_limit: i32,
    /// Percentage in 0..=100.
    pub passing_score: i32,
    /// Informational; the authoritative set is `quiz_questions`.
    pub total_questions: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quiz_questions' join table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub quiz_id: i64,
    pub question_id: i64,
    pub points: i32,
    pub position: i32,
}

/// A bank question as it appears inside one quiz.
#[derive(Debug, Clone, FromRow)]
pub struct QuizItem {
    #[sqlx(flatten)]
    pub question: Question,
    pub points: i32,
    pub position: i32,
}

/// Module listing row joined with its quiz definition.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub id: i64,
    pub title: String,
    pub topic: String,
    pub description: Option<String>,
    pub quiz_id: Option<i64>,
    pub total_questions: Option<i32>,
    pub time_limit: Option<i32>,
    pub passing_score: Option<i32>,
}

/// Insert payload for a quiz definition.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub module_id: Option<i64>,
    pub title: String,
    pub kind: QuizKind,
    pub time_limit: i32,
    pub passing_score: i32,
    pub total_questions: i32,
}

/// Insert payload for a module (its quiz is created alongside).
#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub topic: String,
    pub description: Option<String>,
    pub question_count: i32,
    pub time_limit: i32,
    pub passing_score: i32,
}

/// What to draw from the bank when a quiz's question set is empty.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub count: usize,
    pub points: i32,
}

/// DTO for creating a module with its quiz definition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub question_count: i32,
    #[validate(range(min = 1, max = 86400))]
    pub time_limit: i32,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
}

/// DTO for attaching a bank question to a quiz by hand.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddQuizQuestionRequest {
    pub question_id: i64,
    #[validate(range(min = 0, max = 1000))]
    pub points: i32,
    #[validate(range(min = 1))]
    pub position: i32,
}
