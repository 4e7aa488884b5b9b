// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{
    question::{Difficulty, PublicQuestion},
    text_enum,
};

text_enum!(
    /// Attempt lifecycle. The only transition is `InProgress -> Completed`.
    AttemptStatus, "attempt status" {
        InProgress => "in_progress",
        Completed => "completed",
    }
);

/// Represents the 'quiz_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    #[sqlx(try_from = "String")]
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

impl QuizAttempt {
    /// Seconds between start and end (or `now` while still open).
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_seconds().max(0)
    }
}

/// Represents the 'answer_records' table.
/// (attempt_id, question_id) is unique; resubmissions overwrite.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub attempt_id: i64,
    pub question_id: i64,
    pub submitted_answer: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_spent: i32,
    pub answered_at: DateTime<Utc>,
}

/// Upsert payload for the answer ledger.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub submitted_answer: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_spent: i32,
}

/// Answer row flattened with its question's topic, for analytics.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerFact {
    pub attempt_id: i64,
    pub question_id: i64,
    pub topic: String,
    pub is_correct: bool,
}

/// Row for a student's attempt history.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    #[sqlx(try_from = "String")]
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub passing_score: i32,
    /// Null until the attempt has a score.
    pub passed: Option<bool>,
}

// ---- Requests ----

/// DTO for `POST /quiz/timed-exam/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimedExamRequest {
    /// Seconds.
    pub time_limit: i32,
    pub question_count: i32,
    pub difficulty: Option<Difficulty>,
}

/// DTO for `POST /quiz/adaptive/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAdaptiveRequest {
    pub target_difficulty: Difficulty,
    pub question_count: i32,
    pub time_limit: Option<i32>,
}

/// DTO for `POST /quiz/attempt/{id}/answer`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    /// Strings are compared as-is; arrays/objects (labeling, drag-drop) by their compact JSON.
    pub answer: serde_json::Value,
    #[serde(default)]
    pub time_spent: i32,
}

// ---- Responses ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStarted {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub time_limit: i32,
    pub total_questions: i32,
    pub passing_score: i32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub is_correct: bool,
    pub points_earned: i32,
    pub correct_answer: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinishResult {
    pub score: i32,
    pub passed: bool,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub total_points_earned: i64,
    pub total_possible_points: i64,
    /// Elapsed seconds between start and finish.
    pub time_spent: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionProgress {
    pub question_id: i64,
    pub position: i32,
    pub answered: bool,
    pub is_correct: Option<bool>,
    pub points_earned: i32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub attempt_id: i64,
    pub status: AttemptStatus,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub progress_percentage: i32,
    pub questions: Vec<QuestionProgress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub submitted_answer: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_spent: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuestionDetail {
    #[serde(flatten)]
    pub question: PublicQuestion,
    pub points: i32,
    pub position: i32,
    pub answer: Option<RecordedAnswer>,
    /// Revealed only after the attempt is completed.
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub quiz_title: String,
    pub time_limit: i32,
    pub passing_score: i32,
    pub passed: Option<bool>,
    pub questions: Vec<AttemptQuestionDetail>,
}
