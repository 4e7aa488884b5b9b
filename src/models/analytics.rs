// src/models/analytics.rs

use serde::Serialize;

/// Accuracy of one student within one topic.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicAccuracy {
    pub topic: String,
    pub answered: i64,
    pub correct: i64,
    pub accuracy: i32,
}

/// Totals across a student's attempts.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalytics {
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub passed_attempts: i64,
    pub average_score: Option<f64>,
    pub best_score: Option<i32>,
    pub topics: Vec<TopicAccuracy>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question_id: i64,
    pub position: i32,
    pub answered: i64,
    pub correct: i64,
    /// Percentage of completed attempts that answered correctly.
    pub correct_rate: i32,
}

/// Class-wide statistics for one quiz, for instructors.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub quiz_id: i64,
    pub title: String,
    pub passing_score: i32,
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub distinct_students: i64,
    pub average_score: Option<f64>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub pass_rate: i32,
    pub questions: Vec<QuestionStat>,
}
