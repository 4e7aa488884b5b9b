// src/services/scoring.rs

//! Grading, scoring and progress rules.
//!
//! Every aggregation here is keyed by question id with at most one
//! contribution per question, so duplicate ledger rows (which the store
//! forbids anyway) can never inflate either side of the score ratio.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::{
    attempt::{AnswerRecord, QuestionProgress},
    quiz::QuizItem,
};

/// A question's place and weight inside one quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub question_id: i64,
    pub points: i32,
    pub position: i32,
}

impl From<&QuizItem> for Slot {
    fn from(item: &QuizItem) -> Self {
        Self {
            question_id: item.question.id,
            points: item.points,
            position: item.position,
        }
    }
}

/// Aggregate outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub score: i32,
    pub passed: bool,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub total_points_earned: i64,
    pub total_possible_points: i64,
}

/// Canonical text form of a submitted answer.
///
/// Strings are taken verbatim. Booleans and numbers use their JSON spelling
/// (`true`, `42`), arrays and objects their compact JSON.
pub fn canonical_answer(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Exact match on the canonical representation.
pub fn grade(submitted: &str, correct_answer: &str, points: i32) -> (bool, i32) {
    let is_correct = submitted == correct_answer;
    (is_correct, if is_correct { points } else { 0 })
}

/// `round(100 * part / whole)`, or 0 for an empty whole.
pub fn percentage(part: i64, whole: i64) -> i32 {
    if whole <= 0 {
        return 0;
    }
    ((part as f64 * 100.0) / whole as f64).round() as i32
}

fn ledger_by_question(ledger: &[AnswerRecord]) -> HashMap<i64, &AnswerRecord> {
    ledger.iter().map(|r| (r.question_id, r)).collect()
}

/// Scores an attempt over the quiz's question set.
///
/// Possible points come from the question set, earned points from ledger rows
/// restricted to that set. Rows for questions outside the set are ignored.
pub fn score_attempt(slots: &[Slot], ledger: &[AnswerRecord], passing_score: i32) -> ScoreSummary {
    let answers = ledger_by_question(ledger);
    let mut seen = HashSet::with_capacity(slots.len());

    let mut possible: i64 = 0;
    let mut earned: i64 = 0;
    let mut answered: i32 = 0;

    for slot in slots {
        if !seen.insert(slot.question_id) {
            continue;
        }
        let points = slot.points.max(0);
        possible += i64::from(points);
        if let Some(record) = answers.get(&slot.question_id) {
            answered += 1;
            earned += i64::from(record.points_earned.clamp(0, points));
        }
    }

    let score = percentage(earned, possible);
    ScoreSummary {
        score,
        passed: score >= passing_score,
        total_questions: seen.len() as i32,
        answered_questions: answered,
        total_points_earned: earned,
        total_possible_points: possible,
    }
}

/// Per-question status in display order, plus the distinct answered count.
pub fn project_progress(slots: &[Slot], ledger: &[AnswerRecord]) -> (Vec<QuestionProgress>, i32) {
    let answers = ledger_by_question(ledger);
    let mut ordered: Vec<&Slot> = slots.iter().collect();
    ordered.sort_by_key(|s| (s.position, s.question_id));

    let mut seen = HashSet::with_capacity(slots.len());
    let mut answered = 0;
    let rows = ordered
        .into_iter()
        .filter(|s| seen.insert(s.question_id))
        .map(|slot| {
            let record = answers.get(&slot.question_id);
            if record.is_some() {
                answered += 1;
            }
            QuestionProgress {
                question_id: slot.question_id,
                position: slot.position,
                answered: record.is_some(),
                is_correct: record.map(|r| r.is_correct),
                points_earned: record.map_or(0, |r| r.points_earned),
            }
        })
        .collect();

    (rows, answered)
}
