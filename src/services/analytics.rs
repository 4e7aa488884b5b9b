// src/services/analytics.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    models::{
        analytics::{QuestionStat, QuizStats, StudentAnalytics, TopicAccuracy},
        attempt::{AnswerFact, AttemptStatus, AttemptSummary, QuizAttempt},
        quiz::Quiz,
    },
    services::scoring::{Slot, percentage},
};

fn average(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Some(((sum as f64 / scores.len() as f64) * 100.0).round() / 100.0)
}

/// `facts` must cover completed attempts only.
pub fn student_analytics(attempts: &[AttemptSummary], facts: &[AnswerFact]) -> StudentAnalytics {
    let scores: Vec<i32> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .filter_map(|a| a.score)
        .collect();

    let passed = attempts
        .iter()
        .filter(|a| a.passed == Some(true))
        .count();

    let mut by_topic: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for fact in facts {
        let entry = by_topic.entry(fact.topic.as_str()).or_default();
        entry.0 += 1;
        if fact.is_correct {
            entry.1 += 1;
        }
    }

    StudentAnalytics {
        total_attempts: attempts.len() as i64,
        completed_attempts: scores.len() as i64,
        passed_attempts: passed as i64,
        average_score: average(&scores),
        best_score: scores.iter().copied().max(),
        topics: by_topic
            .into_iter()
            .map(|(topic, (answered, correct))| TopicAccuracy {
                topic: topic.to_string(),
                answered,
                correct,
                accuracy: percentage(correct, answered),
            })
            .collect(),
    }
}

/// `facts` must cover completed attempts of `quiz` only.
pub fn quiz_stats(quiz: &Quiz, attempts: &[QuizAttempt], slots: &[Slot], facts: &[AnswerFact]) -> QuizStats {
    let completed: Vec<&QuizAttempt> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .collect();
    let scores: Vec<i32> = completed.iter().filter_map(|a| a.score).collect();
    let passed = scores.iter().filter(|s| **s >= quiz.passing_score).count() as i64;
    let students: HashSet<i64> = attempts.iter().map(|a| a.student_id).collect();

    let mut per_question: HashMap<i64, (i64, i64)> = HashMap::new();
    for fact in facts {
        let entry = per_question.entry(fact.question_id).or_default();
        entry.0 += 1;
        if fact.is_correct {
            entry.1 += 1;
        }
    }

    let mut ordered = slots.to_vec();
    ordered.sort_by_key(|s| (s.position, s.question_id));
    let completed_count = completed.len() as i64;

    QuizStats {
        quiz_id: quiz.id,
        title: quiz.title.clone(),
        passing_score: quiz.passing_score,
        total_attempts: attempts.len() as i64,
        completed_attempts: completed_count,
        distinct_students: students.len() as i64,
        average_score: average(&scores),
        min_score: scores.iter().copied().min(),
        max_score: scores.iter().copied().max(),
        pass_rate: percentage(passed, completed_count),
        questions: ordered
            .into_iter()
            .map(|slot| {
                let (answered, correct) = per_question.get(&slot.question_id).copied().unwrap_or_default();
                QuestionStat {
                    question_id: slot.question_id,
                    position: slot.position,
                    answered,
                    correct,
                    correct_rate: percentage(correct, completed_count),
                }
            })
            .collect(),
    }
}
