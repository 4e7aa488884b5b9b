// src/services/quiz.rs

//! Attempt lifecycle: instantiation, the answer ledger, scoring and progress.
//!
//! Every operation takes the authenticated student id explicitly. Attempts
//! owned by someone else are reported as missing.

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    config::{DEFAULT_QUESTION_POINTS, DEFAULT_TIME_LIMIT_SECS},
    error::AppError,
    models::{
        analytics::{QuizStats, StudentAnalytics},
        attempt::{
            AnswerResult, AttemptDetail, AttemptQuestionDetail, AttemptStarted, AttemptStatus, AttemptSummary,
            FinishResult, NewAnswer, Progress, QuizAttempt, RecordedAnswer, StartAdaptiveRequest,
            StartTimedExamRequest, SubmitAnswerRequest,
        },
        question::PublicQuestion,
        quiz::{NewQuiz, Quiz, QuizItem, QuizKind, SelectionCriteria},
    },
    services::{
        analytics,
        scoring::{self, Slot},
    },
    store::QuizStore,
};

fn slots(items: &[QuizItem]) -> Vec<Slot> {
    items.iter().map(Slot::from).collect()
}

fn question_count(requested: i32) -> Result<usize, AppError> {
    usize::try_from(requested)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::InvalidInput("questionCount must be greater than zero".to_string()))
}

/// Loads an attempt, hiding other students' attempts behind `NotFound`.
async fn owned_attempt(store: &dyn QuizStore, student_id: i64, attempt_id: i64) -> Result<QuizAttempt, AppError> {
    store
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.student_id == student_id)
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}

async fn attempt_quiz(store: &dyn QuizStore, attempt: &QuizAttempt) -> Result<Quiz, AppError> {
    store.find_quiz(attempt.quiz_id).await?.ok_or_else(|| {
        AppError::InternalServerError(format!("Attempt {} references missing quiz {}", attempt.id, attempt.quiz_id))
    })
}

async fn open_attempt(store: &dyn QuizStore, student_id: i64, quiz: &Quiz, items: &[QuizItem]) -> Result<AttemptStarted, AppError> {
    let attempt = store.create_attempt(student_id, quiz.id).await?;
    tracing::info!(
        "Student {} started attempt {} on quiz {} ({} questions)",
        student_id,
        attempt.id,
        quiz.id,
        items.len()
    );

    Ok(AttemptStarted {
        attempt_id: attempt.id,
        quiz_id: quiz.id,
        time_limit: quiz.time_limit,
        total_questions: items.len() as i32,
        passing_score: quiz.passing_score,
    })
}

/// Starts an attempt on a module's quiz, populating the quiz on first use.
pub async fn start_module_quiz(store: &dyn QuizStore, student_id: i64, module_id: i64) -> Result<AttemptStarted, AppError> {
    let module = store
        .find_module(module_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Module not found".to_string()))?;
    let quiz = store
        .find_quiz_for_module(module.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Module has no quiz".to_string()))?;

    let criteria = SelectionCriteria {
        topic: Some(module.topic.clone()),
        difficulty: None,
        count: question_count(quiz.total_questions)?,
        points: DEFAULT_QUESTION_POINTS,
    };
    let items = store.populate_quiz(quiz.id, &criteria).await?;

    open_attempt(store, student_id, &quiz, &items).await
}

async fn start_ad_hoc(
    store: &dyn QuizStore,
    student_id: i64,
    quiz: NewQuiz,
    criteria: SelectionCriteria,
) -> Result<AttemptStarted, AppError> {
    // Validate against the bank before a quiz row exists.
    let bank = store.list_questions().await?.len();
    if criteria.count > bank {
        return Err(AppError::InvalidInput(format!(
            "questionCount {} exceeds the {} questions available",
            criteria.count, bank
        )));
    }

    let quiz = store.create_quiz(quiz).await?;
    let items = store.populate_quiz(quiz.id, &criteria).await?;
    open_attempt(store, student_id, &quiz, &items).await
}

/// Builds a one-off timed exam and starts an attempt on it.
pub async fn start_timed_exam(
    store: &dyn QuizStore,
    student_id: i64,
    passing_score: i32,
    req: &StartTimedExamRequest,
) -> Result<AttemptStarted, AppError> {
    let count = question_count(req.question_count)?;
    if req.time_limit <= 0 {
        return Err(AppError::InvalidInput("timeLimit must be greater than zero".to_string()));
    }

    let quiz = NewQuiz {
        module_id: None,
        title: format!("Timed exam ({} questions)", count),
        kind: QuizKind::TimedExam,
        time_limit: req.time_limit,
        passing_score,
        total_questions: count as i32,
    };
    let criteria = SelectionCriteria {
        topic: None,
        difficulty: req.difficulty,
        count,
        points: DEFAULT_QUESTION_POINTS,
    };
    start_ad_hoc(store, student_id, quiz, criteria).await
}

/// Builds a one-off quiz around a target difficulty and starts an attempt on it.
pub async fn start_adaptive(
    store: &dyn QuizStore,
    student_id: i64,
    passing_score: i32,
    req: &StartAdaptiveRequest,
) -> Result<AttemptStarted, AppError> {
    let count = question_count(req.question_count)?;
    let time_limit = req.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS);
    if time_limit <= 0 {
        return Err(AppError::InvalidInput("timeLimit must be greater than zero".to_string()));
    }

    let quiz = NewQuiz {
        module_id: None,
        title: format!("Adaptive test ({})", req.target_difficulty),
        kind: QuizKind::Adaptive,
        time_limit,
        passing_score,
        total_questions: count as i32,
    };
    let criteria = SelectionCriteria {
        topic: None,
        difficulty: Some(req.target_difficulty),
        count,
        points: DEFAULT_QUESTION_POINTS,
    };
    start_ad_hoc(store, student_id, quiz, criteria).await
}

/// Grades one answer and upserts it into the ledger.
pub async fn submit_answer(
    store: &dyn QuizStore,
    student_id: i64,
    attempt_id: i64,
    req: &SubmitAnswerRequest,
) -> Result<AnswerResult, AppError> {
    if req.time_spent < 0 {
        return Err(AppError::InvalidInput("timeSpent cannot be negative".to_string()));
    }

    let attempt = owned_attempt(store, student_id, attempt_id).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InvalidState(format!("Attempt {} is already {}", attempt.id, attempt.status)));
    }

    let items = store.quiz_items(attempt.quiz_id).await?;
    let item = items
        .iter()
        .find(|i| i.question.id == req.question_id)
        .ok_or_else(|| AppError::NotFound("Question is not part of this attempt".to_string()))?;

    let submitted = scoring::canonical_answer(&req.answer);
    let (is_correct, points_earned) = scoring::grade(&submitted, &item.question.correct_answer, item.points);

    store
        .upsert_answer(NewAnswer {
            attempt_id: attempt.id,
            question_id: item.question.id,
            submitted_answer: submitted,
            is_correct,
            points_earned,
            time_spent: req.time_spent,
        })
        .await?;

    Ok(AnswerResult {
        is_correct,
        points_earned,
        correct_answer: item.question.correct_answer.clone(),
    })
}

/// Scores the attempt and moves it to `completed`. Only one caller can win.
pub async fn finish_attempt(store: &dyn QuizStore, student_id: i64, attempt_id: i64) -> Result<FinishResult, AppError> {
    let attempt = owned_attempt(store, student_id, attempt_id).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InvalidState(format!("Attempt {} is already {}", attempt.id, attempt.status)));
    }

    let quiz = attempt_quiz(store, &attempt).await?;
    let items = store.quiz_items(quiz.id).await?;
    let ledger = store.answers_for_attempt(attempt.id).await?;
    let summary = scoring::score_attempt(&slots(&items), &ledger, quiz.passing_score);

    let completed = store
        .complete_attempt(attempt.id, summary.score)
        .await?
        .ok_or_else(|| AppError::InvalidState(format!("Attempt {} was finished concurrently", attempt.id)))?;

    tracing::info!(
        "Attempt {} finished: score {} ({})",
        completed.id,
        summary.score,
        if summary.passed { "passed" } else { "failed" }
    );

    Ok(FinishResult {
        score: summary.score,
        passed: summary.passed,
        total_questions: summary.total_questions,
        answered_questions: summary.answered_questions,
        total_points_earned: summary.total_points_earned,
        total_possible_points: summary.total_possible_points,
        time_spent: completed.elapsed_secs(Utc::now()),
    })
}

/// Read-only view of how far the student is, open or completed.
pub async fn get_progress(store: &dyn QuizStore, student_id: i64, attempt_id: i64) -> Result<Progress, AppError> {
    let attempt = owned_attempt(store, student_id, attempt_id).await?;
    let items = store.quiz_items(attempt.quiz_id).await?;
    let ledger = store.answers_for_attempt(attempt.id).await?;

    let (questions, answered) = scoring::project_progress(&slots(&items), &ledger);
    let total = questions.len() as i32;

    Ok(Progress {
        attempt_id: attempt.id,
        status: attempt.status,
        total_questions: total,
        answered_questions: answered,
        progress_percentage: scoring::percentage(i64::from(answered), i64::from(total)),
        questions,
    })
}

/// Full attempt view. Correct answers are withheld until completion.
pub async fn get_attempt_detail(store: &dyn QuizStore, student_id: i64, attempt_id: i64) -> Result<AttemptDetail, AppError> {
    let attempt = owned_attempt(store, student_id, attempt_id).await?;
    let quiz = attempt_quiz(store, &attempt).await?;
    let items = store.quiz_items(quiz.id).await?;
    let mut ledger: HashMap<i64, _> = store
        .answers_for_attempt(attempt.id)
        .await?
        .into_iter()
        .map(|r| (r.question_id, r))
        .collect();

    let reveal = attempt.status == AttemptStatus::Completed;
    let questions = items
        .into_iter()
        .map(|item| AttemptQuestionDetail {
            question: PublicQuestion::from(&item.question),
            points: item.points,
            position: item.position,
            answer: ledger.remove(&item.question.id).map(|r| RecordedAnswer {
                submitted_answer: r.submitted_answer,
                is_correct: r.is_correct,
                points_earned: r.points_earned,
                time_spent: r.time_spent,
            }),
            correct_answer: reveal.then(|| item.question.correct_answer.clone()),
            explanation: if reveal { item.question.explanation.clone() } else { None },
        })
        .collect();

    Ok(AttemptDetail {
        passed: attempt.score.map(|s| s >= quiz.passing_score),
        quiz_title: quiz.title,
        time_limit: quiz.time_limit,
        passing_score: quiz.passing_score,
        attempt,
        questions,
    })
}

pub async fn list_attempts(store: &dyn QuizStore, student_id: i64) -> Result<Vec<AttemptSummary>, AppError> {
    store.attempts_for_student(student_id).await
}

pub async fn student_analytics(store: &dyn QuizStore, student_id: i64) -> Result<StudentAnalytics, AppError> {
    let attempts = store.attempts_for_student(student_id).await?;
    let facts = store.answer_facts_for_student(student_id).await?;
    Ok(analytics::student_analytics(&attempts, &facts))
}

pub async fn quiz_stats(store: &dyn QuizStore, quiz_id: i64) -> Result<QuizStats, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
    let attempts = store.attempts_for_quiz(quiz.id).await?;
    let items = store.quiz_items(quiz.id).await?;
    let facts = store.answer_facts_for_quiz(quiz.id).await?;
    Ok(analytics::quiz_stats(&quiz, &attempts, &slots(&items), &facts))
}
