// src/store/memory.rs

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        Role,
        attempt::{AnswerFact, AnswerRecord, AttemptStatus, AttemptSummary, NewAnswer, QuizAttempt},
        question::{NewQuestion, Question},
        quiz::{Module, ModuleSummary, NewModule, NewQuiz, Quiz, QuizItem, QuizKind, QuizQuestion, SelectionCriteria},
        user::User,
    },
    services::selection::pick_questions,
};

use super::{CatalogStore, LedgerStore, UserStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    questions: BTreeMap<i64, Question>,
    modules: BTreeMap<i64, Module>,
    quizzes: BTreeMap<i64, Quiz>,
    /// Keyed by (quiz_id, question_id).
    quiz_questions: BTreeMap<(i64, i64), QuizQuestion>,
    attempts: BTreeMap<i64, QuizAttempt>,
    /// Keyed by (attempt_id, question_id), so a second row cannot exist.
    answers: BTreeMap<(i64, i64), AnswerRecord>,
}

fn next_id<V>(table: &BTreeMap<i64, V>) -> i64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

impl Tables {
    fn items(&self, quiz_id: i64) -> Vec<QuizItem> {
        let mut items: Vec<QuizItem> = self
            .quiz_questions
            .range((quiz_id, i64::MIN)..=(quiz_id, i64::MAX))
            .filter_map(|(_, entry)| {
                self.questions.get(&entry.question_id).map(|q| QuizItem {
                    question: q.clone(),
                    points: entry.points,
                    position: entry.position,
                })
            })
            .collect();
        items.sort_by_key(|i| (i.position, i.question.id));
        items
    }

    fn facts<'a>(&'a self, attempts: impl Iterator<Item = &'a QuizAttempt>) -> Vec<AnswerFact> {
        let mut facts = Vec::new();
        for attempt in attempts.filter(|a| a.status == AttemptStatus::Completed) {
            let in_quiz: HashSet<i64> = self
                .quiz_questions
                .range((attempt.quiz_id, i64::MIN)..=(attempt.quiz_id, i64::MAX))
                .map(|(_, entry)| entry.question_id)
                .collect();
            let rows = self
                .answers
                .range((attempt.id, i64::MIN)..=(attempt.id, i64::MAX))
                .map(|(_, record)| record)
                .filter(|record| in_quiz.contains(&record.question_id));
            for record in rows {
                if let Some(question) = self.questions.get(&record.question_id) {
                    facts.push(AnswerFact {
                        attempt_id: attempt.id,
                        question_id: record.question_id,
                        topic: question.topic.clone(),
                        is_correct: record.is_correct,
                    });
                }
            }
        }
        facts
    }
}

/// In-process store with the same guarantees as `PgStore`, every operation
/// running under a single lock. Used by the integration tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }
        let user = User {
            id: next_id(&tables.users),
            username: username.to_string(),
            password: password_hash.to_string(),
            role,
            created_at: Some(Utc::now()),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError> {
        let mut tables = self.tables.lock().await;
        let created = Question {
            id: next_id(&tables.questions),
            question_type: question.question_type,
            difficulty: question.difficulty,
            topic: question.topic,
            content: question.content,
            options: question.options.map(Json),
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            created_at: Some(Utc::now()),
        };
        tables.questions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.values().cloned().collect())
    }

    async fn create_module(&self, module: NewModule) -> Result<(Module, Quiz), AppError> {
        let mut tables = self.tables.lock().await;
        let now = Some(Utc::now());
        let created = Module {
            id: next_id(&tables.modules),
            title: module.title.clone(),
            topic: module.topic,
            description: module.description,
            created_at: now,
        };
        let quiz = Quiz {
            id: next_id(&tables.quizzes),
            module_id: Some(created.id),
            title: module.title,
            kind: QuizKind::Module,
            time_limit: module.time_limit,
            passing_score: module.passing_score,
            total_questions: module.question_count,
            created_at: now,
        };
        tables.modules.insert(created.id, created.clone());
        tables.quizzes.insert(quiz.id, quiz.clone());
        Ok((created, quiz))
    }

    async fn list_modules(&self) -> Result<Vec<ModuleSummary>, AppError> {
        let tables = self.tables.lock().await;
        let summaries = tables
            .modules
            .values()
            .map(|m| {
                let quiz = tables.quizzes.values().find(|q| q.module_id == Some(m.id));
                ModuleSummary {
                    id: m.id,
                    title: m.title.clone(),
                    topic: m.topic.clone(),
                    description: m.description.clone(),
                    quiz_id: quiz.map(|q| q.id),
                    total_questions: quiz.map(|q| q.total_questions),
                    time_limit: quiz.map(|q| q.time_limit),
                    passing_score: quiz.map(|q| q.passing_score),
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn find_module(&self, module_id: i64) -> Result<Option<Module>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.modules.get(&module_id).cloned())
    }

    async fn find_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .quizzes
            .values()
            .find(|q| q.module_id == Some(module_id))
            .cloned())
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.quizzes.get(&quiz_id).cloned())
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let mut tables = self.tables.lock().await;
        let created = Quiz {
            id: next_id(&tables.quizzes),
            module_id: quiz.module_id,
            title: quiz.title,
            kind: quiz.kind,
            time_limit: quiz.time_limit,
            passing_score: quiz.passing_score,
            total_questions: quiz.total_questions,
            created_at: Some(Utc::now()),
        };
        tables.quizzes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn populate_quiz(&self, quiz_id: i64, criteria: &SelectionCriteria) -> Result<Vec<QuizItem>, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.quizzes.contains_key(&quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let populated = tables
            .quiz_questions
            .range((quiz_id, i64::MIN)..=(quiz_id, i64::MAX))
            .next()
            .is_some();

        if !populated {
            let preferred: Vec<i64> = tables
                .questions
                .values()
                .filter(|q| criteria.topic.as_ref().is_none_or(|t| &q.topic == t))
                .filter(|q| criteria.difficulty.is_none_or(|d| q.difficulty == d))
                .map(|q| q.id)
                .collect();
            let bank: Vec<i64> = tables.questions.keys().copied().collect();

            let picked = pick_questions(&preferred, &bank, criteria.count)?;
            for (index, question_id) in picked.iter().enumerate() {
                tables.quiz_questions.insert(
                    (quiz_id, *question_id),
                    QuizQuestion {
                        quiz_id,
                        question_id: *question_id,
                        points: criteria.points,
                        position: index as i32 + 1,
                    },
                );
            }
            if let Some(quiz) = tables.quizzes.get_mut(&quiz_id) {
                quiz.total_questions = picked.len() as i32;
            }
        }

        Ok(tables.items(quiz_id))
    }

    async fn add_quiz_question(&self, entry: QuizQuestion) -> Result<QuizQuestion, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.quizzes.contains_key(&entry.quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        if tables.attempts.values().any(|a| a.quiz_id == entry.quiz_id) {
            return Err(AppError::InvalidState(
                "Quiz already has attempts; its question set is frozen".to_string(),
            ));
        }
        if !tables.questions.contains_key(&entry.question_id) {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        tables
            .quiz_questions
            .insert((entry.quiz_id, entry.question_id), entry.clone());
        let count = tables
            .quiz_questions
            .range((entry.quiz_id, i64::MIN)..=(entry.quiz_id, i64::MAX))
            .count() as i32;
        if let Some(quiz) = tables.quizzes.get_mut(&entry.quiz_id) {
            quiz.total_questions = count;
        }
        Ok(entry)
    }

    async fn quiz_items(&self, quiz_id: i64) -> Result<Vec<QuizItem>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.items(quiz_id))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_attempt(&self, student_id: i64, quiz_id: i64) -> Result<QuizAttempt, AppError> {
        let mut tables = self.tables.lock().await;
        let attempt = QuizAttempt {
            id: next_id(&tables.attempts),
            student_id,
            quiz_id,
            status: AttemptStatus::InProgress,
            start_time: Utc::now(),
            end_time: None,
            score: None,
        };
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.attempts.get(&attempt_id).cloned())
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRecord, AppError> {
        let mut tables = self.tables.lock().await;
        let record = AnswerRecord {
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            submitted_answer: answer.submitted_answer,
            is_correct: answer.is_correct,
            points_earned: answer.points_earned,
            time_spent: answer.time_spent,
            answered_at: Utc::now(),
        };
        tables
            .answers
            .insert((record.attempt_id, record.question_id), record.clone());
        Ok(record)
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .answers
            .range((attempt_id, i64::MIN)..=(attempt_id, i64::MAX))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn complete_attempt(&self, attempt_id: i64, score: i32) -> Result<Option<QuizAttempt>, AppError> {
        let mut tables = self.tables.lock().await;
        match tables.attempts.get_mut(&attempt_id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.status = AttemptStatus::Completed;
                attempt.end_time = Some(Utc::now());
                attempt.score = Some(score);
                Ok(Some(attempt.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn attempts_for_student(&self, student_id: i64) -> Result<Vec<AttemptSummary>, AppError> {
        let tables = self.tables.lock().await;
        let mut summaries: Vec<AttemptSummary> = tables
            .attempts
            .values()
            .filter(|a| a.student_id == student_id)
            .filter_map(|a| {
                tables.quizzes.get(&a.quiz_id).map(|quiz| AttemptSummary {
                    id: a.id,
                    quiz_id: a.quiz_id,
                    quiz_title: quiz.title.clone(),
                    status: a.status,
                    start_time: a.start_time,
                    end_time: a.end_time,
                    score: a.score,
                    passing_score: quiz.passing_score,
                    passed: a.score.map(|s| s >= quiz.passing_score),
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }

    async fn attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn answer_facts_for_student(&self, student_id: i64) -> Result<Vec<AnswerFact>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.facts(tables.attempts.values().filter(|a| a.student_id == student_id)))
    }

    async fn answer_facts_for_quiz(&self, quiz_id: i64) -> Result<Vec<AnswerFact>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.facts(tables.attempts.values().filter(|a| a.quiz_id == quiz_id)))
    }
}
