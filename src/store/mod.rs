// src/store/mod.rs

//! Persistence seams.
//!
//! Handlers and services only see these traits. `PgStore` is the production
//! backend; `MemoryStore` keeps everything in process behind one lock.
//! Both must enforce the same two guarantees:
//!
//! * `upsert_answer` converges concurrent submissions for the same
//!   (attempt, question) into one row.
//! * `complete_attempt` transitions `in_progress -> completed` at most once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        Role,
        attempt::{AnswerFact, AnswerRecord, AttemptSummary, NewAnswer, QuizAttempt},
        question::{NewQuestion, Question},
        quiz::{Module, ModuleSummary, NewModule, NewQuiz, Quiz, QuizItem, QuizQuestion, SelectionCriteria},
        user::User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Identity provider backing registration and login.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

/// Question bank, modules and quiz definitions.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError>;

    async fn list_questions(&self) -> Result<Vec<Question>, AppError>;

    /// Creates the module and its quiz definition together.
    async fn create_module(&self, module: NewModule) -> Result<(Module, Quiz), AppError>;

    async fn list_modules(&self) -> Result<Vec<ModuleSummary>, AppError>;

    async fn find_module(&self, module_id: i64) -> Result<Option<Module>, AppError>;

    async fn find_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError>;

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    async fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError>;

    /// Fills an empty question set according to `criteria` and returns the
    /// quiz's items. A non-empty set is returned untouched.
    async fn populate_quiz(&self, quiz_id: i64, criteria: &SelectionCriteria) -> Result<Vec<QuizItem>, AppError>;

    /// Attaches a question by hand. `InvalidState` once the quiz has attempts.
    async fn add_quiz_question(&self, entry: QuizQuestion) -> Result<QuizQuestion, AppError>;

    /// Items in display order.
    async fn quiz_items(&self, quiz_id: i64) -> Result<Vec<QuizItem>, AppError>;
}

/// Attempts and the answer ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_attempt(&self, student_id: i64, quiz_id: i64) -> Result<QuizAttempt, AppError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError>;

    /// Insert-or-update keyed on (attempt_id, question_id), as one atomic write.
    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRecord, AppError>;

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError>;

    /// Conditional `in_progress -> completed`. `None` when the attempt was not in progress.
    async fn complete_attempt(&self, attempt_id: i64, score: i32) -> Result<Option<QuizAttempt>, AppError>;

    /// Newest first.
    async fn attempts_for_student(&self, student_id: i64) -> Result<Vec<AttemptSummary>, AppError>;

    async fn attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuizAttempt>, AppError>;

    /// Answers belonging to the student's completed attempts.
    async fn answer_facts_for_student(&self, student_id: i64) -> Result<Vec<AnswerFact>, AppError>;

    /// Answers belonging to the quiz's completed attempts.
    async fn answer_facts_for_quiz(&self, quiz_id: i64) -> Result<Vec<AnswerFact>, AppError>;
}

pub trait QuizStore: UserStore + CatalogStore + LedgerStore {}

impl<T: UserStore + CatalogStore + LedgerStore> QuizStore for T {}

pub type DynStore = Arc<dyn QuizStore>;
