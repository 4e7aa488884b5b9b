// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        Role,
        attempt::{AnswerFact, AnswerRecord, AttemptSummary, NewAnswer, QuizAttempt},
        question::{NewQuestion, Question},
        quiz::{Module, ModuleSummary, NewModule, NewQuiz, Quiz, QuizItem, QuizKind, QuizQuestion, SelectionCriteria},
        user::User,
    },
    services::selection::pick_questions,
};

use super::{CatalogStore, LedgerStore, UserStore};

/// Postgres-backed store. Uniqueness and the finish transition are enforced
/// by the database (primary keys, `ON CONFLICT`, conditional `UPDATE`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError> {
        let created = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (type, difficulty, topic, content, options, correct_answer, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, type, difficulty, topic, content, options, correct_answer, explanation, created_at
            "#,
        )
        .bind(question.question_type.as_str())
        .bind(question.difficulty.as_str())
        .bind(&question.topic)
        .bind(&question.content)
        .bind(question.options.map(Json))
        .bind(&question.correct_answer)
        .bind(&question.explanation)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;

        Ok(created)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, type, difficulty, topic, content, options, correct_answer, explanation, created_at
            FROM questions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn create_module(&self, module: NewModule) -> Result<(Module, Quiz), AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (title, topic, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, topic, description, created_at
            "#,
        )
        .bind(&module.title)
        .bind(&module.topic)
        .bind(&module.description)
        .fetch_one(&mut *tx)
        .await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (module_id, title, kind, time_limit, passing_score, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, module_id, title, kind, time_limit, passing_score, total_questions, created_at
            "#,
        )
        .bind(created.id)
        .bind(&module.title)
        .bind(QuizKind::Module.as_str())
        .bind(module.time_limit)
        .bind(module.passing_score)
        .bind(module.question_count)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, quiz))
    }

    async fn list_modules(&self) -> Result<Vec<ModuleSummary>, AppError> {
        let modules = sqlx::query_as::<_, ModuleSummary>(
            r#"
            SELECT
                m.id, m.title, m.topic, m.description,
                z.id AS quiz_id, z.total_questions, z.time_limit, z.passing_score
            FROM modules m
            LEFT JOIN quizzes z ON z.module_id = m.id
            ORDER BY m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    async fn find_module(&self, module_id: i64) -> Result<Option<Module>, AppError> {
        let module = sqlx::query_as::<_, Module>(
            "SELECT id, title, topic, description, created_at FROM modules WHERE id = $1",
        )
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn find_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, module_id, title, kind, time_limit, passing_score, total_questions, created_at
            FROM quizzes
            WHERE module_id = $1
            "#,
        )
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, module_id, title, kind, time_limit, passing_score, total_questions, created_at
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let created = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (module_id, title, kind, time_limit, passing_score, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, module_id, title, kind, time_limit, passing_score, total_questions, created_at
            "#,
        )
        .bind(quiz.module_id)
        .bind(&quiz.title)
        .bind(quiz.kind.as_str())
        .bind(quiz.time_limit)
        .bind(quiz.passing_score)
        .bind(quiz.total_questions)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn populate_quiz(&self, quiz_id: i64, criteria: &SelectionCriteria) -> Result<Vec<QuizItem>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent first starts of the same quiz.
        sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await?;

        if existing == 0 {
            let preferred: Vec<i64> = sqlx::query_scalar(
                r#"
                SELECT id FROM questions
                WHERE ($1::TEXT IS NULL OR topic = $1)
                  AND ($2::TEXT IS NULL OR difficulty = $2)
                "#,
            )
            .bind(criteria.topic.as_deref())
            .bind(criteria.difficulty.map(|d| d.as_str()))
            .fetch_all(&mut *tx)
            .await?;

            let bank: Vec<i64> = sqlx::query_scalar("SELECT id FROM questions")
                .fetch_all(&mut *tx)
                .await?;

            let picked = pick_questions(&preferred, &bank, criteria.count)?;

            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO quiz_questions (quiz_id, question_id, points, position) ",
            );
            query_builder.push_values(picked.iter().enumerate(), |mut row, (index, question_id)| {
                row.push_bind(quiz_id)
                    .push_bind(*question_id)
                    .push_bind(criteria.points)
                    .push_bind(index as i32 + 1);
            });
            query_builder.build().execute(&mut *tx).await?;

            sqlx::query("UPDATE quizzes SET total_questions = $2 WHERE id = $1")
                .bind(quiz_id)
                .bind(picked.len() as i32)
                .execute(&mut *tx)
                .await?;

            tracing::info!("Populated quiz {} with {} questions", quiz_id, picked.len());
        }

        tx.commit().await?;
        self.quiz_items(quiz_id).await
    }

    async fn add_quiz_question(&self, entry: QuizQuestion) -> Result<QuizQuestion, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(entry.quiz_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let has_attempts: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quiz_attempts WHERE quiz_id = $1)")
                .bind(entry.quiz_id)
                .fetch_one(&mut *tx)
                .await?;
        if has_attempts {
            return Err(AppError::InvalidState(
                "Quiz already has attempts; its question set is frozen".to_string(),
            ));
        }

        sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
            .bind(entry.question_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        let saved = sqlx::query_as::<_, QuizQuestion>(
            r#"
            INSERT INTO quiz_questions (quiz_id, question_id, points, position)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (quiz_id, question_id) DO UPDATE SET
                points = EXCLUDED.points,
                position = EXCLUDED.position
            RETURNING quiz_id, question_id, points, position
            "#,
        )
        .bind(entry.quiz_id)
        .bind(entry.question_id)
        .bind(entry.points)
        .bind(entry.position)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE quizzes
            SET total_questions = (SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = $1)
            WHERE id = $1
            "#,
        )
        .bind(entry.quiz_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn quiz_items(&self, quiz_id: i64) -> Result<Vec<QuizItem>, AppError> {
        let items = sqlx::query_as::<_, QuizItem>(
            r#"
            SELECT
                q.id, q.type, q.difficulty, q.topic, q.content, q.options,
                q.correct_answer, q.explanation, q.created_at,
                qq.points, qq.position
            FROM quiz_questions qq
            JOIN questions q ON q.id = qq.question_id
            WHERE qq.quiz_id = $1
            ORDER BY qq.position, q.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn create_attempt(&self, student_id: i64, quiz_id: i64) -> Result<QuizAttempt, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (student_id, quiz_id)
            VALUES ($1, $2)
            RETURNING id, student_id, quiz_id, status, start_time, end_time, score
            "#,
        )
        .bind(student_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(attempt)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, student_id, quiz_id, status, start_time, end_time, score
            FROM quiz_attempts
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRecord, AppError> {
        let record = sqlx::query_as::<_, AnswerRecord>(
            r#"
            INSERT INTO answer_records
                (attempt_id, question_id, submitted_answer, is_correct, points_earned, time_spent)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                submitted_answer = EXCLUDED.submitted_answer,
                is_correct = EXCLUDED.is_correct,
                points_earned = EXCLUDED.points_earned,
                time_spent = EXCLUDED.time_spent,
                answered_at = CURRENT_TIMESTAMP
            RETURNING attempt_id, question_id, submitted_answer, is_correct, points_earned, time_spent, answered_at
            "#,
        )
        .bind(answer.attempt_id)
        .bind(answer.question_id)
        .bind(&answer.submitted_answer)
        .bind(answer.is_correct)
        .bind(answer.points_earned)
        .bind(answer.time_spent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert answer record: {:?}", e);
            AppError::from(e)
        })?;

        Ok(record)
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError> {
        let records = sqlx::query_as::<_, AnswerRecord>(
            r#"
            SELECT attempt_id, question_id, submitted_answer, is_correct, points_earned, time_spent, answered_at
            FROM answer_records
            WHERE attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn complete_attempt(&self, attempt_id: i64, score: i32) -> Result<Option<QuizAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            UPDATE quiz_attempts
            SET status = 'completed', end_time = CURRENT_TIMESTAMP, score = $2
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, student_id, quiz_id, status, start_time, end_time, score
            "#,
        )
        .bind(attempt_id)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn attempts_for_student(&self, student_id: i64) -> Result<Vec<AttemptSummary>, AppError> {
        let attempts = sqlx::query_as::<_, AttemptSummary>(
            r#"
            SELECT
                a.id, a.quiz_id, z.title AS quiz_title, a.status,
                a.start_time, a.end_time, a.score, z.passing_score,
                a.score >= z.passing_score AS passed
            FROM quiz_attempts a
            JOIN quizzes z ON z.id = a.quiz_id
            WHERE a.student_id = $1
            ORDER BY a.start_time DESC, a.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, student_id, quiz_id, status, start_time, end_time, score
            FROM quiz_attempts
            WHERE quiz_id = $1
            ORDER BY id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn answer_facts_for_student(&self, student_id: i64) -> Result<Vec<AnswerFact>, AppError> {
        let facts = sqlx::query_as::<_, AnswerFact>(
            r#"
            SELECT r.attempt_id, r.question_id, q.topic, r.is_correct
            FROM answer_records r
            JOIN quiz_attempts a ON a.id = r.attempt_id
            JOIN quiz_questions qq ON qq.quiz_id = a.quiz_id AND qq.question_id = r.question_id
            JOIN questions q ON q.id = r.question_id
            WHERE a.student_id = $1 AND a.status = 'completed'
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(facts)
    }

    async fn answer_facts_for_quiz(&self, quiz_id: i64) -> Result<Vec<AnswerFact>, AppError> {
        let facts = sqlx::query_as::<_, AnswerFact>(
            r#"
            SELECT r.attempt_id, r.question_id, q.topic, r.is_correct
            FROM answer_records r
            JOIN quiz_attempts a ON a.id = r.attempt_id
            JOIN quiz_questions qq ON qq.quiz_id = a.quiz_id AND qq.question_id = r.question_id
            JOIN questions q ON q.id = r.question_id
            WHERE a.quiz_id = $1 AND a.status = 'completed'
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(facts)
    }
}
