// src/handlers/admin.rs

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::{CreateQuestionRequest, NewQuestion, QuestionType},
        quiz::{AddQuizQuestionRequest, CreateModuleRequest, NewModule, QuizQuestion},
        user::AdminCreateUserRequest,
    },
    store::DynStore,
    utils::{
        extract::{AppJson, AppPath},
        hash::hash_password,
        html::{clean_html, clean_optional},
    },
};

/// Creates an account with an explicit role (e.g. an instructor).
/// Admin only.
pub async fn create_user(
    State(store): State<DynStore>,
    AppJson(payload): AppJson<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let user = store
        .create_user(&payload.username, &hashed_password, payload.role)
        .await?;

    tracing::info!("Admin created {} account {}", user.role, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Adds a question to the bank.
/// Admin only.
pub async fn create_question(
    State(store): State<DynStore>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload
        .check_answer_shape()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    // A multiple-choice answer must stay equal to the option it names.
    let correct_answer = match payload.question_type {
        QuestionType::MultipleChoice => clean_html(&payload.correct_answer),
        _ => payload.correct_answer,
    };

    let question = store
        .create_question(NewQuestion {
            question_type: payload.question_type,
            difficulty: payload.difficulty,
            topic: payload.topic,
            content: clean_html(&payload.content),
            options: payload
                .options
                .map(|options| options.iter().map(|o| clean_html(o)).collect()),
            correct_answer,
            explanation: clean_optional(payload.explanation.as_deref()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists the whole bank, answers included.
/// Admin only.
pub async fn list_questions(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let questions = store.list_questions().await?;
    Ok(Json(questions))
}

/// Creates a module together with its quiz definition.
/// The quiz's questions are drawn the first time a student starts it.
/// Admin only.
pub async fn create_module(
    State(store): State<DynStore>,
    State(config): State<Config>,
    AppJson(payload): AppJson<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (module, quiz) = store
        .create_module(NewModule {
            title: payload.title,
            topic: payload.topic,
            description: clean_optional(payload.description.as_deref()),
            question_count: payload.question_count,
            time_limit: payload.time_limit,
            passing_score: payload.passing_score.unwrap_or(config.default_passing_score),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "module": module, "quiz": quiz })),
    ))
}

/// Attaches a bank question to a quiz with explicit points and position.
/// Rejected once anyone has attempted the quiz.
/// Admin only.
pub async fn add_quiz_question(
    State(store): State<DynStore>,
    AppPath(quiz_id): AppPath<i64>,
    AppJson(payload): AppJson<AddQuizQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let entry = store
        .add_quiz_question(QuizQuestion {
            quiz_id,
            question_id: payload.question_id,
            points: payload.points,
            position: payload.position,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
