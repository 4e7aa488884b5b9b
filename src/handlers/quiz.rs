// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    config::Config,
    error::AppError,
    models::attempt::{StartAdaptiveRequest, StartTimedExamRequest, SubmitAnswerRequest},
    services::quiz as service,
    store::DynStore,
    utils::{
        extract::{AppJson, AppPath},
        jwt::Claims,
    },
};

/// Starts an attempt on the quiz attached to a module.
///
/// The module's quiz is populated from the question bank the first time it is
/// taken (topic-matched questions first); later starts reuse the same set.
pub async fn start_module_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppPath(module_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let started = service::start_module_quiz(store.as_ref(), claims.user_id()?, module_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Builds a one-off timed exam and starts an attempt on it.
pub async fn start_timed_exam(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<StartTimedExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started =
        service::start_timed_exam(store.as_ref(), claims.user_id()?, config.default_passing_score, &req).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Builds a one-off quiz at the requested difficulty and starts an attempt on it.
pub async fn start_adaptive(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<StartAdaptiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started =
        service::start_adaptive(store.as_ref(), claims.user_id()?, config.default_passing_score, &req).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Records (or overwrites) the caller's answer to one question of an open attempt.
pub async fn submit_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = service::submit_answer(store.as_ref(), claims.user_id()?, attempt_id, &req).await?;
    Ok(Json(result))
}

pub async fn get_progress(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let progress = service::get_progress(store.as_ref(), claims.user_id()?, attempt_id).await?;
    Ok(Json(progress))
}

/// Scores and closes the attempt. A second call fails with `invalid_state`.
pub async fn finish_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = service::finish_attempt(store.as_ref(), claims.user_id()?, attempt_id).await?;
    Ok(Json(result))
}

pub async fn get_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = service::get_attempt_detail(store.as_ref(), claims.user_id()?, attempt_id).await?;
    Ok(Json(detail))
}

/// The caller's attempt history, newest first.
pub async fn list_attempts(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = service::list_attempts(store.as_ref(), claims.user_id()?).await?;
    Ok(Json(attempts))
}

pub async fn get_analytics(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let analytics = service::student_analytics(store.as_ref(), claims.user_id()?).await?;
    Ok(Json(analytics))
}

/// Lists training modules with their quiz settings.
pub async fn list_modules(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let modules = store.list_modules().await?;
    Ok(Json(modules))
}
