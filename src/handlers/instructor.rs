// src/handlers/instructor.rs

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};

use crate::{error::AppError, services::quiz as service, store::DynStore, utils::extract::AppPath};

/// Class-wide statistics for one quiz over completed attempts.
/// Instructor or admin.
pub async fn quiz_stats(
    State(store): State<DynStore>,
    AppPath(quiz_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let stats = service::quiz_stats(store.as_ref(), quiz_id).await?;
    Ok(Json(stats))
}
