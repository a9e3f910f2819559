// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, services::catalog};

/// Lists active exams, newest first.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = catalog::list_active(&pool).await?;
    Ok(Json(exams))
}

/// Retrieves a single exam by ID.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = catalog::find(&pool, id).await?;
    Ok(Json(exam))
}
