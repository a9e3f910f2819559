// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, UpdateExamRequest},
    services::catalog,
};

/// Adds an exam to the catalog.
/// Admin only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let exam = catalog::create(&pool, &payload).await?;
    tracing::info!(exam_id = exam.id, "Exam '{}' created", exam.name);

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Updates exam fields, including deactivation.
/// Admin only.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let exam = catalog::update(&pool, id, &payload).await?;
    Ok(Json(exam))
}
