// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    generation::SharedGenerator,
    models::attempt::{CreateAttemptRequest, SubmitAttemptRequest},
    services::attempts,
    utils::jwt::Claims,
};

/// Starts a new attempt on an exam.
///
/// * Enforces the caller's quota.
/// * Generates the exam's questions with the configured backend.
/// * Returns 201 with the questions; answers and explanations are withheld.
pub async fn create_attempt(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(generator): State<SharedGenerator>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let created = attempts::create_attempt(
        &pool,
        generator.as_ref(),
        config.generation.timeout(),
        claims.account_id()?,
        req.exam_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Lists the caller's attempts.
pub async fn list_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let list = attempts::list_attempts(&pool, claims.account_id()?).await?;
    Ok(Json(list))
}

/// Submits the answers of an attempt and returns the score.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let result = attempts::submit_attempt(&pool, claims.account_id()?, &req.answers).await?;
    Ok(Json(result))
}

/// Retrieves the graded view of one of the caller's attempts.
pub async fn get_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = attempts::get_results(&pool, claims.account_id()?, id).await?;
    Ok(Json(results))
}
