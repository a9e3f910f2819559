use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError, models::account::MeResponse, services::accounts, utils::jwt::Claims,
};

/// Get current account's profile and remaining quota.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let account = accounts::find(&pool, claims.account_id()?).await?;
    Ok(Json(MeResponse::from(account)))
}
