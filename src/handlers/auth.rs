// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{Config, FREE_ATTEMPTS_LIMIT},
    db::is_unique_violation,
    error::AppError,
    models::account::{Account, CreateAccountRequest, LoginRequest, Tier},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new account on the free tier.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the account object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let email = payload.email.trim().to_lowercase();

    let account = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (name, email, password, tier, attempts_used, attempts_limit)
        VALUES ($1, $2, $3, $4, 0, $5)
        RETURNING id, name, email, password, role, tier,
                  attempts_used, attempts_limit, billing_customer_ref, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(&email)
    .bind(&hashed_password)
    .bind(Tier::Free)
    .bind(FREE_ATTEMPTS_LIMIT)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("An account with email '{}' already exists", email))
        } else {
            tracing::error!("Failed to register account: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Authenticates an account and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the account's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, name, email, password, role, tier,
               attempts_used, attempts_limit, billing_customer_ref, created_at
        FROM accounts
        WHERE email = $1
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let account = account.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &account.password)? {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(
        account.id,
        &account.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "tier": account.tier
    })))
}
