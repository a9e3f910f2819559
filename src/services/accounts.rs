// src/services/accounts.rs

use sqlx::SqliteExecutor;

use crate::{error::AppError, models::account::Account};

pub async fn find<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Account, AppError> {
    sqlx::query_as::<_, Account>(
        r#"
        SELECT id, name, email, password, role, tier,
               attempts_used, attempts_limit, billing_customer_ref, created_at
        FROM accounts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Account not found".to_string()))
}

pub async fn find_by_customer_ref<'e, E: SqliteExecutor<'e>>(
    executor: E,
    customer_ref: &str,
) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, name, email, password, role, tier,
               attempts_used, attempts_limit, billing_customer_ref, created_at
        FROM accounts
        WHERE billing_customer_ref = $1
        "#,
    )
    .bind(customer_ref)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Resolves an account through its local subscription record, matching
/// either the customer ref or the subscription ref stored there.
pub async fn find_by_subscription<'e, E: SqliteExecutor<'e>>(
    executor: E,
    customer_ref: &str,
    subscription_ref: Option<&str>,
) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT a.id, a.name, a.email, a.password, a.role, a.tier,
               a.attempts_used, a.attempts_limit, a.billing_customer_ref, a.created_at
        FROM accounts a
        JOIN subscriptions s ON s.account_id = a.id
        WHERE s.customer_ref = $1
           OR ($2 IS NOT NULL AND s.subscription_ref = $2)
        ORDER BY s.updated_at DESC
        LIMIT 1
        "#,
    )
    .bind(customer_ref)
    .bind(subscription_ref)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}
