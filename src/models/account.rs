// src/models/account.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Subscription level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

/// Represents the 'accounts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,

    pub name: String,

    /// Unique login email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Account role: 'user' or 'admin'.
    pub role: String,

    pub tier: Tier,

    /// Attempts created so far. Only ever incremented.
    pub attempts_used: i64,

    /// Free-tier ceiling for `attempts_used`. Ignored for pro accounts.
    pub attempts_limit: i64,

    /// Customer reference at the payment processor, set on first checkout.
    pub billing_customer_ref: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Profile of the current account, including quota state.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub tier: Tier,
    pub attempts_used: i64,
    /// `None` for pro accounts, which have no ceiling.
    pub attempts_limit: Option<i64>,
    pub attempts_remaining: Option<i64>,
}

impl From<Account> for MeResponse {
    fn from(account: Account) -> Self {
        let (attempts_limit, attempts_remaining) = match account.tier {
            Tier::Pro => (None, None),
            Tier::Free => (
                Some(account.attempts_limit),
                Some((account.attempts_limit - account.attempts_used).max(0)),
            ),
        };

        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            tier: account.tier,
            attempts_used: account.attempts_used,
            attempts_limit,
            attempts_remaining,
        }
    }
}

/// DTO for creating a new account (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "Email address is invalid."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for account login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
