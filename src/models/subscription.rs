// src/models/subscription.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Local mirror of the payment processor's subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Canceled,
}

/// Represents the 'subscriptions' table in the database (one row per account).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub account_id: i64,
    pub customer_ref: Option<String>,
    pub subscription_ref: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<chrono::DateTime<chrono::Utc>>,
}
