// src/services/billing.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::FREE_ATTEMPTS_LIMIT,
    error::AppError,
    models::{account::Tier, subscription::SubscriptionStatus},
    services::accounts,
};

/// Subscription lifecycle event from the payment processor, reduced to the
/// fields that affect quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// Checkout finished; the account becomes pro.
    Activated {
        customer_ref: Option<String>,
        /// Account id carried in the checkout metadata, when present.
        account_id: Option<i64>,
        subscription_ref: Option<String>,
    },
    /// Remote status changed; only `active` keeps pro.
    Updated {
        customer_ref: String,
        subscription_ref: Option<String>,
        status: String,
        current_period_end: Option<DateTime<Utc>>,
    },
    Canceled {
        customer_ref: String,
        subscription_ref: Option<String>,
    },
    Unrecognized {
        kind: String,
    },
}

/// What applying an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied { account_id: i64 },
    AccountNotFound,
    Ignored,
}

#[derive(Deserialize)]
struct WebhookPayload {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: Option<String>,
    customer: String,
    status: Option<String>,
    current_period_end: Option<i64>,
}

impl BillingEvent {
    /// Decodes a raw webhook body. Unknown kinds decode to `Unrecognized`;
    /// known kinds with a malformed object are a validation error.
    pub fn from_payload(body: &[u8]) -> Result<Self, AppError> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;

        let event = match payload.kind.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = serde_json::from_value(payload.data.object)?;
                let account_id = match session.metadata.get("account_id") {
                    Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                        AppError::Validation(format!("Invalid account_id metadata '{}'", raw))
                    })?),
                    None => None,
                };
                if account_id.is_none() && session.customer.is_none() {
                    return Err(AppError::Validation(
                        "Checkout event has neither customer nor account metadata".to_string(),
                    ));
                }
                BillingEvent::Activated {
                    customer_ref: session.customer,
                    account_id,
                    subscription_ref: session.subscription,
                }
            }
            "customer.subscription.updated" => {
                let sub: SubscriptionObject = serde_json::from_value(payload.data.object)?;
                BillingEvent::Updated {
                    customer_ref: sub.customer,
                    subscription_ref: sub.id,
                    status: sub.status.unwrap_or_default(),
                    current_period_end: sub
                        .current_period_end
                        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
                }
            }
            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = serde_json::from_value(payload.data.object)?;
                BillingEvent::Canceled {
                    customer_ref: sub.customer,
                    subscription_ref: sub.id,
                }
            }
            _ => BillingEvent::Unrecognized { kind: payload.kind },
        };

        Ok(event)
    }
}

/// Tier and limit an account should have given a remote subscription status.
fn entitlement(active: bool) -> (Tier, i64) {
    if active {
        (Tier::Pro, FREE_ATTEMPTS_LIMIT)
    } else {
        (Tier::Free, FREE_ATTEMPTS_LIMIT)
    }
}

/// Applies a billing event to the account it refers to.
///
/// Every write is an assignment keyed by account, so replaying an event
/// converges to the same state. The limit is reset to the free ceiling on
/// every transition; pro accounts ignore it.
pub async fn apply_event(pool: &SqlitePool, event: &BillingEvent) -> Result<SyncOutcome, AppError> {
    match event {
        BillingEvent::Activated {
            customer_ref,
            account_id,
            subscription_ref,
        } => {
            let account = match (account_id, customer_ref) {
                (Some(id), _) => match accounts::find(pool, *id).await {
                    Ok(account) => Some(account),
                    Err(AppError::NotFound(_)) => None,
                    Err(e) => return Err(e),
                },
                (None, Some(customer)) => accounts::find_by_customer_ref(pool, customer).await?,
                (None, None) => None,
            };
            let Some(account) = account else {
                tracing::warn!("Activation for unknown account (customer {:?})", customer_ref);
                return Ok(SyncOutcome::AccountNotFound);
            };

            let (tier, limit) = entitlement(true);
            let mut tx = pool.begin().await?;

            sqlx::query(
                r#"
                UPDATE accounts
                SET tier = $1, attempts_limit = $2,
                    billing_customer_ref = COALESCE($3, billing_customer_ref)
                WHERE id = $4
                "#,
            )
            .bind(tier)
            .bind(limit)
            .bind(customer_ref)
            .bind(account.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO subscriptions (account_id, customer_ref, subscription_ref, status, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT(account_id) DO UPDATE SET
                    customer_ref = COALESCE(excluded.customer_ref, subscriptions.customer_ref),
                    subscription_ref = COALESCE(excluded.subscription_ref, subscriptions.subscription_ref),
                    status = excluded.status,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(account.id)
            .bind(customer_ref.as_deref().or(account.billing_customer_ref.as_deref()))
            .bind(subscription_ref)
            .bind(SubscriptionStatus::Active)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            tracing::info!(account_id = account.id, "Subscription activated");
            Ok(SyncOutcome::Applied {
                account_id: account.id,
            })
        }

        BillingEvent::Updated {
            customer_ref,
            subscription_ref,
            status,
            current_period_end,
        } => {
            let active = status == "active";
            let sub_status = if active {
                SubscriptionStatus::Active
            } else {
                SubscriptionStatus::Inactive
            };
            sync_status(
                pool,
                customer_ref,
                subscription_ref.as_deref(),
                active,
                sub_status,
                *current_period_end,
            )
            .await
        }

        BillingEvent::Canceled {
            customer_ref,
            subscription_ref,
        } => {
            sync_status(
                pool,
                customer_ref,
                subscription_ref.as_deref(),
                false,
                SubscriptionStatus::Canceled,
                None,
            )
            .await
        }

        BillingEvent::Unrecognized { kind } => {
            tracing::info!("Unhandled billing event type: {}", kind);
            Ok(SyncOutcome::Ignored)
        }
    }
}

/// Shared path of `Updated` and `Canceled`: locate the account, then assign
/// tier, limit and subscription status.
///
/// The account is found by its customer ref, else through the local
/// subscription record. The latter covers activations that carried only the
/// account id; the customer ref is then backfilled on the account.
async fn sync_status(
    pool: &SqlitePool,
    customer_ref: &str,
    subscription_ref: Option<&str>,
    active: bool,
    status: SubscriptionStatus,
    current_period_end: Option<DateTime<Utc>>,
) -> Result<SyncOutcome, AppError> {
    let account = match accounts::find_by_customer_ref(pool, customer_ref).await? {
        Some(account) => Some(account),
        None => accounts::find_by_subscription(pool, customer_ref, subscription_ref).await?,
    };
    let Some(account) = account else {
        tracing::warn!("Billing event for unknown customer {}", customer_ref);
        return Ok(SyncOutcome::AccountNotFound);
    };

    let (tier, limit) = entitlement(active);
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE accounts
        SET tier = $1, attempts_limit = $2,
            billing_customer_ref = COALESCE(billing_customer_ref, $3)
        WHERE id = $4
        "#,
    )
    .bind(tier)
    .bind(limit)
    .bind(customer_ref)
    .bind(account.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO subscriptions
            (account_id, customer_ref, subscription_ref, status, current_period_end, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT(account_id) DO UPDATE SET
            customer_ref = excluded.customer_ref,
            subscription_ref = COALESCE(excluded.subscription_ref, subscriptions.subscription_ref),
            status = excluded.status,
            current_period_end = COALESCE(excluded.current_period_end, subscriptions.current_period_end),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account.id)
    .bind(customer_ref)
    .bind(subscription_ref)
    .bind(status)
    .bind(current_period_end)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(account_id = account.id, ?status, "Subscription status synced");
    Ok(SyncOutcome::Applied {
        account_id: account.id,
    })
}
