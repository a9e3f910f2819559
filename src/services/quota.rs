// src/services/quota.rs

use crate::models::account::{Account, Tier};

/// Why an account may not start another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    LimitReached,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::LimitReached => {
                "Attempt limit reached. Upgrade to Pro to keep practicing."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allow,
    Deny(DenyReason),
}

/// Decides whether `account` may start a new attempt.
///
/// Pro accounts skip the limit entirely; free accounts are allowed while
/// `attempts_used < attempts_limit`. This is the advisory check done before
/// generating questions. The binding check is the conditional increment in
/// [`crate::services::attempts::create_attempt`].
pub fn can_start_attempt(account: &Account) -> QuotaDecision {
    match account.tier {
        Tier::Pro => QuotaDecision::Allow,
        Tier::Free if account.attempts_used < account.attempts_limit => QuotaDecision::Allow,
        Tier::Free => QuotaDecision::Deny(DenyReason::LimitReached),
    }
}
