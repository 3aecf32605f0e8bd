//! Core errors

use thiserror::Error;

/// Errors produced by registry, ledger, reconciliation and resolver logic
#[derive(Error, Debug)]
pub enum TagError {
    /// Tag code not found
    #[error("tag code not found")]
    TagNotFound,

    /// Profile not found (or not currently visible)
    #[error("profile not found")]
    ProfileNotFound,

    /// Entitlement period not found
    #[error("entitlement period not found")]
    PeriodNotFound,

    /// No contact phone reachable through the fallback chain
    #[error("contact phone not found")]
    PhoneNotFound,

    /// No unassigned tag code left to claim
    #[error("no unassigned tag codes available")]
    Exhausted,

    /// Malformed caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Webhook signature or payload rejected before any mutation
    #[error("webhook error: {0}")]
    WebhookError(String),

    /// Operation refused for the current state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payment processor or notification gateway call failed
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] pawtag_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl TagError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TagNotFound | Self::ProfileNotFound | Self::PeriodNotFound | Self::PhoneNotFound
        )
    }
}
