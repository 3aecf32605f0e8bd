//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// Tag code repository trait
#[async_trait]
pub trait TagCodeRepository: Send + Sync {
    /// Find a tag code by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TagCodeRow>>;

    /// Find a tag code by its scannable code string
    async fn find_by_code(&self, code: &str) -> DbResult<Option<TagCodeRow>>;

    /// Find the tag code linked to a profile
    async fn find_by_profile_id(&self, profile_id: Uuid) -> DbResult<Option<TagCodeRow>>;

    /// Atomically claim one free code (`status = unassigned`, `has_given =
    /// false`) for an order. Must be a conditional single-statement update
    /// so two concurrent orders can never claim the same code. Returns
    /// `None` when no free code exists.
    async fn claim_unassigned(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        order_kind: &str,
    ) -> DbResult<Option<TagCodeRow>>;

    /// Increment the scan counter and stamp `last_scanned_at`
    async fn record_scan(&self, id: Uuid) -> DbResult<TagCodeRow>;

    /// Mark a code verified, linking a profile if supplied and none is set
    async fn mark_verified(&self, id: Uuid, profile_id: Option<Uuid>) -> DbResult<TagCodeRow>;

    /// Back-fill the direct profile link (first indirect resolution)
    async fn link_profile(&self, id: Uuid, profile_id: Uuid) -> DbResult<()>;

    /// Bulk-insert freshly minted codes
    async fn create_batch(&self, codes: Vec<CreateTagCode>) -> DbResult<Vec<TagCodeRow>>;

    /// List codes, newest first
    async fn list(&self, limit: i64) -> DbResult<Vec<TagCodeRow>>;

    /// Delete a code only if it is still unassigned. Returns whether a row
    /// was deleted.
    async fn delete_if_unassigned(&self, id: Uuid) -> DbResult<bool>;
}

/// Create tag code input
#[derive(Debug, Clone)]
pub struct CreateTagCode {
    pub id: Uuid,
    pub code: String,
    pub image_url: Option<String>,
}

/// Entitlement period repository trait
#[async_trait]
pub trait PeriodRepository: Send + Sync {
    /// Find a period by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PeriodRow>>;

    /// Find the period currently granting entitlement to a user
    /// (`status = active` and `end_date > now()`), newest first
    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Option<PeriodRow>>;

    /// Find the period currently granting entitlement to a tag code
    async fn find_active_by_tag(&self, tag_code_id: Uuid) -> DbResult<Option<PeriodRow>>;

    /// Find the most recent period for an external subscription id
    async fn find_by_stripe_subscription_id(
        &self,
        stripe_id: &str,
    ) -> DbResult<Option<PeriodRow>>;

    /// Find a period bearing a payment-intent id
    async fn find_by_payment_intent_id(&self, intent_id: &str) -> DbResult<Option<PeriodRow>>;

    /// Insert a new period
    async fn create(&self, period: CreatePeriod) -> DbResult<PeriodRow>;

    /// Update a period's status
    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()>;

    /// Back-fill a missing payment-intent id. Must not overwrite an
    /// existing value.
    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> DbResult<()>;

    /// Back-fill the amount on a period created with a zero amount. Must
    /// not overwrite a nonzero value.
    async fn set_amount_if_zero(&self, id: Uuid, amount_cents: i64) -> DbResult<()>;

    /// Refresh the entitlement end date from processor data
    async fn update_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()>;
}

/// Create period input
#[derive(Debug, Clone)]
pub struct CreatePeriod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tag_code_id: Option<Uuid>,
    pub plan: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub auto_renew: bool,
}

/// Pet profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find a profile by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>>;

    /// Find a profile by its order link. When `order_kind` is `Some` the
    /// kind must match; when `None` any kind matches (legacy rows).
    async fn find_by_order(
        &self,
        order_id: Uuid,
        order_kind: Option<&str>,
    ) -> DbResult<Option<ProfileRow>>;
}

/// Order repository trait covering both order shapes
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an authenticated-user order
    async fn find_customer_order(&self, id: Uuid) -> DbResult<Option<CustomerOrderRow>>;

    /// Find a guest order
    async fn find_guest_order(&self, id: Uuid) -> DbResult<Option<GuestOrderRow>>;
}

/// User account repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>>;
}
