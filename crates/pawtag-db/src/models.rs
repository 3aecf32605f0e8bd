//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use pawtag_types::{OrderKind, OrderRef, PeriodStatus, PlanType, TagStatus};

/// Tag code row from the database
#[derive(Debug, Clone, FromRow)]
pub struct TagCodeRow {
    pub id: Uuid,
    pub code: String,
    pub image_url: Option<String>,
    pub has_given: bool,
    pub has_verified: bool,
    pub has_downloaded: bool,
    pub status: String,
    pub user_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub order_kind: Option<String>,
    pub profile_id: Option<Uuid>,
    pub scanned_count: i64,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entitlement period row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PeriodRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tag_code_id: Option<Uuid>,
    pub plan: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pet profile row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub order_kind: Option<String>,
    pub name: String,
    pub medical_notes: Option<String>,
    pub hide_name: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated-user order row
#[derive(Debug, Clone, FromRow)]
pub struct CustomerOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Guest/anonymous order row
#[derive(Debug, Clone, FromRow)]
pub struct GuestOrderRow {
    pub id: Uuid,
    pub email: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User account row
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Conversion helpers from row strings to pawtag-types domain enums

impl TagCodeRow {
    /// Parsed lifecycle status. Falls back to `Unassigned` for rows with a
    /// corrupt status column rather than failing reads.
    pub fn tag_status(&self) -> TagStatus {
        self.status.parse().unwrap_or(TagStatus::Unassigned)
    }

    /// Polymorphic order reference, if any
    pub fn order_ref(&self) -> Option<OrderRef> {
        self.order_id.map(|id| {
            OrderRef::new(
                id.into(),
                self.order_kind.as_deref().and_then(OrderKind::parse_lossy),
            )
        })
    }
}

impl PeriodRow {
    /// Parsed period status. Corrupt rows read as `Expired` so they can
    /// never grant entitlement by accident.
    pub fn period_status(&self) -> PeriodStatus {
        self.status.parse().unwrap_or(PeriodStatus::Expired)
    }

    /// Parsed plan type, if the stored plan string is recognized
    pub fn plan_type(&self) -> Option<PlanType> {
        self.plan.parse().ok()
    }

    /// Whether this period currently grants entitlement
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        self.period_status() == PeriodStatus::Active && self.end_date > now
    }
}

impl ProfileRow {
    /// Polymorphic order reference, if any
    pub fn order_ref(&self) -> Option<OrderRef> {
        self.order_id.map(|id| {
            OrderRef::new(
                id.into(),
                self.order_kind.as_deref().and_then(OrderKind::parse_lossy),
            )
        })
    }
}
