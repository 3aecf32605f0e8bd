//! Entitlement Ledger
//!
//! Append-only history of paid coverage periods. A period's financial
//! facts are never edited after insert; renewal creates a new row and
//! demotes the old one to `expired`, leaving an audit trail.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use pawtag_db::{CreatePeriod, PeriodRepository, PeriodRow};
use pawtag_types::{PeriodStatus, PlanType, TagCodeId, UserId};

use crate::error::TagError;

/// Input for creating a new entitlement period
#[derive(Debug, Clone)]
pub struct NewPeriod {
    pub user_id: UserId,
    pub tag_code_id: Option<TagCodeId>,
    pub plan: PlanType,
    pub amount_cents: i64,
    pub currency: String,
    pub stripe_subscription_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub auto_renew: bool,
}

/// Entitlement ledger service
#[derive(Clone)]
pub struct Ledger<P: PeriodRepository> {
    periods: Arc<P>,
}

impl<P: PeriodRepository> Ledger<P> {
    /// Create a new ledger over a period repository
    pub fn new(periods: Arc<P>) -> Self {
        Self { periods }
    }

    /// Access the underlying repository
    pub fn periods(&self) -> &Arc<P> {
        &self.periods
    }

    /// The period currently granting entitlement to a user, if any.
    /// At most one is expected; if the store holds more (pre-existing data
    /// defect) the most recently created wins. That tolerance lives in the
    /// repository query.
    pub async fn active_period_for(&self, user_id: UserId) -> Result<Option<PeriodRow>, TagError> {
        Ok(self.periods.find_active_by_user(user_id.0).await?)
    }

    /// The period currently granting entitlement to a specific tag code
    pub async fn active_period_for_tag(
        &self,
        tag_code_id: TagCodeId,
    ) -> Result<Option<PeriodRow>, TagError> {
        Ok(self.periods.find_active_by_tag(tag_code_id.0).await?)
    }

    /// Insert a new active period. `end_date` is computed from the plan:
    /// +1 calendar month, +1 calendar year, or the 100-year lifetime
    /// sentinel.
    #[instrument(skip(self, new))]
    pub async fn create_period(&self, new: NewPeriod) -> Result<PeriodRow, TagError> {
        let start = Utc::now();
        let end = end_date_for(new.plan, start);

        let row = self
            .periods
            .create(CreatePeriod {
                id: Uuid::new_v4(),
                user_id: new.user_id.0,
                tag_code_id: new.tag_code_id.map(|t| t.0),
                plan: new.plan.as_str().to_string(),
                start_date: start,
                end_date: end,
                stripe_subscription_id: new.stripe_subscription_id,
                stripe_payment_intent_id: new.stripe_payment_intent_id,
                amount_cents: new.amount_cents,
                currency: new.currency,
                auto_renew: new.auto_renew,
            })
            .await?;

        info!(period_id = %row.id, plan = %row.plan, "Entitlement period created");
        Ok(row)
    }

    /// Renew a period: insert a new row copying the user, tag link, plan,
    /// external subscription id and auto-renew flag, with dates recomputed
    /// from now, then demote the old row to `expired`. The old row's
    /// `start_date` and `amount_cents` are never touched.
    #[instrument(skip(self, existing))]
    pub async fn renew(
        &self,
        existing: &PeriodRow,
        payment_intent_id: Option<String>,
        amount_cents: i64,
    ) -> Result<PeriodRow, TagError> {
        let plan = existing
            .plan_type()
            .ok_or_else(|| TagError::Internal(format!("unknown plan: {}", existing.plan)))?;

        let start = Utc::now();
        let renewed = self
            .periods
            .create(CreatePeriod {
                id: Uuid::new_v4(),
                user_id: existing.user_id,
                tag_code_id: existing.tag_code_id,
                plan: existing.plan.clone(),
                start_date: start,
                end_date: end_date_for(plan, start),
                stripe_subscription_id: existing.stripe_subscription_id.clone(),
                stripe_payment_intent_id: payment_intent_id,
                amount_cents,
                currency: existing.currency.clone(),
                auto_renew: existing.auto_renew,
            })
            .await?;

        self.periods
            .update_status(existing.id, PeriodStatus::Expired.as_str())
            .await?;

        info!(
            old_period = %existing.id,
            new_period = %renewed.id,
            "Entitlement period renewed"
        );
        Ok(renewed)
    }

    /// Cancel the period matching an external subscription id, whatever
    /// its current status.
    #[instrument(skip(self))]
    pub async fn cancel(&self, stripe_subscription_id: &str) -> Result<(), TagError> {
        let period = self
            .periods
            .find_by_stripe_subscription_id(stripe_subscription_id)
            .await?
            .ok_or(TagError::PeriodNotFound)?;

        self.periods
            .update_status(period.id, PeriodStatus::Cancelled.as_str())
            .await?;

        info!(period_id = %period.id, "Entitlement period cancelled");
        Ok(())
    }
}

/// Compute an entitlement end date from a plan. Calendar arithmetic, not
/// fixed-length days; lifetime is a 100-year sentinel.
pub fn end_date_for(plan: PlanType, start: DateTime<Utc>) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(plan.months()))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
