//! PostgreSQL entitlement period repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::PeriodRow;
use crate::repo::{CreatePeriod, PeriodRepository};

const COLUMNS: &str = "id, user_id, tag_code_id, plan, status, start_date, end_date, \
     stripe_subscription_id, stripe_payment_intent_id, amount_cents, currency, \
     auto_renew, created_at, updated_at";

/// PostgreSQL entitlement period repository
#[derive(Clone)]
pub struct PgPeriodRepository {
    pool: PgPool,
}

impl PgPeriodRepository {
    /// Create a new period repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PeriodRepository for PgPeriodRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PeriodRow>> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {COLUMNS} FROM entitlement_periods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Option<PeriodRow>> {
        // More than one matching row is a pre-existing data defect; the
        // most recently created row is authoritative.
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {COLUMNS} FROM entitlement_periods \
             WHERE user_id = $1 AND status = 'active' AND end_date > NOW() \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_active_by_tag(&self, tag_code_id: Uuid) -> DbResult<Option<PeriodRow>> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {COLUMNS} FROM entitlement_periods \
             WHERE tag_code_id = $1 AND status = 'active' AND end_date > NOW() \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .bind(tag_code_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_id: &str,
    ) -> DbResult<Option<PeriodRow>> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {COLUMNS} FROM entitlement_periods \
             WHERE stripe_subscription_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .bind(stripe_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_payment_intent_id(&self, intent_id: &str) -> DbResult<Option<PeriodRow>> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {COLUMNS} FROM entitlement_periods \
             WHERE stripe_payment_intent_id = $1 \
             LIMIT 1"
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, period: CreatePeriod) -> DbResult<PeriodRow> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "INSERT INTO entitlement_periods \
                 (id, user_id, tag_code_id, plan, status, start_date, end_date, \
                  stripe_subscription_id, stripe_payment_intent_id, amount_cents, \
                  currency, auto_renew) \
             VALUES ($1, $2, $3, $4, 'active', $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        ))
        .bind(period.id)
        .bind(period.user_id)
        .bind(period.tag_code_id)
        .bind(&period.plan)
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(&period.stripe_subscription_id)
        .bind(&period.stripe_payment_intent_id)
        .bind(period.amount_cents)
        .bind(&period.currency)
        .bind(period.auto_renew)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        sqlx::query("UPDATE entitlement_periods SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> DbResult<()> {
        // Financial facts are append-only; only a missing value may be filled.
        sqlx::query(
            "UPDATE entitlement_periods \
             SET stripe_payment_intent_id = $1, updated_at = NOW() \
             WHERE id = $2 AND stripe_payment_intent_id IS NULL",
        )
        .bind(intent_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_amount_if_zero(&self, id: Uuid, amount_cents: i64) -> DbResult<()> {
        sqlx::query(
            "UPDATE entitlement_periods \
             SET amount_cents = $1, updated_at = NOW() \
             WHERE id = $2 AND amount_cents = 0",
        )
        .bind(amount_cents)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE entitlement_periods SET end_date = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(end_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
