//! Reconciliation Engine
//!
//! Applies asynchronous payment-processor events to local entitlement
//! state at most once per genuine charge. Delivery is at-least-once and
//! possibly out of order; correctness comes from the duplicate-suppression
//! ladder below, which checks-then-writes against stable external ids
//! (payment-intent id, subscription id) instead of taking locks. The
//! residual check/write race window is accepted as a rare tolerated
//! duplicate risk.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};

use pawtag_db::{PeriodRepository, PeriodRow};
use pawtag_types::{PlanType, TagCodeId, UserId};

use crate::error::TagError;
use crate::ledger::{Ledger, NewPeriod};
use crate::notify::Notifier;
use crate::provider::PaymentProvider;
use crate::webhook::{InvoiceData, SubscriptionData, WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};

/// How long after a period's creation an `invoice.paid` event is treated
/// as an echo of the synchronous confirmation flow rather than a renewal.
/// A heuristic tolerance for the confirmation/webhook race, not a proof
/// of correctness.
pub const CREATION_GRACE_SECS: i64 = 300;

/// Billing reason Stripe stamps on the first invoice of a subscription
const REASON_SUBSCRIPTION_CREATE: &str = "subscription_create";

/// Input for the synchronous confirmation flow
#[derive(Debug, Clone)]
pub struct ConfirmCheckout {
    pub user_id: UserId,
    pub tag_code_id: Option<TagCodeId>,
    pub plan: PlanType,
    pub amount_cents: i64,
    pub currency: String,
    pub stripe_subscription_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub auto_renew: bool,
}

/// Reconciliation engine over a period store, payment provider and
/// notification gateway.
pub struct ReconciliationEngine<P, Pay, N>
where
    P: PeriodRepository,
    Pay: PaymentProvider,
    N: Notifier,
{
    ledger: Ledger<P>,
    provider: Arc<Pay>,
    notifier: Arc<N>,
    webhook: WebhookHandler,
}

impl<P, Pay, N> ReconciliationEngine<P, Pay, N>
where
    P: PeriodRepository,
    Pay: PaymentProvider,
    N: Notifier,
{
    /// Create a new engine
    pub fn new(
        ledger: Ledger<P>,
        provider: Arc<Pay>,
        notifier: Arc<N>,
        webhook: WebhookHandler,
    ) -> Self {
        Self {
            ledger,
            provider,
            notifier,
            webhook,
        }
    }

    /// Verify a raw webhook body and apply its event.
    ///
    /// Signature and parse failures propagate (the caller answers 400 and
    /// nothing was mutated). Handler failures for an authenticated event
    /// are logged and swallowed so the event is still acknowledged to the
    /// source; the processor redelivers and the ladder keeps redelivery
    /// harmless.
    #[instrument(skip(self, payload, signature))]
    pub async fn process_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), TagError> {
        let event = self.webhook.verify_and_parse(payload, signature)?;

        if let Err(e) = self.dispatch(&event).await {
            error!(
                event_id = %event.id,
                error = %e,
                "Webhook event handling failed; acknowledging anyway"
            );
        }

        Ok(())
    }

    /// Dispatch a verified event by type
    async fn dispatch(&self, event: &WebhookEvent) -> Result<(), TagError> {
        match (&event.event_type, &event.data) {
            (WebhookEventType::InvoicePaid, WebhookEventData::Invoice(inv)) => {
                self.handle_invoice_paid(inv).await
            }
            (WebhookEventType::InvoicePaymentFailed, WebhookEventData::Invoice(inv)) => {
                self.handle_payment_failed(inv).await
            }
            (WebhookEventType::CustomerSubscriptionCreated, WebhookEventData::Subscription(sub)) => {
                // The synchronous confirmation path owns record creation;
                // this event can race the confirmation response.
                info!(subscription_id = %sub.subscription_id, "Subscription created (no-op)");
                Ok(())
            }
            (WebhookEventType::CustomerSubscriptionUpdated, WebhookEventData::Subscription(sub)) => {
                self.handle_subscription_updated(sub).await
            }
            (WebhookEventType::CustomerSubscriptionDeleted, WebhookEventData::Subscription(sub)) => {
                self.handle_subscription_deleted(sub).await
            }
            (WebhookEventType::Unknown(kind), _) => {
                info!(event_type = %kind, "Unhandled webhook event type acknowledged");
                Ok(())
            }
            _ => {
                warn!(event_id = %event.id, "Webhook event carried unexpected data shape");
                Ok(())
            }
        }
    }

    /// Apply a "payment succeeded" event through the duplicate-suppression
    /// ladder. Each rung short-circuits; only an event surviving every
    /// rung is a genuine renewal.
    async fn handle_invoice_paid(&self, inv: &InvoiceData) -> Result<(), TagError> {
        let Some(sub_id) = inv.subscription_id.as_deref() else {
            info!(invoice_id = %inv.invoice_id, "Invoice without subscription; dropping");
            return Ok(());
        };

        // Resolve the local period; nothing to reconcile without one.
        let Some(period) = self
            .ledger
            .periods()
            .find_by_stripe_subscription_id(sub_id)
            .await?
        else {
            info!(subscription_id = %sub_id, "No local period for subscription; dropping");
            return Ok(());
        };

        // (a) Initial subscription-creation invoice: the period was already
        // created synchronously by the confirmation step. Only backfill a
        // missing payment-intent id.
        if inv.billing_reason.as_deref() == Some(REASON_SUBSCRIPTION_CREATE) {
            if let Some(pi) = inv.payment_intent_id.as_deref() {
                if period.stripe_payment_intent_id.is_none() {
                    self.ledger
                        .periods()
                        .set_payment_intent(period.id, pi)
                        .await?;
                }
            }
            info!(subscription_id = %sub_id, "Initial invoice; skipped");
            return Ok(());
        }

        // (b) Zero amount: setup/trial artifact.
        if inv.amount_cents == 0 {
            info!(invoice_id = %inv.invoice_id, "Zero-amount invoice; skipped");
            return Ok(());
        }

        // (c) A period already bears this payment-intent id: redelivery.
        if let Some(pi) = inv.payment_intent_id.as_deref() {
            if let Some(existing) = self
                .ledger
                .periods()
                .find_by_payment_intent_id(pi)
                .await?
            {
                if existing.amount_cents == 0 && inv.amount_cents > 0 {
                    self.ledger
                        .periods()
                        .set_amount_if_zero(existing.id, inv.amount_cents)
                        .await?;
                }
                info!(payment_intent = %pi, "Duplicate payment intent; skipped");
                return Ok(());
            }
        }

        let now = Utc::now();

        // (d) Period created moments ago and already active: echo of the
        // confirmation flow.
        if period.period_status() == pawtag_types::PeriodStatus::Active
            && now - period.start_date < Duration::seconds(CREATION_GRACE_SECS)
        {
            info!(period_id = %period.id, "Within creation grace window; skipped");
            return Ok(());
        }

        // (e) Already entitled: renewed by an earlier delivery or not due.
        if period.is_entitled(now) {
            info!(period_id = %period.id, "Period already active; skipped");
            return Ok(());
        }

        // Genuine renewal.
        let renewed = self
            .ledger
            .renew(
                &period,
                inv.payment_intent_id.clone(),
                inv.amount_cents,
            )
            .await?;

        self.notify_renewal(&renewed).await;
        Ok(())
    }

    /// A single failed charge never expires the subscription; the
    /// processor retries on its own schedule.
    async fn handle_payment_failed(&self, inv: &InvoiceData) -> Result<(), TagError> {
        let Some(sub_id) = inv.subscription_id.as_deref() else {
            return Ok(());
        };

        let Some(period) = self
            .ledger
            .periods()
            .find_by_stripe_subscription_id(sub_id)
            .await?
        else {
            info!(subscription_id = %sub_id, "Payment failed for unknown subscription");
            return Ok(());
        };

        warn!(
            period_id = %period.id,
            invoice_id = %inv.invoice_id,
            "Payment failed; awaiting processor retry"
        );

        if let Err(e) = self
            .notifier
            .send_payment_failed_notice(UserId(period.user_id))
            .await
        {
            warn!(error = %e, "Payment-failed notice could not be sent");
        }

        Ok(())
    }

    async fn handle_subscription_updated(&self, sub: &SubscriptionData) -> Result<(), TagError> {
        let Some(period) = self
            .ledger
            .periods()
            .find_by_stripe_subscription_id(&sub.subscription_id)
            .await?
        else {
            info!(subscription_id = %sub.subscription_id, "Update for unknown subscription; dropping");
            return Ok(());
        };

        match sub.status.as_str() {
            "canceled" | "unpaid" => {
                self.ledger
                    .periods()
                    .update_status(period.id, pawtag_types::PeriodStatus::Cancelled.as_str())
                    .await?;
                info!(period_id = %period.id, "Period cancelled from subscription update");
            }
            "active" => {
                self.ledger
                    .periods()
                    .update_end_date(period.id, sub.period_end)
                    .await?;
                info!(period_id = %period.id, end_date = %sub.period_end, "Period end refreshed");
            }
            other => {
                info!(status = %other, "Subscription update with unhandled status");
            }
        }

        Ok(())
    }

    async fn handle_subscription_deleted(&self, sub: &SubscriptionData) -> Result<(), TagError> {
        match self.ledger.cancel(&sub.subscription_id).await {
            Ok(()) => Ok(()),
            Err(TagError::PeriodNotFound) => {
                info!(subscription_id = %sub.subscription_id, "Delete for unknown subscription; dropping");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Synchronous confirmation flow: validate the subscription with the
    /// processor, then create the authoritative local period. The ladder's
    /// rungs (a) and (d) protect this record from the processor's own
    /// creation-time events.
    #[instrument(skip(self, req))]
    pub async fn confirm_checkout(&self, req: ConfirmCheckout) -> Result<PeriodRow, TagError> {
        let sub = self
            .provider
            .get_subscription(&req.stripe_subscription_id)
            .await?;

        if !matches!(sub.status.as_str(), "active" | "trialing") {
            return Err(TagError::Conflict(format!(
                "subscription {} is {}, not active",
                req.stripe_subscription_id, sub.status
            )));
        }

        // Confirmation retries are idempotent: an entitled period for this
        // subscription id is simply returned.
        if let Some(existing) = self
            .ledger
            .periods()
            .find_by_stripe_subscription_id(&req.stripe_subscription_id)
            .await?
        {
            if existing.is_entitled(Utc::now()) {
                info!(period_id = %existing.id, "Confirmation replay; returning existing period");
                return Ok(existing);
            }
        }

        self.ledger
            .create_period(NewPeriod {
                user_id: req.user_id,
                tag_code_id: req.tag_code_id,
                plan: req.plan,
                amount_cents: req.amount_cents,
                currency: req.currency,
                stripe_subscription_id: Some(req.stripe_subscription_id),
                stripe_payment_intent_id: req.stripe_payment_intent_id,
                auto_renew: req.auto_renew,
            })
            .await
    }

    /// Best-effort renewal notice; failure never rolls the renewal back.
    async fn notify_renewal(&self, renewed: &PeriodRow) {
        let Some(plan) = renewed.plan_type() else {
            return;
        };

        if let Err(e) = self
            .notifier
            .send_renewal_notice(UserId(renewed.user_id), plan, renewed.end_date)
            .await
        {
            warn!(period_id = %renewed.id, error = %e, "Renewal notice could not be sent");
        }
    }
}
