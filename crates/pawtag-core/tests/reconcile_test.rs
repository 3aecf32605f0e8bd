//! Reconciliation engine integration tests
//!
//! Drives webhook bodies through the full verify/parse/dispatch path and
//! asserts the duplicate-suppression ladder against an in-memory store.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::mock_repos::{MockNotifier, MockPaymentProvider, MockPeriodRepository};
use common::{invoice_paid_payload, sign_payload, subscription_event_payload};
use pawtag_core::{
    ConfirmCheckout, Ledger, NewPeriod, ReconciliationEngine, TagError, WebhookHandler,
};
use pawtag_types::{PlanType, UserId};

const SECRET: &str = "whsec_test";

struct Harness {
    periods: Arc<MockPeriodRepository>,
    notifier: Arc<MockNotifier>,
    engine: ReconciliationEngine<MockPeriodRepository, MockPaymentProvider, MockNotifier>,
}

fn harness(provider: MockPaymentProvider, notifier: MockNotifier) -> Harness {
    let periods = Arc::new(MockPeriodRepository::new());
    let notifier = Arc::new(notifier);
    let engine = ReconciliationEngine::new(
        Ledger::new(periods.clone()),
        Arc::new(provider),
        notifier.clone(),
        WebhookHandler::new(SECRET),
    );
    Harness {
        periods,
        notifier,
        engine,
    }
}

/// Seed a monthly period whose coverage already lapsed, old enough to be
/// outside the creation grace window.
fn seed_lapsed_period(h: &Harness, sub_id: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    let start = Utc::now() - Duration::days(40);
    let end = Utc::now() - Duration::days(9);
    h.periods.insert_period(MockPeriodRepository::aged_period(
        user_id,
        None,
        PlanType::Monthly,
        sub_id,
        start,
        end,
    ));
    user_id
}

async fn deliver(h: &Harness, payload: &[u8]) {
    let sig = sign_payload(payload, SECRET);
    h.engine.process_webhook(payload, &sig).await.unwrap();
}

#[tokio::test]
async fn genuine_renewal_appends_period_and_expires_old() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_renew");

    let payload = invoice_paid_payload("sub_renew", Some("pi_cycle_1"), "subscription_cycle", 499);
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_renew");
    assert_eq!(rows.len(), 2);

    let old = &rows[0];
    let renewed = &rows[1];
    assert_eq!(old.status, "expired");
    assert_eq!(renewed.status, "active");
    assert_eq!(renewed.stripe_payment_intent_id.as_deref(), Some("pi_cycle_1"));
    assert_eq!(renewed.amount_cents, 499);
    assert!(renewed.end_date > Utc::now());
    // The old row's financial facts stay untouched
    assert_eq!(old.amount_cents, 499);
    assert!(old.end_date < Utc::now());

    assert_eq!(h.notifier.sent_count(), 1);
}

#[tokio::test]
async fn redelivered_invoice_with_same_payment_intent_renews_once() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_dup");

    let payload = invoice_paid_payload("sub_dup", Some("pi_dup"), "subscription_cycle", 499);
    deliver(&h, &payload).await;
    deliver(&h, &payload).await;
    deliver(&h, &payload).await;

    assert_eq!(h.periods.periods_for_subscription("sub_dup").len(), 2);
    assert_eq!(h.notifier.sent_count(), 1);
}

#[tokio::test]
async fn initial_invoice_only_backfills_payment_intent() {
    let h = harness(
        MockPaymentProvider::new().with_subscription("sub_new", "active"),
        MockNotifier::new(),
    );

    // Synchronous confirmation creates the period without a payment intent
    let period = h
        .engine
        .confirm_checkout(ConfirmCheckout {
            user_id: UserId::new(),
            tag_code_id: None,
            plan: PlanType::Monthly,
            amount_cents: 499,
            currency: "usd".to_string(),
            stripe_subscription_id: "sub_new".to_string(),
            stripe_payment_intent_id: None,
            auto_renew: true,
        })
        .await
        .unwrap();
    assert!(period.stripe_payment_intent_id.is_none());

    let payload = invoice_paid_payload("sub_new", Some("pi_first"), "subscription_create", 499);
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_new");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].stripe_payment_intent_id.as_deref(), Some("pi_first"));
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn zero_amount_invoice_is_dropped() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_zero");

    let payload = invoice_paid_payload("sub_zero", Some("pi_zero"), "subscription_cycle", 0);
    deliver(&h, &payload).await;

    assert_eq!(h.periods.periods_for_subscription("sub_zero").len(), 1);
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn invoice_within_creation_grace_window_is_dropped() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());

    // Freshly created period: start stamps at now, inside the window
    let ledger = Ledger::new(h.periods.clone());
    ledger
        .create_period(NewPeriod {
            user_id: UserId::new(),
            tag_code_id: None,
            plan: PlanType::Monthly,
            amount_cents: 499,
            currency: "usd".to_string(),
            stripe_subscription_id: Some("sub_fresh".to_string()),
            stripe_payment_intent_id: None,
            auto_renew: true,
        })
        .await
        .unwrap();

    let payload = invoice_paid_payload("sub_fresh", Some("pi_echo"), "subscription_cycle", 499);
    deliver(&h, &payload).await;

    assert_eq!(h.periods.periods_for_subscription("sub_fresh").len(), 1);
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn entitled_period_is_not_renewed_again() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    // Active, aged past the grace window, coverage still running
    h.periods.insert_period(MockPeriodRepository::aged_period(
        Uuid::new_v4(),
        None,
        PlanType::Monthly,
        "sub_live",
        Utc::now() - Duration::days(10),
        Utc::now() + Duration::days(20),
    ));

    let payload = invoice_paid_payload("sub_live", Some("pi_early"), "subscription_cycle", 499);
    deliver(&h, &payload).await;

    assert_eq!(h.periods.periods_for_subscription("sub_live").len(), 1);
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn invoice_for_unknown_subscription_is_acknowledged() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());

    let payload = invoice_paid_payload("sub_ghost", Some("pi_ghost"), "subscription_cycle", 499);
    deliver(&h, &payload).await;

    assert_eq!(h.periods.periods_for_subscription("sub_ghost").len(), 0);
}

#[tokio::test]
async fn payment_failure_sends_notice_without_touching_the_ledger() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    h.periods.insert_period(MockPeriodRepository::aged_period(
        Uuid::new_v4(),
        None,
        PlanType::Monthly,
        "sub_fail",
        Utc::now() - Duration::days(10),
        Utc::now() + Duration::days(20),
    ));

    let payload = serde_json::to_vec(&serde_json::json!({
        "id": "evt_fail",
        "type": "invoice.payment_failed",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "id": "in_fail",
            "status": "open",
            "billing_reason": "subscription_cycle",
            "payment_intent": "pi_fail",
            "subscription": "sub_fail",
            "amount_due": 499,
            "amount_paid": 0,
            "currency": "usd"
        }}
    }))
    .unwrap();
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_fail");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "active");

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("payment_failed:"));
}

#[tokio::test]
async fn notifier_failure_never_rolls_back_a_renewal() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::failing());
    seed_lapsed_period(&h, "sub_noisy");

    let payload = invoice_paid_payload("sub_noisy", Some("pi_noisy"), "subscription_cycle", 499);
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_noisy");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].status, "active");
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn subscription_update_to_canceled_cancels_the_period() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_upd");

    let payload = subscription_event_payload(
        "customer.subscription.updated",
        "sub_upd",
        "canceled",
        Utc::now().timestamp(),
    );
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_upd");
    assert_eq!(rows[0].status, "cancelled");
}

#[tokio::test]
async fn subscription_update_active_refreshes_end_date() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_ext");

    let new_end = (Utc::now() + Duration::days(45)).timestamp();
    let payload = subscription_event_payload(
        "customer.subscription.updated",
        "sub_ext",
        "active",
        new_end,
    );
    deliver(&h, &payload).await;

    let rows = h.periods.periods_for_subscription("sub_ext");
    assert_eq!(rows[0].end_date.timestamp(), new_end);
}

#[tokio::test]
async fn subscription_deletion_cancels_and_tolerates_unknown_ids() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_del");

    let payload = subscription_event_payload(
        "customer.subscription.deleted",
        "sub_del",
        "canceled",
        Utc::now().timestamp(),
    );
    deliver(&h, &payload).await;
    assert_eq!(
        h.periods.periods_for_subscription("sub_del")[0].status,
        "cancelled"
    );

    // A delete for a subscription we never recorded is still acknowledged
    let payload = subscription_event_payload(
        "customer.subscription.deleted",
        "sub_never",
        "canceled",
        Utc::now().timestamp(),
    );
    deliver(&h, &payload).await;
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_nothing_mutates() {
    let h = harness(MockPaymentProvider::new(), MockNotifier::new());
    seed_lapsed_period(&h, "sub_sig");

    let payload = invoice_paid_payload("sub_sig", Some("pi_sig"), "subscription_cycle", 499);
    let sig = sign_payload(&payload, "whsec_wrong");

    let result = h.engine.process_webhook(&payload, &sig).await;
    assert!(matches!(result, Err(TagError::WebhookError(_))));
    assert_eq!(h.periods.periods_for_subscription("sub_sig").len(), 1);
}

#[tokio::test]
async fn confirm_checkout_rejects_subscriptions_that_are_not_active() {
    let h = harness(
        MockPaymentProvider::new().with_subscription("sub_bad", "incomplete"),
        MockNotifier::new(),
    );

    let result = h
        .engine
        .confirm_checkout(ConfirmCheckout {
            user_id: UserId::new(),
            tag_code_id: None,
            plan: PlanType::Yearly,
            amount_cents: 4900,
            currency: "usd".to_string(),
            stripe_subscription_id: "sub_bad".to_string(),
            stripe_payment_intent_id: None,
            auto_renew: true,
        })
        .await;

    assert!(matches!(result, Err(TagError::Conflict(_))));
    assert_eq!(h.periods.periods_for_subscription("sub_bad").len(), 0);
}

#[tokio::test]
async fn confirm_checkout_replay_returns_the_existing_period() {
    let h = harness(
        MockPaymentProvider::new().with_subscription("sub_ok", "active"),
        MockNotifier::new(),
    );

    let req = ConfirmCheckout {
        user_id: UserId::new(),
        tag_code_id: None,
        plan: PlanType::Yearly,
        amount_cents: 4900,
        currency: "usd".to_string(),
        stripe_subscription_id: "sub_ok".to_string(),
        stripe_payment_intent_id: Some("pi_ok".to_string()),
        auto_renew: true,
    };

    let first = h.engine.confirm_checkout(req.clone()).await.unwrap();
    let second = h.engine.confirm_checkout(req).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.periods.periods_for_subscription("sub_ok").len(), 1);
}
