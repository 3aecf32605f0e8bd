//! Mock repositories and gateways for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use pawtag_core::stripe::StripeSubscription;
use pawtag_core::{DeliveryMethod, Notifier, PaymentProvider, TagError};
use pawtag_db::{
    CreatePeriod, CreateTagCode, CustomerOrderRow, DbResult, GuestOrderRow, OrderRepository,
    PeriodRepository, PeriodRow, ProfileRepository, ProfileRow, TagCodeRepository, TagCodeRow,
    UserRepository, UserRow,
};
use pawtag_types::PlanType;

/// In-memory tag code repository
#[derive(Default, Clone)]
pub struct MockTagCodeRepository {
    tags: Arc<DashMap<Uuid, TagCodeRow>>,
    by_code: Arc<DashMap<String, Uuid>>,
}

impl MockTagCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagCodeRepository for MockTagCodeRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TagCodeRow>> {
        Ok(self.tags.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_code(&self, code: &str) -> DbResult<Option<TagCodeRow>> {
        Ok(self
            .by_code
            .get(code)
            .and_then(|id| self.tags.get(id.value()).map(|r| r.value().clone())))
    }

    async fn find_by_profile_id(&self, profile_id: Uuid) -> DbResult<Option<TagCodeRow>> {
        Ok(self
            .tags
            .iter()
            .find(|r| r.value().profile_id == Some(profile_id))
            .map(|r| r.value().clone()))
    }

    async fn claim_unassigned(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        order_kind: &str,
    ) -> DbResult<Option<TagCodeRow>> {
        // Check-and-set happens under the shard lock held by iter_mut, so
        // two concurrent claims can never take the same row.
        for mut entry in self.tags.iter_mut() {
            let tag = entry.value_mut();
            if tag.status == "unassigned" && !tag.has_given {
                tag.user_id = Some(user_id);
                tag.order_id = Some(order_id);
                tag.order_kind = Some(order_kind.to_string());
                tag.has_given = true;
                tag.status = "assigned".to_string();
                tag.updated_at = Utc::now();
                return Ok(Some(tag.clone()));
            }
        }
        Ok(None)
    }

    async fn record_scan(&self, id: Uuid) -> DbResult<TagCodeRow> {
        let mut tag = self
            .tags
            .get_mut(&id)
            .ok_or(pawtag_db::DbError::NotFound)?;
        tag.scanned_count += 1;
        tag.last_scanned_at = Some(Utc::now());
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn mark_verified(&self, id: Uuid, profile_id: Option<Uuid>) -> DbResult<TagCodeRow> {
        let mut tag = self
            .tags
            .get_mut(&id)
            .ok_or(pawtag_db::DbError::NotFound)?;
        tag.has_verified = true;
        tag.status = "verified".to_string();
        if tag.profile_id.is_none() {
            tag.profile_id = profile_id;
        }
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn link_profile(&self, id: Uuid, profile_id: Uuid) -> DbResult<()> {
        if let Some(mut tag) = self.tags.get_mut(&id) {
            if tag.profile_id.is_none() {
                tag.profile_id = Some(profile_id);
                tag.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn create_batch(&self, codes: Vec<CreateTagCode>) -> DbResult<Vec<TagCodeRow>> {
        let mut rows = Vec::with_capacity(codes.len());
        for code in codes {
            let row = TagCodeRow {
                id: code.id,
                code: code.code.clone(),
                image_url: code.image_url,
                has_given: false,
                has_verified: false,
                has_downloaded: false,
                status: "unassigned".to_string(),
                user_id: None,
                order_id: None,
                order_kind: None,
                profile_id: None,
                scanned_count: 0,
                last_scanned_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.by_code.insert(code.code, code.id);
            self.tags.insert(code.id, row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    async fn list(&self, limit: i64) -> DbResult<Vec<TagCodeRow>> {
        let mut rows: Vec<TagCodeRow> = self.tags.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn delete_if_unassigned(&self, id: Uuid) -> DbResult<bool> {
        let deletable = self
            .tags
            .get(&id)
            .map(|r| r.status == "unassigned")
            .unwrap_or(false);
        if deletable {
            if let Some((_, tag)) = self.tags.remove(&id) {
                self.by_code.remove(&tag.code);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// In-memory entitlement period repository
#[derive(Default, Clone)]
pub struct MockPeriodRepository {
    periods: Arc<DashMap<Uuid, PeriodRow>>,
}

impl MockPeriodRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a period directly, e.g. an aged one the public API cannot
    /// produce (the ledger always starts periods at now()).
    pub fn insert_period(&self, period: PeriodRow) {
        self.periods.insert(period.id, period);
    }

    /// Build an aged active period row for seeding
    pub fn aged_period(
        user_id: Uuid,
        tag_code_id: Option<Uuid>,
        plan: PlanType,
        stripe_subscription_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> PeriodRow {
        PeriodRow {
            id: Uuid::new_v4(),
            user_id,
            tag_code_id,
            plan: plan.as_str().to_string(),
            status: "active".to_string(),
            start_date,
            end_date,
            stripe_subscription_id: Some(stripe_subscription_id.to_string()),
            stripe_payment_intent_id: None,
            amount_cents: 499,
            currency: "usd".to_string(),
            auto_renew: true,
            created_at: start_date,
            updated_at: start_date,
        }
    }

    /// All periods for a subscription id, for assertions
    pub fn periods_for_subscription(&self, stripe_id: &str) -> Vec<PeriodRow> {
        let mut rows: Vec<PeriodRow> = self
            .periods
            .iter()
            .filter(|r| r.stripe_subscription_id.as_deref() == Some(stripe_id))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }
}

#[async_trait]
impl PeriodRepository for MockPeriodRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PeriodRow>> {
        Ok(self.periods.get(&id).map(|r| r.value().clone()))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Option<PeriodRow>> {
        let now = Utc::now();
        Ok(self
            .periods
            .iter()
            .filter(|r| r.user_id == user_id && r.status == "active" && r.end_date > now)
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn find_active_by_tag(&self, tag_code_id: Uuid) -> DbResult<Option<PeriodRow>> {
        let now = Utc::now();
        Ok(self
            .periods
            .iter()
            .filter(|r| {
                r.tag_code_id == Some(tag_code_id) && r.status == "active" && r.end_date > now
            })
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_id: &str,
    ) -> DbResult<Option<PeriodRow>> {
        Ok(self
            .periods
            .iter()
            .filter(|r| r.stripe_subscription_id.as_deref() == Some(stripe_id))
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn find_by_payment_intent_id(&self, intent_id: &str) -> DbResult<Option<PeriodRow>> {
        Ok(self
            .periods
            .iter()
            .find(|r| r.stripe_payment_intent_id.as_deref() == Some(intent_id))
            .map(|r| r.value().clone()))
    }

    async fn create(&self, period: CreatePeriod) -> DbResult<PeriodRow> {
        let row = PeriodRow {
            id: period.id,
            user_id: period.user_id,
            tag_code_id: period.tag_code_id,
            plan: period.plan,
            status: "active".to_string(),
            start_date: period.start_date,
            end_date: period.end_date,
            stripe_subscription_id: period.stripe_subscription_id,
            stripe_payment_intent_id: period.stripe_payment_intent_id,
            amount_cents: period.amount_cents,
            currency: period.currency,
            auto_renew: period.auto_renew,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.periods.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        if let Some(mut p) = self.periods.get_mut(&id) {
            p.status = status.to_string();
            p.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> DbResult<()> {
        if let Some(mut p) = self.periods.get_mut(&id) {
            if p.stripe_payment_intent_id.is_none() {
                p.stripe_payment_intent_id = Some(intent_id.to_string());
                p.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_amount_if_zero(&self, id: Uuid, amount_cents: i64) -> DbResult<()> {
        if let Some(mut p) = self.periods.get_mut(&id) {
            if p.amount_cents == 0 {
                p.amount_cents = amount_cents;
                p.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn update_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()> {
        if let Some(mut p) = self.periods.get_mut(&id) {
            p.end_date = end_date;
            p.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory profile repository
#[derive(Default, Clone)]
pub struct MockProfileRepository {
    profiles: Arc<DashMap<Uuid, ProfileRow>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: ProfileRow) {
        self.profiles.insert(profile.id, profile);
    }

    /// Build a profile row for seeding
    pub fn profile(
        user_id: Uuid,
        order_id: Option<Uuid>,
        order_kind: Option<&str>,
        name: &str,
    ) -> ProfileRow {
        ProfileRow {
            id: Uuid::new_v4(),
            user_id,
            order_id,
            order_kind: order_kind.map(|k| k.to_string()),
            name: name.to_string(),
            medical_notes: None,
            hide_name: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        Ok(self.profiles.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_order(
        &self,
        order_id: Uuid,
        order_kind: Option<&str>,
    ) -> DbResult<Option<ProfileRow>> {
        Ok(self
            .profiles
            .iter()
            .find(|r| {
                r.order_id == Some(order_id)
                    && match order_kind {
                        Some(kind) => r.order_kind.as_deref() == Some(kind),
                        None => true,
                    }
            })
            .map(|r| r.value().clone()))
    }
}

/// In-memory order repository for both shapes
#[derive(Default, Clone)]
pub struct MockOrderRepository {
    customer_orders: Arc<DashMap<Uuid, CustomerOrderRow>>,
    guest_orders: Arc<DashMap<Uuid, GuestOrderRow>>,
}

impl MockOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_customer_order(&self, user_id: Uuid, phone: Option<&str>) -> CustomerOrderRow {
        let row = CustomerOrderRow {
            id: Uuid::new_v4(),
            user_id,
            street: "12 Herzl Street".to_string(),
            city: "Tel Aviv".to_string(),
            postal_code: "6100000".to_string(),
            phone: phone.map(|p| p.to_string()),
            created_at: Utc::now(),
        };
        self.customer_orders.insert(row.id, row.clone());
        row
    }

    pub fn insert_guest_order(&self, phone: Option<&str>) -> GuestOrderRow {
        let row = GuestOrderRow {
            id: Uuid::new_v4(),
            email: "finder@example.com".to_string(),
            street: "4 Main Rd".to_string(),
            city: "Haifa".to_string(),
            postal_code: "3100000".to_string(),
            phone: phone.map(|p| p.to_string()),
            created_at: Utc::now(),
        };
        self.guest_orders.insert(row.id, row.clone());
        row
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn find_customer_order(&self, id: Uuid) -> DbResult<Option<CustomerOrderRow>> {
        Ok(self.customer_orders.get(&id).map(|r| r.value().clone()))
    }

    async fn find_guest_order(&self, id: Uuid) -> DbResult<Option<GuestOrderRow>> {
        Ok(self.guest_orders.get(&id).map(|r| r.value().clone()))
    }
}

/// In-memory user repository with a read-failure switch
#[derive(Default, Clone)]
pub struct MockUserRepository {
    users: Arc<DashMap<Uuid, UserRow>>,
    fail: Arc<AtomicBool>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, phone: Option<&str>) -> UserRow {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: format!("owner-{}@example.com", Uuid::new_v4()),
            phone: phone.map(|p| p.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.insert(row.id, row.clone());
        row
    }

    /// Make every subsequent read fail with a storage error
    pub fn fail_reads(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(pawtag_db::DbError::NotFound);
        }
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }
}

/// Recording notifier with a failure switch
#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let n = Self::default();
        n.fail.store(true, Ordering::SeqCst);
        n
    }

    fn record(&self, entry: String) -> Result<(), TagError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TagError::Upstream("gateway down".to_string()));
        }
        self.sent.lock().unwrap().push(entry);
        Ok(())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_renewal_notice(
        &self,
        user_id: pawtag_types::UserId,
        plan: PlanType,
        _end_date: DateTime<Utc>,
    ) -> Result<(), TagError> {
        self.record(format!("renewal:{user_id}:{plan}"))
    }

    async fn send_payment_failed_notice(
        &self,
        user_id: pawtag_types::UserId,
    ) -> Result<(), TagError> {
        self.record(format!("payment_failed:{user_id}"))
    }

    async fn send_location_share(
        &self,
        phone: &str,
        method: DeliveryMethod,
        location: &str,
    ) -> Result<(), TagError> {
        self.record(format!("location:{}:{phone}:{location}", method.as_str()))
    }
}

/// Canned payment provider
#[derive(Default)]
pub struct MockPaymentProvider {
    subscriptions: DashMap<String, StripeSubscription>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, id: &str, status: &str) -> Self {
        let now = Utc::now().timestamp();
        self.subscriptions.insert(
            id.to_string(),
            StripeSubscription {
                id: id.to_string(),
                status: status.to_string(),
                current_period_start: now,
                current_period_end: now + 30 * 24 * 60 * 60,
                cancel_at_period_end: false,
            },
        );
        self
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, TagError> {
        self.subscriptions
            .get(subscription_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| TagError::Upstream("no such subscription".to_string()))
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), TagError> {
        Ok(())
    }
}
