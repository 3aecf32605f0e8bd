//! Application state for the Tag API service.

use std::sync::Arc;

use pawtag_core::{
    HttpNotifier, Ledger, ReconciliationEngine, Registry, ScanResolver, StripeProvider,
    WebhookHandler,
};
use pawtag_db::pg::{
    PgOrderRepository, PgPeriodRepository, PgProfileRepository, PgTagCodeRepository,
    PgUserRepository, Repositories,
};
use pawtag_db::DbPool;

use crate::config::Config;

/// Reconciliation engine over the Postgres store
pub type Engine = ReconciliationEngine<PgPeriodRepository, StripeProvider, HttpNotifier>;

/// Scan resolver over the Postgres store
pub type Resolver = ScanResolver<
    PgTagCodeRepository,
    PgPeriodRepository,
    PgProfileRepository,
    PgOrderRepository,
    PgUserRepository,
    HttpNotifier,
>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Tag code assignment lifecycle
    pub registry: Arc<Registry<PgTagCodeRepository>>,
    /// Payment-event reconciliation and checkout confirmation
    pub engine: Arc<Engine>,
    /// Scan-time profile and phone resolution
    pub resolver: Arc<Resolver>,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services over the shared repositories
    pub fn new(repos: Repositories, pool: DbPool, config: Config) -> Self {
        let tags = Arc::new(repos.tag_codes);
        let periods = Arc::new(repos.periods);
        let profiles = Arc::new(repos.profiles);
        let orders = Arc::new(repos.orders);
        let users = Arc::new(repos.users);

        let notifier = Arc::new(HttpNotifier::new(
            config.core.notify_base_url.clone(),
            config.core.notify_token.clone(),
        ));
        let provider = Arc::new(StripeProvider::new(config.core.clone()));

        let registry = Arc::new(Registry::new(tags.clone()));
        let engine = Arc::new(ReconciliationEngine::new(
            Ledger::new(periods.clone()),
            provider,
            notifier.clone(),
            WebhookHandler::new(config.core.stripe_webhook_secret.clone()),
        ));
        let resolver = Arc::new(ScanResolver::new(
            tags, periods, profiles, orders, users, notifier,
        ));

        Self {
            registry,
            engine,
            resolver,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
