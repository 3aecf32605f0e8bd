//! PawTag Core - Tag, entitlement and reconciliation business logic
//!
//! The four pillars:
//! - [`registry::Registry`] — tag code assignment lifecycle
//! - [`ledger::Ledger`] — append-only entitlement periods
//! - [`reconcile::ReconciliationEngine`] — payment-event reconciliation
//! - [`resolver::ScanResolver`] — scan-time profile/phone resolution
//!
//! # Example
//!
//! ```rust,ignore
//! use pawtag_core::{Ledger, ReconciliationEngine, WebhookHandler};
//!
//! let ledger = Ledger::new(periods);
//! let engine = ReconciliationEngine::new(
//!     ledger,
//!     provider,
//!     notifier,
//!     WebhookHandler::new("whsec_..."),
//! );
//!
//! engine.process_webhook(&body, signature).await?;
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod phone;
pub mod provider;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod stripe;
pub mod webhook;

pub use config::CoreConfig;
pub use error::TagError;
pub use ledger::{end_date_for, Ledger, NewPeriod};
pub use notify::{DeliveryMethod, HttpNotifier, Notifier};
pub use phone::{mask_phone, normalize_phone};
pub use provider::PaymentProvider;
pub use reconcile::{ConfirmCheckout, ReconciliationEngine, CREATION_GRACE_SECS};
pub use registry::{BulkDeleteReport, Registry};
pub use resolver::{PublicProfile, ScanResolver};
pub use stripe::StripeProvider;
pub use webhook::{WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};
