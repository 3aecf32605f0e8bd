//! Scan Resolver
//!
//! Decides, at scan time, whether a code reveals a profile or prompts
//! verification, and resolves a contact phone through the polymorphic
//! order chain. The public-profile read re-validates entitlement itself
//! rather than trusting any earlier scan decision.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use pawtag_db::{
    OrderRepository, PeriodRepository, ProfileRepository, ProfileRow, TagCodeRepository,
    TagCodeRow, UserRepository,
};
use pawtag_types::{OrderKind, OrderRef, ProfileId, ScanOutcome, TagCodeId, TagStatus};

use crate::error::TagError;
use crate::notify::{DeliveryMethod, Notifier};
use crate::phone::{mask_phone, normalize_phone};
use crate::registry::Registry;

/// Redacted public view of a profile. Never carries raw contact fields.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub profile_id: ProfileId,
    /// `None` when the owner set `hide_name`
    pub name: Option<String>,
    pub medical_notes: Option<String>,
    /// Street with the house number stripped, from the linked order
    pub street: Option<String>,
    /// Whether a finder can reach the owner through this service
    pub has_contact_info: bool,
}

/// Scan resolution service
pub struct ScanResolver<T, P, R, O, U, N>
where
    T: TagCodeRepository,
    P: PeriodRepository,
    R: ProfileRepository,
    O: OrderRepository,
    U: UserRepository,
    N: Notifier,
{
    tags: Arc<T>,
    // Scan counting and profile linking go through the registry so the
    // code lifecycle has a single owner.
    registry: Registry<T>,
    periods: Arc<P>,
    profiles: Arc<R>,
    orders: Arc<O>,
    users: Arc<U>,
    notifier: Arc<N>,
}

impl<T, P, R, O, U, N> ScanResolver<T, P, R, O, U, N>
where
    T: TagCodeRepository,
    P: PeriodRepository,
    R: ProfileRepository,
    O: OrderRepository,
    U: UserRepository,
    N: Notifier,
{
    /// Create a new resolver
    pub fn new(
        tags: Arc<T>,
        periods: Arc<P>,
        profiles: Arc<R>,
        orders: Arc<O>,
        users: Arc<U>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            registry: Registry::new(tags.clone()),
            tags,
            periods,
            profiles,
            orders,
            users,
            notifier,
        }
    }

    /// Resolve a scanned code to an action token. Every scan is recorded
    /// before entitlement is evaluated, verified or not.
    #[instrument(skip(self))]
    pub async fn resolve_scan(&self, code: &str) -> Result<ScanOutcome, TagError> {
        let tag = self.registry.record_scan(code).await?;

        if tag.tag_status() == TagStatus::Verified && self.tag_entitled(&tag).await? {
            if let Some(profile_id) = self.resolve_profile(&tag).await? {
                info!(code = %tag.code, profile_id = %profile_id, "Scan resolved to profile");
                return Ok(ScanOutcome::RedirectToProfile { profile_id });
            }
        }

        Ok(ScanOutcome::RedirectToVerification {
            tag_code_id: tag.id.into(),
        })
    }

    /// Redacted public profile, re-validated at read time.
    #[instrument(skip(self))]
    pub async fn public_profile(&self, profile_id: ProfileId) -> Result<PublicProfile, TagError> {
        let profile = self
            .profiles
            .find_by_id(profile_id.0)
            .await?
            .ok_or(TagError::ProfileNotFound)?;

        // Do not trust any prior scan decision: a verified code with an
        // active period must exist right now. Missing entitlement reads as
        // not-found so nothing about the profile leaks.
        let tag = self
            .tags
            .find_by_profile_id(profile.id)
            .await?
            .ok_or(TagError::ProfileNotFound)?;

        if tag.tag_status() != TagStatus::Verified || !self.tag_entitled(&tag).await? {
            return Err(TagError::ProfileNotFound);
        }

        let street = match self.load_order_street(profile.order_ref()).await {
            Ok(street) => street.map(|s| redact_street(&s)),
            Err(e) => {
                warn!(profile_id = %profile.id, error = %e, "Order lookup failed for street");
                None
            }
        };

        // Absent or unparseable phones read as unreachable; a storage
        // failure must not, or an outage would hide reachable owners.
        let has_contact_info = match self.resolve_contact_phone(&profile).await {
            Ok(_) => true,
            Err(TagError::PhoneNotFound | TagError::InvalidInput(_)) => false,
            Err(e) => return Err(e),
        };

        Ok(PublicProfile {
            profile_id,
            name: if profile.hide_name {
                None
            } else {
                Some(profile.name.clone())
            },
            medical_notes: profile.medical_notes.clone(),
            street,
            has_contact_info,
        })
    }

    /// Resolve the owner's contact phone through the fallback chain:
    /// order by recorded kind, then (kind unset) customer order, then
    /// guest order, then the owner's account phone. The first non-empty
    /// value is normalized; an unparseable number is a structured error,
    /// never a guess.
    pub async fn resolve_contact_phone(&self, profile: &ProfileRow) -> Result<String, TagError> {
        if let Some(order_ref) = profile.order_ref() {
            if let Some(raw) = self.order_phone(order_ref).await? {
                return normalize_phone(&raw);
            }
        }

        // Final fallback: the owner's account record
        if let Some(user) = self.users.find_by_id(profile.user_id).await? {
            if let Some(raw) = non_empty(user.phone) {
                return normalize_phone(&raw);
            }
        }

        Err(TagError::PhoneNotFound)
    }

    /// Validate entitlement, resolve the phone, and fire the location
    /// message. The send is best-effort; the masked phone is returned once
    /// the number resolved.
    #[instrument(skip(self, location))]
    pub async fn share_location(
        &self,
        profile_id: ProfileId,
        method: DeliveryMethod,
        location: &str,
    ) -> Result<String, TagError> {
        let profile = self
            .profiles
            .find_by_id(profile_id.0)
            .await?
            .ok_or(TagError::ProfileNotFound)?;

        let tag = self
            .tags
            .find_by_profile_id(profile.id)
            .await?
            .ok_or(TagError::ProfileNotFound)?;

        if tag.tag_status() != TagStatus::Verified || !self.tag_entitled(&tag).await? {
            return Err(TagError::ProfileNotFound);
        }

        let phone = self.resolve_contact_phone(&profile).await?;

        if let Err(e) = self
            .notifier
            .send_location_share(&phone, method, location)
            .await
        {
            warn!(profile_id = %profile_id, error = %e, "Location share could not be sent");
        }

        Ok(mask_phone(&phone))
    }

    /// A code is entitled when a period linked to it is active, or, for
    /// periods sold without a code link, when its owner has one.
    async fn tag_entitled(&self, tag: &TagCodeRow) -> Result<bool, TagError> {
        if self.periods.find_active_by_tag(tag.id).await?.is_some() {
            return Ok(true);
        }

        if let Some(user_id) = tag.user_id {
            return Ok(self.periods.find_active_by_user(user_id).await?.is_some());
        }

        Ok(false)
    }

    /// Direct profile link first; else search profiles sharing the code's
    /// order link and back-fill the direct link for next time.
    async fn resolve_profile(&self, tag: &TagCodeRow) -> Result<Option<ProfileId>, TagError> {
        if let Some(profile_id) = tag.profile_id {
            return Ok(Some(profile_id.into()));
        }

        let Some(order_ref) = tag.order_ref() else {
            return Ok(None);
        };

        let found = self
            .profiles
            .find_by_order(order_ref.id.0, order_ref.kind.map(|k| k.as_str()))
            .await?;

        if let Some(profile) = found {
            // One-time back-fill so subsequent scans are a single lookup
            self.registry
                .link_profile(TagCodeId(tag.id), ProfileId(profile.id))
                .await?;
            info!(code = %tag.code, profile_id = %profile.id, "Profile link back-filled");
            return Ok(Some(profile.id.into()));
        }

        Ok(None)
    }

    /// Phone from the order chain, honoring the recorded kind and falling
    /// back through both shapes when the kind is unset.
    async fn order_phone(&self, order_ref: OrderRef) -> Result<Option<String>, TagError> {
        let id = order_ref.id.0;

        match order_ref.kind {
            Some(OrderKind::Customer) => Ok(self
                .orders
                .find_customer_order(id)
                .await?
                .and_then(|o| non_empty(o.phone))),
            Some(OrderKind::Guest) => Ok(self
                .orders
                .find_guest_order(id)
                .await?
                .and_then(|o| non_empty(o.phone))),
            // Legacy rows with no kind tag: try the customer shape first,
            // then the guest shape.
            None => {
                if let Some(phone) = self
                    .orders
                    .find_customer_order(id)
                    .await?
                    .and_then(|o| non_empty(o.phone))
                {
                    return Ok(Some(phone));
                }
                Ok(self
                    .orders
                    .find_guest_order(id)
                    .await?
                    .and_then(|o| non_empty(o.phone)))
            }
        }
    }

    /// Street from the order chain, for the redacted public view
    async fn load_order_street(
        &self,
        order_ref: Option<OrderRef>,
    ) -> Result<Option<String>, TagError> {
        let Some(order_ref) = order_ref else {
            return Ok(None);
        };
        let id = order_ref.id.0;

        match order_ref.kind {
            Some(OrderKind::Customer) => Ok(self
                .orders
                .find_customer_order(id)
                .await?
                .map(|o| o.street)),
            Some(OrderKind::Guest) => Ok(self.orders.find_guest_order(id).await?.map(|o| o.street)),
            None => {
                if let Some(order) = self.orders.find_customer_order(id).await? {
                    return Ok(Some(order.street));
                }
                Ok(self.orders.find_guest_order(id).await?.map(|o| o.street))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keep only the street-name suffix: leading house-number tokens are
/// dropped so the public view never shows a full address.
fn redact_street(street: &str) -> String {
    street
        .split_whitespace()
        .skip_while(|token| token.chars().any(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_redaction_drops_house_numbers() {
        assert_eq!(redact_street("12 Herzl Street"), "Herzl Street");
        assert_eq!(redact_street("4b Main Rd"), "Main Rd");
        assert_eq!(redact_street("Herzl Street"), "Herzl Street");
        assert_eq!(redact_street(""), "");
    }

    #[test]
    fn empty_phones_do_not_count() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(
            non_empty(Some("052".to_string())),
            Some("052".to_string())
        );
    }
}
