//! Code Registry
//!
//! Owns the assignment lifecycle of physical tag codes:
//! unassigned → assigned → verified (→ lost). Once assigned, a code is
//! never deleted; bulk deletion only touches unassigned stock.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use pawtag_db::{CreateTagCode, TagCodeRepository, TagCodeRow};
use pawtag_types::{OrderId, OrderKind, ProfileId, TagCodeId, TagStatus, UserId};

use crate::error::TagError;

/// Length of the random part of a generated code
const CODE_LEN: usize = 10;

/// Result of a bulk code deletion: partial success with a report
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteReport {
    /// Codes actually deleted
    pub deleted: Vec<TagCodeId>,
    /// Codes refused because they are no longer unassigned
    pub skipped: Vec<TagCodeId>,
}

/// Tag code registry service
#[derive(Clone)]
pub struct Registry<T: TagCodeRepository> {
    tags: Arc<T>,
}

impl<T: TagCodeRepository> Registry<T> {
    /// Create a new registry over a tag code repository
    pub fn new(tags: Arc<T>) -> Self {
        Self { tags }
    }

    /// Claim one free code for an order. The claim is a conditional update
    /// in the store, so two concurrent orders can never receive the same
    /// code. Fails with `Exhausted` when stock runs out; callers treat
    /// that as out-of-stock, not a crash.
    #[instrument(skip(self))]
    pub async fn assign(
        &self,
        user_id: UserId,
        order_id: OrderId,
        order_kind: OrderKind,
    ) -> Result<TagCodeRow, TagError> {
        let claimed = self
            .tags
            .claim_unassigned(user_id.0, order_id.0, order_kind.as_str())
            .await?;

        match claimed {
            Some(tag) => {
                info!(code = %tag.code, order_id = %order_id, "Tag code assigned");
                Ok(tag)
            }
            None => {
                warn!(order_id = %order_id, "No unassigned tag codes left");
                Err(TagError::Exhausted)
            }
        }
    }

    /// Record a scan. Every scan counts, verified or not, before any
    /// entitlement is evaluated.
    pub async fn record_scan(&self, code: &str) -> Result<TagCodeRow, TagError> {
        let tag = self
            .tags
            .find_by_code(code)
            .await?
            .ok_or(TagError::TagNotFound)?;

        Ok(self.tags.record_scan(tag.id).await?)
    }

    /// Mark a code verified, linking a profile if supplied and none is
    /// linked yet. Only assigned codes can be verified; a code still in
    /// stock has no owner to verify against. Idempotent: verifying an
    /// already-verified code is a no-op that still returns the row.
    #[instrument(skip(self))]
    pub async fn verify(
        &self,
        code: &str,
        profile_id: Option<ProfileId>,
    ) -> Result<TagCodeRow, TagError> {
        let tag = self
            .tags
            .find_by_code(code)
            .await?
            .ok_or(TagError::TagNotFound)?;

        if tag.tag_status() == TagStatus::Unassigned {
            return Err(TagError::Conflict(format!(
                "code {} has not been assigned to an order",
                tag.code
            )));
        }

        if tag.tag_status() == TagStatus::Verified && tag.profile_id.is_some() {
            return Ok(tag);
        }

        let updated = self
            .tags
            .mark_verified(tag.id, profile_id.map(|p| p.0))
            .await?;

        info!(code = %updated.code, "Tag code verified");
        Ok(updated)
    }

    /// Back-fill the direct profile link after an indirect (order-chain)
    /// resolution so later scans are a single lookup.
    pub async fn link_profile(
        &self,
        tag_id: TagCodeId,
        profile_id: ProfileId,
    ) -> Result<(), TagError> {
        Ok(self.tags.link_profile(tag_id.0, profile_id.0).await?)
    }

    /// Mint a batch of fresh unassigned codes (operator-only).
    #[instrument(skip(self))]
    pub async fn generate_batch(&self, count: u32) -> Result<Vec<TagCodeRow>, TagError> {
        if count == 0 || count > 10_000 {
            return Err(TagError::InvalidInput(format!(
                "batch size {count} out of range 1-10000"
            )));
        }

        let codes = (0..count)
            .map(|_| CreateTagCode {
                id: Uuid::new_v4(),
                code: generate_code(),
                image_url: None,
            })
            .collect();

        let rows = self.tags.create_batch(codes).await?;
        info!(count = rows.len(), "Tag code batch generated");
        Ok(rows)
    }

    /// List codes, newest first (operator-only).
    pub async fn list(&self, limit: i64) -> Result<Vec<TagCodeRow>, TagError> {
        Ok(self.tags.list(limit).await?)
    }

    /// Bulk-delete codes. Codes that are no longer unassigned are skipped
    /// and reported, not failed.
    #[instrument(skip(self, ids))]
    pub async fn delete_codes(&self, ids: Vec<TagCodeId>) -> Result<BulkDeleteReport, TagError> {
        let mut report = BulkDeleteReport::default();

        for id in ids {
            if self.tags.delete_if_unassigned(id.0).await? {
                report.deleted.push(id);
            } else {
                report.skipped.push(id);
            }
        }

        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            "Bulk code deletion finished"
        );
        Ok(report)
    }
}

/// Generate a random scannable code string
fn generate_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("PT-{suffix}")
}
