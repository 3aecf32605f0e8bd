//! PostgreSQL tag code repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::TagCodeRow;
use crate::repo::{CreateTagCode, TagCodeRepository};

const COLUMNS: &str = "id, code, image_url, has_given, has_verified, has_downloaded, \
     status, user_id, order_id, order_kind, profile_id, \
     scanned_count, last_scanned_at, created_at, updated_at";

/// PostgreSQL tag code repository
#[derive(Clone)]
pub struct PgTagCodeRepository {
    pool: PgPool,
}

impl PgTagCodeRepository {
    /// Create a new tag code repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagCodeRepository for PgTagCodeRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TagCodeRow>> {
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "SELECT {COLUMNS} FROM tag_codes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_code(&self, code: &str) -> DbResult<Option<TagCodeRow>> {
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "SELECT {COLUMNS} FROM tag_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_profile_id(&self, profile_id: Uuid) -> DbResult<Option<TagCodeRow>> {
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "SELECT {COLUMNS} FROM tag_codes WHERE profile_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn claim_unassigned(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        order_kind: &str,
    ) -> DbResult<Option<TagCodeRow>> {
        // Single-statement conditional claim. SKIP LOCKED keeps concurrent
        // orders from blocking on (or receiving) the same row.
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "UPDATE tag_codes \
             SET user_id = $1, order_id = $2, order_kind = $3, \
                 has_given = TRUE, status = 'assigned', updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM tag_codes \
                 WHERE status = 'unassigned' AND has_given = FALSE \
                 ORDER BY created_at \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        ))
        .bind(user_id)
        .bind(order_id)
        .bind(order_kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn record_scan(&self, id: Uuid) -> DbResult<TagCodeRow> {
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "UPDATE tag_codes \
             SET scanned_count = scanned_count + 1, \
                 last_scanned_at = NOW(), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn mark_verified(&self, id: Uuid, profile_id: Option<Uuid>) -> DbResult<TagCodeRow> {
        let row = sqlx::query_as::<_, TagCodeRow>(&format!(
            "UPDATE tag_codes \
             SET has_verified = TRUE, status = 'verified', \
                 profile_id = COALESCE(profile_id, $2), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn link_profile(&self, id: Uuid, profile_id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE tag_codes SET profile_id = $2, updated_at = NOW() \
             WHERE id = $1 AND profile_id IS NULL",
        )
        .bind(id)
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_batch(&self, codes: Vec<CreateTagCode>) -> DbResult<Vec<TagCodeRow>> {
        let mut rows = Vec::with_capacity(codes.len());

        for code in codes {
            let row = sqlx::query_as::<_, TagCodeRow>(&format!(
                "INSERT INTO tag_codes (id, code, image_url) \
                 VALUES ($1, $2, $3) \
                 RETURNING {COLUMNS}"
            ))
            .bind(code.id)
            .bind(&code.code)
            .bind(&code.image_url)
            .fetch_one(&self.pool)
            .await?;

            rows.push(row);
        }

        Ok(rows)
    }

    async fn list(&self, limit: i64) -> DbResult<Vec<TagCodeRow>> {
        let rows = sqlx::query_as::<_, TagCodeRow>(&format!(
            "SELECT {COLUMNS} FROM tag_codes ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_if_unassigned(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM tag_codes WHERE id = $1 AND status = 'unassigned'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
