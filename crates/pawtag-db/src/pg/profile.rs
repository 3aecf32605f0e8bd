//! PostgreSQL profile repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::ProfileRow;
use crate::repo::ProfileRepository;

const COLUMNS: &str =
    "id, user_id, order_id, order_kind, name, medical_notes, hide_name, created_at, updated_at";

/// PostgreSQL profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_order(
        &self,
        order_id: Uuid,
        order_kind: Option<&str>,
    ) -> DbResult<Option<ProfileRow>> {
        let row = match order_kind {
            Some(kind) => {
                sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles \
                     WHERE order_id = $1 AND order_kind = $2 \
                     LIMIT 1"
                ))
                .bind(order_id)
                .bind(kind)
                .fetch_optional(&self.pool)
                .await?
            }
            // Legacy links with no recorded kind match on id alone
            None => {
                sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles WHERE order_id = $1 LIMIT 1"
                ))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row)
    }
}
