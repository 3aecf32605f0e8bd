//! PostgreSQL order repository implementation
//!
//! Covers both order shapes: authenticated customer orders and guest
//! checkout orders live in separate tables.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{CustomerOrderRow, GuestOrderRow};
use crate::repo::OrderRepository;

/// PostgreSQL order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_customer_order(&self, id: Uuid) -> DbResult<Option<CustomerOrderRow>> {
        let row = sqlx::query_as::<_, CustomerOrderRow>(
            "SELECT id, user_id, street, city, postal_code, phone, created_at \
             FROM customer_orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_guest_order(&self, id: Uuid) -> DbResult<Option<GuestOrderRow>> {
        let row = sqlx::query_as::<_, GuestOrderRow>(
            "SELECT id, email, street, city, postal_code, phone, created_at \
             FROM guest_orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
