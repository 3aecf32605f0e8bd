//! PostgreSQL repository implementations

mod order;
mod period;
mod profile;
mod tag_code;
mod user;

pub use order::PgOrderRepository;
pub use period::PgPeriodRepository;
pub use profile::PgProfileRepository;
pub use tag_code::PgTagCodeRepository;
pub use user::PgUserRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub tag_codes: PgTagCodeRepository,
    pub periods: PgPeriodRepository,
    pub profiles: PgProfileRepository,
    pub orders: PgOrderRepository,
    pub users: PgUserRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            tag_codes: PgTagCodeRepository::new(pool.clone()),
            periods: PgPeriodRepository::new(pool.clone()),
            profiles: PgProfileRepository::new(pool.clone()),
            orders: PgOrderRepository::new(pool.clone()),
            users: PgUserRepository::new(pool),
        }
    }
}
