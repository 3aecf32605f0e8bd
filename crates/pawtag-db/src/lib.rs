//! PawTag DB - Database abstractions
//!
//! SQLx-based database layer for PawTag services.
//!
//! # Example
//!
//! ```rust,ignore
//! use pawtag_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/pawtag").await?;
//! let repos = Repositories::new(pool);
//!
//! // Use repositories
//! let tag = repos.tag_codes.find_by_code("PT-3F9A2C").await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, DbPool};
pub use repo::*;
