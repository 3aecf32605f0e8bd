//! PawTag Types - Shared domain types
//!
//! This crate contains domain types used across PawTag services:
//! - Id newtypes for tags, profiles, users, orders and entitlement periods
//! - Tag code lifecycle status
//! - Entitlement plan and period status
//! - Polymorphic order references
//! - Scan resolution outcomes

pub mod id;
pub mod order;
pub mod period;
pub mod scan;
pub mod tag;

pub use id::*;
pub use order::*;
pub use period::*;
pub use scan::*;
pub use tag::*;
