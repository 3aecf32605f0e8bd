//! REST API handlers

pub mod codes;
pub mod health;
pub mod location;
pub mod orders;
pub mod profile;
pub mod scan;
pub mod subscription;
pub mod webhook;

pub use codes::*;
pub use health::*;
pub use location::*;
pub use orders::*;
pub use profile::*;
pub use scan::*;
pub use subscription::*;
pub use webhook::*;
