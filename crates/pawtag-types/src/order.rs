//! Polymorphic order references
//!
//! A tag or profile may point at one of two order shapes depending on the
//! purchase channel. Legacy rows can carry an id with no recorded kind, so
//! the kind is always optional and resolution falls back through both
//! shapes explicitly.

use serde::{Deserialize, Serialize};

use crate::OrderId;

/// Which order table a polymorphic order link points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Order placed by an authenticated account
    Customer,
    /// Guest/anonymous checkout order
    Guest,
}

impl OrderKind {
    /// Database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Guest => "guest",
        }
    }

    /// Parse a stored kind tag. Unknown or garbled legacy values map to
    /// `None` so callers take the fallback chain instead of failing.
    pub fn parse_lossy(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "guest" => Some(Self::Guest),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tagged order reference: an id plus its (possibly unknown) shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Order row id
    pub id: OrderId,
    /// Recorded shape, `None` on legacy rows
    pub kind: Option<OrderKind>,
}

impl OrderRef {
    /// Build a reference from raw stored columns
    pub fn new(id: OrderId, kind: Option<OrderKind>) -> Self {
        Self { id, kind }
    }
}
