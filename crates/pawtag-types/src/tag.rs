//! Tag code lifecycle types

use serde::{Deserialize, Serialize};

/// Assignment state of a physical tag code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    /// Minted but never bound to an order
    Unassigned,
    /// Claimed by an order, not yet verified by its owner
    Assigned,
    /// Owner completed verification; eligible to reveal a profile
    Verified,
    /// Reported lost by the owner
    Lost,
}

impl TagStatus {
    /// Database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Verified => "verified",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for TagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TagStatus {
    type Err = TagStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unassigned" => Ok(Self::Unassigned),
            "assigned" => Ok(Self::Assigned),
            "verified" => Ok(Self::Verified),
            "lost" => Ok(Self::Lost),
            other => Err(TagStatusParseError(other.to_string())),
        }
    }
}

/// Error parsing a tag status string
#[derive(Debug, thiserror::Error)]
#[error("unknown tag status: {0}")]
pub struct TagStatusParseError(pub String);
