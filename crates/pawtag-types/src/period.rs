//! Entitlement period types

use serde::{Deserialize, Serialize};

/// Billing plan for an entitlement period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// One calendar month of coverage
    Monthly,
    /// One calendar year of coverage
    Yearly,
    /// Effectively unlimited coverage (100-year sentinel)
    Lifetime,
}

impl PlanType {
    /// Database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Coverage length in calendar months. Lifetime uses a 100-year
    /// sentinel rather than a true unbounded value.
    pub const fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
            Self::Lifetime => 1_200,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlanType {
    type Err = PlanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "lifetime" => Ok(Self::Lifetime),
            other => Err(PlanParseError(other.to_string())),
        }
    }
}

/// Error parsing a plan string
#[derive(Debug, thiserror::Error)]
#[error("unknown plan: {0}")]
pub struct PlanParseError(pub String);

/// Status of an entitlement period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Currently paid-for coverage
    Active,
    /// Superseded by a renewal or lapsed
    Expired,
    /// Cancelled by the user or the payment processor
    Cancelled,
}

impl PeriodStatus {
    /// Database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PeriodStatus {
    type Err = PlanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PlanParseError(other.to_string())),
        }
    }
}
