use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;

/// The three investor risk buckets. Stored by name in `risk_profiles`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskProfileName {
    Conservative,
    Moderate,
    Aggressive,
}

labelled_enum!(RiskProfileName, "risk profile", {
    Conservative => "Conservative",
    Moderate => "Moderate",
    Aggressive => "Aggressive",
});

/// A row of `risk_profiles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskProfile {
    pub id: i64,
    pub name: String,
}

/// A row of `model_allocations`. One per risk profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelAllocation {
    pub id: i64,
    pub risk_profile_id: i64,
    pub strategy_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAllocation {
    pub risk_profile_id: i64,
    pub strategy_name: String,
}

/// A row of `allocation_components`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationComponent {
    pub id: i64,
    pub allocation_id: i64,
    pub asset_name: String,
    #[serde(default)]
    pub ticker_example: String,
    /// Portfolio weight in percent (0-100).
    pub percentage: Decimal,
    #[serde(default)]
    pub rationale: String,
}

/// One weighted line of a replacement component set.
///
/// `allocation_id` is filled in by the replacement call, not by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewComponent {
    pub asset_name: String,
    #[serde(default)]
    pub ticker_example: String,
    pub percentage: Decimal,
    #[serde(default)]
    pub rationale: String,
}

impl NewComponent {
    pub fn total_percentage(components: &[NewComponent]) -> Decimal {
        components.iter().map(|c| c.percentage).sum()
    }
}
