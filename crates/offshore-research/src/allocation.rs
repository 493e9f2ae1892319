use std::sync::Arc;

use offshore_models::{
    AllocationComponent, ModelAllocation, NewAllocation, NewComponent, NewNamed, RiskProfile,
    RiskProfileName, Table,
};
use offshore_store::{Gateway, Query};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Invalid, Missing, ResearchError};

/// Lowest accepted component total, in percent.
pub fn min_total() -> Decimal {
    Decimal::new(999, 1)
}

/// Highest accepted component total, in percent.
pub fn max_total() -> Decimal {
    Decimal::new(1001, 1)
}

/// The model portfolio recommended for one risk profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAllocation {
    pub profile: RiskProfileName,
    pub allocation_id: i64,
    pub strategy_name: String,
    pub components: Vec<AllocationComponent>,
}

impl ResolvedAllocation {
    /// An allocation without components is valid; it has just not been filled in yet.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn total_percentage(&self) -> Decimal {
        self.components.iter().map(|c| c.percentage).sum()
    }
}

/// Check a replacement component set. Returns the total on success.
pub fn validate_components(components: &[NewComponent]) -> Result<Decimal, Invalid> {
    for component in components {
        if component.asset_name.trim().is_empty() {
            return Err(Invalid::Blank("asset name"));
        }
        if component.percentage.is_sign_negative() {
            return Err(Invalid::NegativePercentage {
                asset: component.asset_name.clone(),
            });
        }
    }
    let sum = NewComponent::total_percentage(components);
    if sum < min_total() || sum > max_total() {
        return Err(Invalid::PercentageSum { sum });
    }
    Ok(sum)
}

/// Maps a risk profile to its model allocation and maintains allocations.
pub struct AllocationResolver {
    gateway: Arc<Gateway>,
}

impl AllocationResolver {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn resolve(&self, profile: RiskProfileName) -> Result<ResolvedAllocation, ResearchError> {
        let profile_row = self.profile_row(profile).await?;

        let allocations: Vec<ModelAllocation> = self
            .gateway
            .fetch(
                &Query::table(Table::ModelAllocations)
                    .eq("risk_profile_id", profile_row.id)
                    .order_asc("id"),
            )
            .await?;
        if allocations.len() > 1 {
            warn!(
                profile = %profile,
                count = allocations.len(),
                "Profile has several model allocations, using the first"
            );
        }
        let allocation = allocations
            .into_iter()
            .next()
            .ok_or(Missing::Allocation(profile))?;

        let components = self.components(allocation.id).await?;
        info!(
            profile = %profile,
            allocation_id = allocation.id,
            components = components.len(),
            "Resolved model allocation"
        );

        Ok(ResolvedAllocation {
            profile,
            allocation_id: allocation.id,
            strategy_name: allocation.strategy_name,
            components,
        })
    }

    pub async fn components(&self, allocation_id: i64) -> Result<Vec<AllocationComponent>, ResearchError> {
        Ok(self
            .gateway
            .fetch(
                &Query::table(Table::AllocationComponents)
                    .eq("allocation_id", allocation_id)
                    .order_asc("id"),
            )
            .await?)
    }

    /// Every allocation with its profile name, for the admin listing.
    pub async fn allocations(&self) -> Result<Vec<(RiskProfileName, ModelAllocation)>, ResearchError> {
        let profiles: Vec<RiskProfile> = self
            .gateway
            .fetch(&Query::table(Table::RiskProfiles).order_asc("id"))
            .await?;
        let allocations: Vec<ModelAllocation> = self
            .gateway
            .fetch(&Query::table(Table::ModelAllocations).order_asc("id"))
            .await?;

        let mut listed = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let Some(profile) = profiles.iter().find(|p| p.id == allocation.risk_profile_id) else {
                continue;
            };
            match profile.name.parse::<RiskProfileName>() {
                Ok(name) => listed.push((name, allocation)),
                Err(e) => warn!(error = %e, "Skipping allocation with unknown profile"),
            }
        }
        Ok(listed)
    }

    pub async fn create_allocation(
        &self,
        profile: RiskProfileName,
        strategy_name: &str,
    ) -> Result<ModelAllocation, ResearchError> {
        let strategy_name = strategy_name.trim();
        if strategy_name.is_empty() {
            return Err(Invalid::Blank("strategy name").into());
        }
        let profile_row = self.profile_row(profile).await?;

        let existing: Option<ModelAllocation> = self
            .gateway
            .fetch_first(&Query::table(Table::ModelAllocations).eq("risk_profile_id", profile_row.id))
            .await?;
        if existing.is_some() {
            return Err(Invalid::DuplicateAllocation(profile).into());
        }

        let allocation: ModelAllocation = self
            .gateway
            .insert(
                Table::ModelAllocations,
                &NewAllocation {
                    risk_profile_id: profile_row.id,
                    strategy_name: strategy_name.to_string(),
                },
            )
            .await?;
        info!(profile = %profile, allocation_id = allocation.id, "Created model allocation");
        Ok(allocation)
    }

    /// Swap the whole component set of an allocation. Nothing is written unless
    /// the weights add up to 100% within a tenth of a point.
    pub async fn replace_components(
        &self,
        allocation_id: i64,
        components: &[NewComponent],
    ) -> Result<Vec<AllocationComponent>, ResearchError> {
        let total = validate_components(components)?;

        let allocation: Option<ModelAllocation> = self
            .gateway
            .fetch_by_id(Table::ModelAllocations, allocation_id)
            .await?;
        if allocation.is_none() {
            return Err(Missing::Row {
                table: Table::ModelAllocations,
                id: allocation_id,
            }
            .into());
        }

        let saved: Vec<AllocationComponent> = self
            .gateway
            .replace_children(
                Table::AllocationComponents,
                "allocation_id",
                allocation_id,
                components,
            )
            .await?;
        info!(
            allocation_id,
            components = saved.len(),
            total = %total,
            "Replaced allocation components"
        );
        Ok(saved)
    }

    /// Insert whichever of the three profile rows are missing.
    pub async fn ensure_profiles(&self) -> Result<Vec<RiskProfile>, ResearchError> {
        let existing: Vec<RiskProfile> = self
            .gateway
            .fetch(&Query::table(Table::RiskProfiles).order_asc("id"))
            .await?;

        let mut profiles = existing.clone();
        for name in RiskProfileName::ALL {
            if existing.iter().any(|p| p.name == name.as_str()) {
                continue;
            }
            let row: RiskProfile = self
                .gateway
                .insert(
                    Table::RiskProfiles,
                    &NewNamed {
                        name: name.as_str().to_string(),
                    },
                )
                .await?;
            info!(profile = %name, id = row.id, "Seeded risk profile");
            profiles.push(row);
        }
        Ok(profiles)
    }

    async fn profile_row(&self, profile: RiskProfileName) -> Result<RiskProfile, ResearchError> {
        let row: Option<RiskProfile> = self
            .gateway
            .fetch_first(&Query::table(Table::RiskProfiles).eq("name", profile.as_str()))
            .await?;
        row.ok_or_else(|| Missing::RiskProfile(profile).into())
    }
}
