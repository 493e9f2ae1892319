use std::sync::Arc;

use offshore_models::{
    Alert, AllocationComponent, Analysis, AnalysisKind, AnalysisPatch, AssetClass,
    AssetSubclass, Country, EconomicIndicator, Manager, ModelAllocation, NewAlert, NewAnalysis,
    NewAssetSubclass, NewComponent, NewCountry, NewIndicator, NewNamed, RiskProfileName, Table,
    Theme,
};
use offshore_store::Gateway;
use tracing::{info, warn};

use crate::allocation::AllocationResolver;
use crate::error::{Invalid, Missing, ResearchError};

/// Entry point to the write operations. Hands out an [`AdminSession`] only for the
/// configured password.
pub struct AdminConsole {
    gateway: Arc<Gateway>,
    password: String,
}

impl AdminConsole {
    pub fn new(gateway: Arc<Gateway>, password: impl Into<String>) -> Self {
        Self {
            gateway,
            password: password.into(),
        }
    }

    /// An empty configured password never unlocks.
    pub fn unlock(&self, attempt: &str) -> Result<AdminSession, ResearchError> {
        if self.password.is_empty() || attempt != self.password {
            warn!("Rejected administrator password");
            return Err(ResearchError::Unauthorized);
        }
        Ok(AdminSession {
            gateway: Arc::clone(&self.gateway),
            allocations: AllocationResolver::new(Arc::clone(&self.gateway)),
        })
    }
}

pub struct AdminSession {
    gateway: Arc<Gateway>,
    allocations: AllocationResolver,
}

impl AdminSession {
    pub async fn create_analysis(&self, new: &NewAnalysis) -> Result<Analysis, ResearchError> {
        check_analysis(&LinkedIds::from(new), &new.title)?;
        let analysis: Analysis = self.gateway.insert(Table::Analyses, new).await?;
        info!(id = analysis.id, kind = %analysis.kind, "Created analysis");
        Ok(analysis)
    }

    /// Apply a partial update. The rules are checked against the merged row.
    pub async fn update_analysis(
        &self,
        id: i64,
        patch: &AnalysisPatch,
    ) -> Result<Analysis, ResearchError> {
        let current: Analysis = self
            .gateway
            .fetch_by_id(Table::Analyses, id)
            .await?
            .ok_or(Missing::Row {
                table: Table::Analyses,
                id,
            })?;
        let merged = patch.apply_to(&current);
        check_analysis(&LinkedIds::from(&merged), &merged.title)?;

        let updated: Analysis = self.gateway.update(Table::Analyses, id, patch).await?;
        info!(id, "Updated analysis");
        Ok(updated)
    }

    pub async fn delete_analysis(&self, id: i64) -> Result<(), ResearchError> {
        self.gateway.delete(Table::Analyses, id).await?;
        info!(id, "Deleted analysis");
        Ok(())
    }

    /// Insert or overwrite the indicator identified by country and name.
    pub async fn upsert_indicator(
        &self,
        new: &NewIndicator,
    ) -> Result<EconomicIndicator, ResearchError> {
        require("indicator name", &new.indicator_name)?;
        require("current value", &new.current_value)?;
        let indicator: EconomicIndicator = self
            .gateway
            .upsert(Table::EconomicIndicators, new, NewIndicator::CONFLICT_KEY)
            .await?;
        info!(
            id = indicator.id,
            country_id = indicator.country_id,
            name = %indicator.indicator_name,
            "Saved indicator"
        );
        Ok(indicator)
    }

    pub async fn create_alert(&self, new: &NewAlert) -> Result<Alert, ResearchError> {
        require("alert title", &new.title)?;
        require("alert kind", &new.alert_kind)?;
        let alert: Alert = self.gateway.insert(Table::Alerts, new).await?;
        info!(id = alert.id, severity = %alert.severity, "Created alert");
        Ok(alert)
    }

    pub async fn create_country(&self, new: &NewCountry) -> Result<Country, ResearchError> {
        require("country name", &new.name)?;
        Ok(self.gateway.insert(Table::Countries, new).await?)
    }

    pub async fn create_manager(&self, name: &str) -> Result<Manager, ResearchError> {
        self.create_named(Table::Managers, "manager name", name).await
    }

    pub async fn create_theme(&self, name: &str) -> Result<Theme, ResearchError> {
        self.create_named(Table::Themes, "theme name", name).await
    }

    pub async fn create_asset_class(&self, name: &str) -> Result<AssetClass, ResearchError> {
        self.create_named(Table::AssetClasses, "asset class name", name)
            .await
    }

    pub async fn create_asset_subclass(
        &self,
        new: &NewAssetSubclass,
    ) -> Result<AssetSubclass, ResearchError> {
        require("asset subclass name", &new.name)?;
        Ok(self.gateway.insert(Table::AssetSubclasses, new).await?)
    }

    pub async fn create_allocation(
        &self,
        profile: RiskProfileName,
        strategy_name: &str,
    ) -> Result<ModelAllocation, ResearchError> {
        self.allocations
            .create_allocation(profile, strategy_name)
            .await
    }

    pub async fn replace_components(
        &self,
        allocation_id: i64,
        components: &[NewComponent],
    ) -> Result<Vec<AllocationComponent>, ResearchError> {
        self.allocations
            .replace_components(allocation_id, components)
            .await
    }

    pub async fn allocations(&self) -> Result<Vec<(RiskProfileName, ModelAllocation)>, ResearchError> {
        self.allocations.allocations().await
    }

    async fn create_named<T>(
        &self,
        table: Table,
        field: &'static str,
        name: &str,
    ) -> Result<T, ResearchError>
    where
        T: serde::de::DeserializeOwned,
    {
        require(field, name)?;
        let row: T = self
            .gateway
            .insert(
                table,
                &NewNamed {
                    name: name.trim().to_string(),
                },
            )
            .await?;
        info!(table = %table, name = name.trim(), "Created reference row");
        Ok(row)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), Invalid> {
    if value.trim().is_empty() {
        Err(Invalid::Blank(field))
    } else {
        Ok(())
    }
}

/// The foreign keys an analysis carries, for the per-kind checks.
struct LinkedIds {
    kind: AnalysisKind,
    country_id: Option<i64>,
    manager_id: Option<i64>,
    asset_class_id: Option<i64>,
    asset_subclass_id: Option<i64>,
    theme_id: Option<i64>,
}

impl From<&NewAnalysis> for LinkedIds {
    fn from(new: &NewAnalysis) -> Self {
        Self {
            kind: new.kind,
            country_id: new.country_id,
            manager_id: new.manager_id,
            asset_class_id: new.asset_class_id,
            asset_subclass_id: new.asset_subclass_id,
            theme_id: new.theme_id,
        }
    }
}

impl From<&Analysis> for LinkedIds {
    fn from(analysis: &Analysis) -> Self {
        Self {
            kind: analysis.kind,
            country_id: analysis.country_id,
            manager_id: analysis.manager_id,
            asset_class_id: analysis.asset_class_id,
            asset_subclass_id: analysis.asset_subclass_id,
            theme_id: analysis.theme_id,
        }
    }
}

/// Each kind needs the key of the entity it is filed under. Central bank views
/// speak for the institution, so they never name a manager.
fn check_analysis(ids: &LinkedIds, title: &str) -> Result<(), Invalid> {
    require("title", title)?;

    let (field, value) = match ids.kind {
        AnalysisKind::Macro | AnalysisKind::CentralBankView => ("country_id", ids.country_id),
        AnalysisKind::Asset => ("asset_class_id", ids.asset_class_id),
        AnalysisKind::MicroAsset => ("asset_subclass_id", ids.asset_subclass_id),
        AnalysisKind::Thematic => ("theme_id", ids.theme_id),
        AnalysisKind::Thesis => return Ok(()),
    };
    if value.is_none() {
        return Err(Invalid::MissingField {
            kind: ids.kind,
            field,
        });
    }
    if ids.kind == AnalysisKind::CentralBankView && ids.manager_id.is_some() {
        return Err(Invalid::ForbiddenField {
            kind: ids.kind,
            field: "manager_id",
        });
    }
    Ok(())
}
