use std::sync::Arc;

use offshore_models::{
    AnalysisKind, AnalysisWithManager, AssetClass, AssetSubclass, Country, EconomicIndicator,
    Manager, Table, Theme,
};
use offshore_store::{Gateway, Query};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ResearchError;

/// Analyses of one kind joined with their manager, newest first with ties broken by id.
pub(crate) fn analyses_of_kind(kind: AnalysisKind) -> Query {
    Query::table(Table::Analyses)
        .eq("kind", kind.as_str())
        .join(Table::Managers)
        .order_desc("publication_date")
        .order_asc("id")
}

/// A country as offered in a selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryOption {
    pub id: i64,
    pub label: String,
}

impl From<&Country> for CountryOption {
    fn from(country: &Country) -> Self {
        Self {
            id: country.id,
            label: country.label(),
        }
    }
}

/// Read-only views over the research catalogue.
pub struct ResearchBrowser {
    gateway: Arc<Gateway>,
}

impl ResearchBrowser {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn countries(&self) -> Result<Vec<CountryOption>, ResearchError> {
        let countries: Vec<Country> = self.by_name(Table::Countries).await?;
        Ok(countries.iter().map(CountryOption::from).collect())
    }

    pub async fn managers(&self) -> Result<Vec<Manager>, ResearchError> {
        self.by_name(Table::Managers).await
    }

    pub async fn themes(&self) -> Result<Vec<Theme>, ResearchError> {
        self.by_name(Table::Themes).await
    }

    pub async fn asset_classes(&self) -> Result<Vec<AssetClass>, ResearchError> {
        self.by_name(Table::AssetClasses).await
    }

    /// Subclasses of one asset class, or all of them.
    pub async fn asset_subclasses(
        &self,
        asset_class_id: Option<i64>,
    ) -> Result<Vec<AssetSubclass>, ResearchError> {
        let mut query = Query::table(Table::AssetSubclasses).order_asc("name");
        if let Some(id) = asset_class_id {
            query = query.eq("asset_class_id", id);
        }
        Ok(self.gateway.fetch(&query).await?)
    }

    pub async fn macro_view(&self, country_id: i64) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(AnalysisKind::Macro, Some(("country_id", country_id)))
            .await
    }

    pub async fn central_bank_views(
        &self,
        country_id: i64,
    ) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(AnalysisKind::CentralBankView, Some(("country_id", country_id)))
            .await
    }

    pub async fn asset_view(&self, asset_class_id: i64) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(AnalysisKind::Asset, Some(("asset_class_id", asset_class_id)))
            .await
    }

    pub async fn micro_asset_view(
        &self,
        asset_subclass_id: i64,
    ) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(
            AnalysisKind::MicroAsset,
            Some(("asset_subclass_id", asset_subclass_id)),
        )
        .await
    }

    pub async fn thematic_view(&self, theme_id: i64) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(AnalysisKind::Thematic, Some(("theme_id", theme_id)))
            .await
    }

    pub async fn thesis_view(&self) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        self.analyses(AnalysisKind::Thesis, None).await
    }

    /// Analyses of `kind`, optionally narrowed to rows where `column = id`.
    pub async fn analyses(
        &self,
        kind: AnalysisKind,
        narrow: Option<(&str, i64)>,
    ) -> Result<Vec<AnalysisWithManager>, ResearchError> {
        let mut query = analyses_of_kind(kind);
        if let Some((column, id)) = narrow {
            query = query.eq(column, id);
        }
        let rows: Vec<AnalysisWithManager> = self.gateway.fetch(&query).await?;
        debug!(kind = %kind, rows = rows.len(), "Loaded analyses");
        Ok(rows)
    }

    pub async fn indicators(&self, country_id: i64) -> Result<Vec<EconomicIndicator>, ResearchError> {
        Ok(self
            .gateway
            .fetch(
                &Query::table(Table::EconomicIndicators)
                    .eq("country_id", country_id)
                    .order_asc("indicator_name"),
            )
            .await?)
    }

    async fn by_name<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, ResearchError> {
        Ok(self
            .gateway
            .fetch(&Query::table(table).order_asc("name"))
            .await?)
    }
}
