//! Fixtures for tests: an in-memory gateway and a small seeded reference catalogue.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use offshore_cache::QueryCache;
use offshore_models::{
    Analysis, AnalysisKind, AssetClass, AssetSubclass, Country, Manager, NewAnalysis,
    NewAssetSubclass, NewComponent, NewCountry, NewNamed, Stance, Table, Theme,
};
use offshore_store::{Gateway, GatewayError, SqliteBackend};
use rust_decimal::Decimal;

use crate::allocation::AllocationResolver;
use crate::error::ResearchError;

pub const TEST_TTL: Duration = Duration::from_secs(300);

/// Gateway over a fresh in-memory SQLite database with the schema applied.
pub fn try_memory_gateway() -> Result<Arc<Gateway>, GatewayError> {
    let backend = SqliteBackend::open_in_memory()?;
    Ok(Arc::new(Gateway::new(
        Arc::new(backend),
        QueryCache::new(100, TEST_TTL),
        TEST_TTL,
    )))
}

/// Panics if SQLite cannot open an in-memory database.
pub fn memory_gateway() -> Arc<Gateway> {
    match try_memory_gateway() {
        Ok(gateway) => gateway,
        Err(e) => panic!("in-memory database: {e}"),
    }
}

/// Ids of the rows inserted by [`seeded`].
pub struct Fixture {
    pub gateway: Arc<Gateway>,
    pub brazil: i64,
    pub usa: i64,
    pub blackrock: i64,
    pub pimco: i64,
    pub equities: i64,
    pub fixed_income: i64,
    pub emerging_markets: i64,
    pub artificial_intelligence: i64,
}

/// Two countries, two managers, two asset classes with one subclass, one theme,
/// and the three risk profiles.
pub async fn seeded() -> Result<Fixture, ResearchError> {
    let gateway = memory_gateway();

    let brazil: Country = gateway
        .insert(
            Table::Countries,
            &NewCountry {
                name: "Brasil".to_string(),
                flag_emoji: Some("🇧🇷".to_string()),
            },
        )
        .await?;
    let usa: Country = gateway
        .insert(
            Table::Countries,
            &NewCountry {
                name: "United States".to_string(),
                flag_emoji: Some("🇺🇸".to_string()),
            },
        )
        .await?;
    let blackrock: Manager = gateway.insert(Table::Managers, &named("BlackRock")).await?;
    let pimco: Manager = gateway.insert(Table::Managers, &named("PIMCO")).await?;
    let equities: AssetClass = gateway.insert(Table::AssetClasses, &named("Equities")).await?;
    let fixed_income: AssetClass = gateway
        .insert(Table::AssetClasses, &named("Fixed Income"))
        .await?;
    let emerging_markets: AssetSubclass = gateway
        .insert(
            Table::AssetSubclasses,
            &NewAssetSubclass {
                name: "Emerging Markets".to_string(),
                asset_class_id: equities.id,
            },
        )
        .await?;
    let artificial_intelligence: Theme = gateway
        .insert(Table::Themes, &named("Artificial Intelligence"))
        .await?;

    AllocationResolver::new(Arc::clone(&gateway))
        .ensure_profiles()
        .await?;

    Ok(Fixture {
        gateway,
        brazil: brazil.id,
        usa: usa.id,
        blackrock: blackrock.id,
        pimco: pimco.id,
        equities: equities.id,
        fixed_income: fixed_income.id,
        emerging_markets: emerging_markets.id,
        artificial_intelligence: artificial_intelligence.id,
    })
}

fn named(name: &str) -> NewNamed {
    NewNamed {
        name: name.to_string(),
    }
}

/// Calendar day; out-of-range input falls back to the epoch.
pub fn day(year: i32, month: u32, date: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, date).unwrap_or_default()
}

/// Analysis payload with no foreign keys set and a Neutral stance.
pub fn new_analysis(title: &str, kind: AnalysisKind, published: NaiveDate) -> NewAnalysis {
    NewAnalysis {
        title: title.to_string(),
        summary: format!("Summary of {title}"),
        full_text: String::new(),
        kind,
        stance: Stance::Neutral,
        publication_date: published,
        country_id: None,
        manager_id: None,
        asset_class_id: None,
        asset_subclass_id: None,
        theme_id: None,
    }
}

/// Insert directly through the gateway, skipping the admin checks.
pub async fn insert_analysis(gateway: &Gateway, new: &NewAnalysis) -> Result<Analysis, ResearchError> {
    Ok(gateway.insert(Table::Analyses, new).await?)
}

pub fn component(asset_name: &str, percentage: Decimal) -> NewComponent {
    NewComponent {
        asset_name: asset_name.to_string(),
        ticker_example: String::new(),
        percentage,
        rationale: String::new(),
    }
}
