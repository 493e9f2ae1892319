use serde::{Deserialize, Serialize};

/// Tables of the research store. Names and columns are the schema contract
/// shared by every backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Countries,
    AssetClasses,
    AssetSubclasses,
    Themes,
    Managers,
    Analyses,
    EconomicIndicators,
    RiskProfiles,
    ModelAllocations,
    AllocationComponents,
    Alerts,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Countries,
        Table::AssetClasses,
        Table::AssetSubclasses,
        Table::Themes,
        Table::Managers,
        Table::Analyses,
        Table::EconomicIndicators,
        Table::RiskProfiles,
        Table::ModelAllocations,
        Table::AllocationComponents,
        Table::Alerts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Countries => "countries",
            Table::AssetClasses => "asset_classes",
            Table::AssetSubclasses => "asset_subclasses",
            Table::Themes => "themes",
            Table::Managers => "managers",
            Table::Analyses => "analyses",
            Table::EconomicIndicators => "economic_indicators",
            Table::RiskProfiles => "risk_profiles",
            Table::ModelAllocations => "model_allocations",
            Table::AllocationComponents => "allocation_components",
            Table::Alerts => "alerts",
        }
    }

    /// Every column of the table, `id` first.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Countries => &["id", "name", "flag_emoji"],
            Table::AssetClasses | Table::Themes | Table::Managers | Table::RiskProfiles => {
                &["id", "name"]
            }
            Table::AssetSubclasses => &["id", "name", "asset_class_id"],
            Table::Analyses => &[
                "id",
                "title",
                "summary",
                "full_text",
                "kind",
                "stance",
                "publication_date",
                "country_id",
                "manager_id",
                "asset_class_id",
                "asset_subclass_id",
                "theme_id",
            ],
            Table::EconomicIndicators => &[
                "id",
                "country_id",
                "indicator_name",
                "current_value",
                "reference_period",
                "trend",
            ],
            Table::ModelAllocations => &["id", "risk_profile_id", "strategy_name"],
            Table::AllocationComponents => &[
                "id",
                "allocation_id",
                "asset_name",
                "ticker_example",
                "percentage",
                "rationale",
            ],
            Table::Alerts => &["id", "title", "alert_kind", "severity", "description"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// The column other tables use to reference this one, e.g. `manager_id`.
    pub fn foreign_key(&self) -> &'static str {
        match self {
            Table::Countries => "country_id",
            Table::AssetClasses => "asset_class_id",
            Table::AssetSubclasses => "asset_subclass_id",
            Table::Themes => "theme_id",
            Table::Managers => "manager_id",
            Table::Analyses => "analysis_id",
            Table::EconomicIndicators => "indicator_id",
            Table::RiskProfiles => "risk_profile_id",
            Table::ModelAllocations => "allocation_id",
            Table::AllocationComponents => "component_id",
            Table::Alerts => "alert_id",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema applied by the SQLite backend on open. A hosted PostgREST database is
/// expected to expose the same tables and columns.
///
/// Percentages are stored as text so decimal weights round-trip exactly.
pub const SCHEMA_DDL: &str = "\
CREATE TABLE IF NOT EXISTS countries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    flag_emoji  TEXT
);
CREATE TABLE IF NOT EXISTS asset_classes (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS asset_subclasses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    asset_class_id  INTEGER NOT NULL REFERENCES asset_classes(id)
);
CREATE TABLE IF NOT EXISTS themes (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS managers (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS analyses (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    title              TEXT NOT NULL,
    summary            TEXT NOT NULL DEFAULT '',
    full_text          TEXT NOT NULL DEFAULT '',
    kind               TEXT NOT NULL,
    stance             TEXT NOT NULL DEFAULT 'N/A',
    publication_date   TEXT NOT NULL,
    country_id         INTEGER REFERENCES countries(id),
    manager_id         INTEGER REFERENCES managers(id),
    asset_class_id     INTEGER REFERENCES asset_classes(id),
    asset_subclass_id  INTEGER REFERENCES asset_subclasses(id),
    theme_id           INTEGER REFERENCES themes(id)
);
CREATE INDEX IF NOT EXISTS idx_analyses_kind ON analyses(kind);
CREATE INDEX IF NOT EXISTS idx_analyses_country ON analyses(country_id);
CREATE INDEX IF NOT EXISTS idx_analyses_published ON analyses(publication_date);
CREATE TABLE IF NOT EXISTS economic_indicators (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id        INTEGER NOT NULL REFERENCES countries(id),
    indicator_name    TEXT NOT NULL,
    current_value     TEXT NOT NULL,
    reference_period  TEXT NOT NULL,
    trend             TEXT NOT NULL DEFAULT 'N/A',
    UNIQUE (country_id, indicator_name)
);
CREATE TABLE IF NOT EXISTS risk_profiles (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS model_allocations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    risk_profile_id  INTEGER NOT NULL REFERENCES risk_profiles(id),
    strategy_name    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS allocation_components (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    allocation_id   INTEGER NOT NULL REFERENCES model_allocations(id),
    asset_name      TEXT NOT NULL,
    ticker_example  TEXT NOT NULL DEFAULT '',
    percentage      TEXT NOT NULL,
    rationale       TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_components_allocation ON allocation_components(allocation_id);
CREATE TABLE IF NOT EXISTS alerts (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    alert_kind   TEXT NOT NULL,
    severity     TEXT NOT NULL,
    description  TEXT
);
";

/// Cache key conventions.
///
/// Every cached read is keyed `<table>:<query fingerprint>` so that a write to a
/// table can drop all of its cached reads with one prefix.
pub mod key_patterns {
    use super::Table;

    pub fn table_prefix(table: Table) -> String {
        format!("{}:", table.name())
    }

    pub fn query(table: Table, fingerprint: &str) -> String {
        format!("{}:{fingerprint}", table.name())
    }
}
