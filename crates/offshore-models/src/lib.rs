pub mod alert;
pub mod allocation;
pub mod analysis;
pub mod config;
pub mod indicator;
pub mod labels;
pub mod reference;
pub mod schema;

pub use alert::{Alert, NewAlert, Severity};
pub use allocation::{
    AllocationComponent, ModelAllocation, NewAllocation, NewComponent, RiskProfile,
    RiskProfileName,
};
pub use analysis::{
    Analysis, AnalysisKind, AnalysisPatch, AnalysisWithManager, NewAnalysis, Stance,
};
pub use config::{AdminConfig, BackendConfig, BackendKind, CacheConfig, OffshoreConfig, ReportConfig};
pub use indicator::{EconomicIndicator, NewIndicator, Trend};
pub use labels::ParseLabelError;
pub use reference::{
    AssetClass, AssetSubclass, Country, Manager, NewAssetSubclass, NewCountry, NewNamed, Theme,
};
pub use schema::Table;
