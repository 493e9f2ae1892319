//! Offshore research platform
//!
//! Risk-profile questionnaire, model portfolios, a browsable catalogue of
//! manager and central-bank research, and PDF research reports, over either a
//! local SQLite database or a PostgREST service.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use offshore::models::{OffshoreConfig, RiskProfileName};
//! use offshore::research::{score, Answers, AllocationResolver, ResearchBrowser};
//! use offshore::store::{Gateway, SqliteBackend};
//! ```

pub use offshore_cache as cache;
pub use offshore_models as models;
pub use offshore_research as research;
pub use offshore_store as store;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use offshore_cache::QueryCache;
use offshore_models::{BackendKind, OffshoreConfig, RiskProfile};
use offshore_research::{
    AdminConsole, AllocationResolver, ErrorKind, ReportAssembler, ResearchBrowser, ResearchError,
};
use offshore_store::{Backend, Gateway, PostgrestBackend, SqliteBackend};
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "OFFSHORE_API_KEY";
pub const ADMIN_PASSWORD_ENV: &str = "OFFSHORE_ADMIN_PASSWORD";

/// Read the TOML configuration. A missing file yields the defaults.
pub fn load_config(path: &str) -> Result<OffshoreConfig, anyhow::Error> {
    let mut config = if Path::new(path).exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {path}"))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config: {path}"))?
    } else {
        warn!(path, "Config file not found, using defaults");
        OffshoreConfig::default()
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Secrets may come from the environment instead of the file.
pub fn apply_env_overrides(config: &mut OffshoreConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
        config.backend.api_key = Some(key);
    }
    if let Some(password) = lookup(ADMIN_PASSWORD_ENV).filter(|v| !v.is_empty()) {
        config.admin.password = password;
    }
}

/// Open the configured backend. The SQLite parent directory is created if needed.
pub fn build_backend(config: &OffshoreConfig) -> Result<Arc<dyn Backend>, anyhow::Error> {
    match config.backend.kind {
        BackendKind::Sqlite => {
            let path = &config.backend.sqlite_path;
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let backend = SqliteBackend::open(path)
                .with_context(|| format!("Failed to open SQLite database: {path}"))?;
            info!(path = %path, "Using SQLite backend");
            Ok(Arc::new(backend))
        }
        BackendKind::Postgrest => {
            let Some(url) = config.backend.url.as_deref() else {
                bail!("backend.url is required for the postgrest backend");
            };
            let Some(api_key) = config.backend.api_key.as_deref() else {
                bail!("backend.api_key (or {API_KEY_ENV}) is required for the postgrest backend");
            };
            let backend = PostgrestBackend::new(url, api_key)?;
            info!(url, "Using PostgREST backend");
            Ok(Arc::new(backend))
        }
    }
}

pub fn build_gateway(config: &OffshoreConfig) -> Result<Arc<Gateway>, anyhow::Error> {
    let backend = build_backend(config)?;
    let ttl = config.cache.ttl();
    let cache = QueryCache::new(config.cache.max_capacity, ttl);
    Ok(Arc::new(Gateway::new(backend, cache, ttl)))
}

/// Everything a command needs, sharing one gateway and cache.
pub struct Services {
    pub gateway: Arc<Gateway>,
    pub browser: ResearchBrowser,
    pub allocations: AllocationResolver,
    pub reports: ReportAssembler,
    pub admin: AdminConsole,
}

impl Services {
    pub fn new(gateway: Arc<Gateway>, config: &OffshoreConfig) -> Self {
        Self {
            browser: ResearchBrowser::new(Arc::clone(&gateway)),
            allocations: AllocationResolver::new(Arc::clone(&gateway)),
            reports: ReportAssembler::new(Arc::clone(&gateway), config.report.title.clone()),
            admin: AdminConsole::new(Arc::clone(&gateway), config.admin.password.clone()),
            gateway,
        }
    }
}

pub fn build_services(config: &OffshoreConfig) -> Result<Services, anyhow::Error> {
    Ok(Services::new(build_gateway(config)?, config))
}

/// Seed the three risk profiles. The SQLite schema is applied when the database opens.
pub async fn init_db(services: &Services) -> Result<Vec<RiskProfile>, ResearchError> {
    services.allocations.ensure_profiles().await
}

/// Message shown to the person at the terminal.
pub fn user_message(err: &ResearchError) -> String {
    match err.kind() {
        ErrorKind::NotFound => err.to_string(),
        ErrorKind::Validation => format!("Invalid input: {err}"),
        ErrorKind::Backend => format!("Could not reach the research store: {err}"),
        ErrorKind::Unauthorized => err.to_string(),
        ErrorKind::Report => format!("Could not produce the report: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offshore_research::Invalid;

    #[test]
    fn env_overrides_replace_secrets() {
        let mut config = OffshoreConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            API_KEY_ENV => Some("service-key".to_string()),
            ADMIN_PASSWORD_ENV => Some("hunter2".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.api_key.as_deref(), Some("service-key"));
        assert_eq!(config.admin.password, "hunter2");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = OffshoreConfig::default();
        config.admin.password = "from-file".to_string();
        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config.admin.password, "from-file");
        assert!(config.backend.api_key.is_none());
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let config = load_config("/nonexistent/offshore.toml").unwrap();
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
    }

    #[test]
    fn postgrest_without_url_is_rejected() {
        let mut config = OffshoreConfig::default();
        config.backend.kind = BackendKind::Postgrest;
        assert!(build_backend(&config).is_err());
    }

    #[tokio::test]
    async fn init_db_creates_file_and_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = OffshoreConfig::default();
        config.backend.sqlite_path = dir
            .path()
            .join("nested/offshore.db")
            .to_string_lossy()
            .into_owned();

        let services = build_services(&config).unwrap();
        let profiles = init_db(&services).await.unwrap();
        assert_eq!(profiles.len(), 3);
        assert!(dir.path().join("nested/offshore.db").exists());
    }

    #[test]
    fn messages_by_kind() {
        let validation = ResearchError::from(Invalid::Blank("title"));
        assert_eq!(user_message(&validation), "Invalid input: title must not be blank");
        assert_eq!(
            user_message(&ResearchError::Unauthorized),
            "Incorrect administrator password"
        );
    }
}
