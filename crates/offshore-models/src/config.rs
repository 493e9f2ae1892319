use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds for the read cache time-to-live, in seconds.
pub const MIN_CACHE_TTL_SECONDS: u64 = 60;
pub const MAX_CACHE_TTL_SECONDS: u64 = 600;

/// Top-level configuration, loaded from `config/offshore.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OffshoreConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Which store the gateway talks to.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Postgrest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Database file for the SQLite backend.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Base URL of the PostgREST service (e.g. `https://xyz.supabase.co`).
    #[serde(default)]
    pub url: Option<String>,
    /// API key sent as both `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Sqlite,
            sqlite_path: default_sqlite_path(),
            url: None,
            api_key: None,
        }
    }
}

/// Configuration for the in-memory read cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached query results.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Lifetime of a cached read. Clamped to 60..=600 seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(
            self.ttl_seconds
                .clamp(MIN_CACHE_TTL_SECONDS, MAX_CACHE_TTL_SECONDS),
        )
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdminConfig {
    /// Shared administrator password, compared verbatim.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
    /// Exported files are named `<file_prefix>_<YYYY-MM-DD>.pdf`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// TrueType font embedded in the document. Must cover the content's script.
    #[serde(default = "default_font_path")]
    pub font_path: String,
    /// Bold face for entry titles. Falls back to `font_path`.
    #[serde(default)]
    pub bold_font_path: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            file_prefix: default_file_prefix(),
            font_path: default_font_path(),
            bold_font_path: None,
        }
    }
}

fn default_sqlite_path() -> String {
    "data/offshore.db".to_string()
}
fn default_max_capacity() -> u64 {
    1_000
}
fn default_ttl_seconds() -> u64 {
    300
}
fn default_report_title() -> String {
    "Global Research Report".to_string()
}
fn default_file_prefix() -> String {
    "research_report".to_string()
}
fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[backend]
kind = "postgrest"
url = "https://example.supabase.co"
api_key = "anon-key"

[cache]
max_capacity = 500
ttl_seconds = 120

[admin]
password = "s3nha"

[report]
title = "Relatório de Pesquisa"
file_prefix = "relatorio"
font_path = "/fonts/NotoSans-Regular.ttf"
bold_font_path = "/fonts/NotoSans-Bold.ttf"
"#;

        let config: OffshoreConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Postgrest);
        assert_eq!(config.backend.url.as_deref(), Some("https://example.supabase.co"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(120));
        assert_eq!(config.admin.password, "s3nha");
        assert_eq!(config.report.file_prefix, "relatorio");
        assert_eq!(
            config.report.bold_font_path.as_deref(),
            Some("/fonts/NotoSans-Bold.ttf")
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config: OffshoreConfig = toml::from_str("").unwrap();
        assert_eq!(config, OffshoreConfig::default());
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
        assert_eq!(config.backend.sqlite_path, "data/offshore.db");
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.report.file_prefix, "research_report");
    }

    #[test]
    fn cache_ttl_is_clamped() {
        let short = CacheConfig {
            max_capacity: 10,
            ttl_seconds: 5,
        };
        let long = CacheConfig {
            max_capacity: 10,
            ttl_seconds: 86_400,
        };
        assert_eq!(short.ttl(), Duration::from_secs(60));
        assert_eq!(long.ttl(), Duration::from_secs(600));
    }
}
