use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub bom_service: BomServiceConfig,
    pub catalog: CatalogConfig,
    pub planning: PlanningConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// In-memory stores are used when unset.
    pub postgres_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BomSourceMode {
    /// Expand against the local catalog.
    Local,
    /// Delegate to the upstream BOM service.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomServiceConfig {
    pub mode: BomSourceMode,
    pub url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// YAML or JSON catalog export.
    pub path: Option<String>,
}

/// Naming conventions the compiler relies on. Kept as data so that catalog
/// renames do not require code changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanningConfig {
    pub internal_manufacture_prefixes: Vec<String>,
    pub electronic_keywords: Vec<String>,
    pub core_function_keywords: Vec<String>,
    pub structural_keywords: Vec<String>,
    pub leg_part_numbers: Vec<String>,
    pub feet_part_numbers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Config::try_from(&AppConfig::default())?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with TORVAN prefix
            .add_source(
                Environment::with_prefix("TORVAN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("planning.internal_manufacture_prefixes")
                    .with_list_parse_key("planning.leg_part_numbers")
                    .with_list_parse_key("planning.feet_part_numbers")
                    .try_parsing(true),
            );

        config.build()?.try_deserialize()
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            internal_manufacture_prefixes: vec!["T2-".to_string()],
            electronic_keywords: vec![
                "CONTROL".to_string(),
                "ELECTRONIC".to_string(),
                "SENSOR".to_string(),
            ],
            core_function_keywords: vec!["BASIN".to_string()],
            structural_keywords: vec!["FRAME".to_string(), "STRUCTURAL".to_string()],
            leg_part_numbers: vec![
                "T2-DL27-KIT".to_string(),
                "T2-DL14-KIT".to_string(),
                "T2-LC1-KIT".to_string(),
                "T2-DL27-FH-KIT".to_string(),
                "T2-DL14-FH-KIT".to_string(),
            ],
            feet_part_numbers: vec![
                "T2-LEVELING-CASTOR-475".to_string(),
                "T2-SEISMIC-FEET".to_string(),
            ],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                postgres_url: None,
                max_connections: 10,
                connection_timeout_seconds: 30,
            },
            bom_service: BomServiceConfig {
                mode: BomSourceMode::Local,
                url: "http://localhost:3005/api/bom".to_string(),
                timeout_seconds: 30,
            },
            catalog: CatalogConfig { path: None },
            planning: PlanningConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
                file_path: None,
            },
        }
    }
}
