use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PlanningError {
    #[error("Configuration incomplete: build {build_number} has no sink configuration")]
    ConfigurationIncomplete { build_number: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("BOM cycle detected at {node_id} (path: {})", .path.join(" > "))]
    BomCycle { node_id: String, path: Vec<String> },

    #[error("Upstream BOM service error ({status:?}): {message}")]
    UpstreamBom { status: Option<u16>, message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl PlanningError {
    pub fn configuration_incomplete(build_number: impl Into<String>) -> Self {
        Self::ConfigurationIncomplete {
            build_number: build_number.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn bom_cycle(node_id: impl Into<String>, path: Vec<String>) -> Self {
        Self::BomCycle {
            node_id: node_id.into(),
            path,
        }
    }

    pub fn upstream_bom(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamBom {
            status,
            message: message.into(),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigurationIncomplete { .. } => "CONFIGURATION_INCOMPLETE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::BomCycle { .. } => "BOM_CYCLE",
            Self::UpstreamBom { .. } => "UPSTREAM_BOM_ERROR",
            Self::Catalog { .. } => "CATALOG_ERROR",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ConfigurationIncomplete { .. } => 422,
            Self::Validation { .. } => 400,
            Self::BomCycle { .. } => 422,
            Self::UpstreamBom { .. } => 502,
            Self::Catalog { .. } => 500,
            Self::Database { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Errors caused by the order itself rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

pub type PlanningResult<T> = Result<T, PlanningError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<PlanningError> for ErrorResponse {
    fn from(error: PlanningError) -> Self {
        let details = match &error {
            PlanningError::ConfigurationIncomplete { build_number } => {
                Some(serde_json::json!({ "buildNumber": build_number }))
            }
            PlanningError::BomCycle { node_id, path } => {
                Some(serde_json::json!({ "nodeId": node_id, "path": path }))
            }
            _ => None,
        };

        Self {
            error: error.error_code().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

// Conversion from common error types
impl From<sqlx::Error> for PlanningError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("row"),
            other => Self::database(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for PlanningError {
    fn from(error: reqwest::Error) -> Self {
        Self::upstream_bom(error.status().map(|s| s.as_u16()), error.to_string())
    }
}

impl From<serde_json::Error> for PlanningError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<serde_yaml::Error> for PlanningError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::validation("YAML", error.to_string())
    }
}

impl From<config::ConfigError> for PlanningError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}
