pub mod bom;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalizer;
pub mod procurement;
pub mod tasks;
pub mod validation;

pub use bom::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use normalizer::{ConfigurationNormalizer, NormalizedOrder};
pub use procurement::ProcurementReconciler;
pub use tasks::{BuildTaskPlan, TaskIdCounter, TaskRuleEngine};
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bom_service.mode, BomSourceMode::Local);
        assert!(config.database.postgres_url.is_none());
        assert!(config
            .planning
            .leg_part_numbers
            .contains(&"T2-DL27-KIT".to_string()));
        assert_eq!(config.planning.feet_part_numbers.len(), 2);
    }

    #[test]
    fn test_config_serializes_for_layering() {
        let config = AppConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        let parsed: AppConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.planning, config.planning);
    }

    #[test]
    fn test_error_handling() {
        let error = PlanningError::validation("test_field", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);
    }
}
