//! BOM Sources
//!
//! Where the hierarchical BOM for an order comes from: the local catalog
//! expander or the upstream BOM service. Both return the same `BomResult`
//! shape, so the compiler does not care which one it is given.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use torvan_models::{BomResult, BuildConfiguration};
use torvan_utils::{
    BomExpander, BomServiceConfig, BomSourceMode, Catalog, PlanningError, PlanningResult,
};

#[async_trait]
pub trait BomSource: Send + Sync {
    /// Expand every build of one order. Any error aborts the compile.
    async fn generate(
        &self,
        order_id: &str,
        builds: &[BuildConfiguration],
    ) -> PlanningResult<BomResult>;
}

/// Expands against an in-process catalog
pub struct LocalBomSource {
    catalog: Arc<dyn Catalog>,
}

impl LocalBomSource {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl BomSource for LocalBomSource {
    async fn generate(
        &self,
        order_id: &str,
        builds: &[BuildConfiguration],
    ) -> PlanningResult<BomResult> {
        let result = BomExpander::new(self.catalog.as_ref()).expand_order(builds)?;
        debug!(
            order_id = %order_id,
            total_items = result.total_items,
            warnings = result.warnings.len(),
            "BOM expanded from local catalog"
        );
        Ok(result)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BomRequest<'a> {
    order_id: &'a str,
    build_configurations: &'a [BuildConfiguration],
}

/// Client for the upstream BOM service
pub struct HttpBomService {
    client: Client,
    url: String,
}

impl HttpBomService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> PlanningResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &BomServiceConfig) -> PlanningResult<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_seconds))
    }
}

#[async_trait]
impl BomSource for HttpBomService {
    async fn generate(
        &self,
        order_id: &str,
        builds: &[BuildConfiguration],
    ) -> PlanningResult<BomResult> {
        let response = self
            .client
            .post(&self.url)
            .json(&BomRequest {
                order_id,
                build_configurations: builds,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlanningError::upstream_bom(
                Some(status.as_u16()),
                format!("BOM service rejected order {}: {}", order_id, body),
            ));
        }

        let result: BomResult = response.json().await?;
        info!(
            order_id = %order_id,
            total_items = result.total_items,
            "BOM received from upstream service"
        );
        Ok(result)
    }
}

/// Pick the source named by `config.mode`.
pub fn bom_source_from_config(
    config: &BomServiceConfig,
    catalog: Arc<dyn Catalog>,
) -> PlanningResult<Box<dyn BomSource>> {
    Ok(match config.mode {
        BomSourceMode::Local => Box::new(LocalBomSource::new(catalog)),
        BomSourceMode::Remote => Box::new(HttpBomService::from_config(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use torvan_utils::InMemoryCatalog;

    #[tokio::test]
    async fn test_local_source_reports_unresolved_roots() {
        let source = LocalBomSource::new(Arc::new(InMemoryCatalog::new()));
        let build = torvan_models::BuildConfiguration {
            build_number: "B1".to_string(),
            sink_model_id: "T2-B1".to_string(),
            dimensions: torvan_models::SinkDimensions { width: 30, length: 60 },
            legs_type_id: None,
            feet_type_id: None,
            pegboard: Default::default(),
            basins: Vec::new(),
            faucets: Vec::new(),
            sprayers: Vec::new(),
            accessories: Default::default(),
            accessory_items: Vec::new(),
            control_box_id: None,
        };

        let result = source.generate("ORD-1", &[build]).await.unwrap();

        assert!(result.hierarchical.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].node_id, "T2-BODY-48-60-HA");
    }

    #[test]
    fn test_remote_mode_builds_http_client() {
        let config = BomServiceConfig {
            mode: BomSourceMode::Remote,
            url: "http://localhost:3005/api/bom".to_string(),
            timeout_seconds: 5,
        };
        assert!(bom_source_from_config(&config, Arc::new(InMemoryCatalog::new())).is_ok());
    }
}
