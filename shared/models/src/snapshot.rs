//! Persisted order snapshot.
//!
//! The snapshot is the single source of truth for one order. Each top-level
//! section is consumed independently by a downstream module (manufacturing,
//! quality control, procurement, shipping), so removing a field is a breaking
//! change while adding one is not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bom::{BomAnalysis, BomNode, BomWarning};
use crate::configuration::BuildConfiguration;
use crate::procurement::{ProcurementReport, TrackedProcurement};
use crate::task::{ProductionTask, TestingTask};
use crate::workflow::WorkflowState;

pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub metadata: SnapshotMetadata,
    pub order_details: OrderDetails,
    pub configuration: BTreeMap<String, BuildConfiguration>,
    pub bill_of_materials: BillOfMaterialsData,
    pub manufacturing_data: ManufacturingData,
    pub quality_control_data: QualityControlData,
    pub procurement_data: ProcurementData,
    pub shipping_data: ShippingData,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub order_id: String,
    pub schema_version: String,
    /// Incremented on every save.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub generated_by: String,
    /// SHA-256 over the compiled sections; empty until computed.
    #[serde(default)]
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: String,
    pub po_number: Option<String>,
    pub customer_name: Option<String>,
    pub want_date: Option<DateTime<Utc>>,
    pub build_numbers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BillOfMaterialsData {
    pub hierarchical: Vec<BomNode>,
    pub analysis: BomAnalysis,
    pub total_items: usize,
    pub warnings: Vec<BomWarning>,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturingData {
    pub production_tasks: BTreeMap<String, Vec<ProductionTask>>,
    pub estimated_minutes: BTreeMap<String, u32>,
    pub task_warnings: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QualityControlData {
    pub testing_tasks: BTreeMap<String, Vec<TestingTask>>,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementData {
    #[serde(flatten)]
    pub report: ProcurementReport,
    /// Operational records owned by the procurement module.
    #[serde(default)]
    pub tracked: Vec<TrackedProcurement>,
    pub reconciled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingData {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl OrderSnapshot {
    /// Fresh snapshot with only order details and an initial workflow state.
    pub fn new(order_details: OrderDetails, generated_by: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            metadata: SnapshotMetadata {
                order_id: order_details.order_id.clone(),
                schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
                revision: 0,
                created_at: now,
                last_updated: now,
                generated_by: generated_by.into(),
                checksum: String::new(),
            },
            order_details,
            configuration: BTreeMap::new(),
            bill_of_materials: BillOfMaterialsData::default(),
            manufacturing_data: ManufacturingData::default(),
            quality_control_data: QualityControlData::default(),
            procurement_data: ProcurementData::default(),
            shipping_data: ShippingData::default(),
            workflow_state: WorkflowState::new(now),
        }
    }

    pub fn order_id(&self) -> &str {
        &self.metadata.order_id
    }

    /// Bump revision and timestamp, then recompute the checksum.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.metadata.revision += 1;
        self.metadata.last_updated = now;
        self.metadata.checksum = self.calculate_checksum();
    }

    /// Hash of the compiled sections. Metadata and workflow state are excluded
    /// so that stage changes do not alter the content hash.
    pub fn calculate_checksum(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(&self.order_details).unwrap_or_default());
        hasher.update(serde_json::to_string(&self.configuration).unwrap_or_default());
        hasher.update(serde_json::to_string(&self.bill_of_materials.hierarchical).unwrap_or_default());
        hasher.update(serde_json::to_string(&self.manufacturing_data.production_tasks).unwrap_or_default());
        hasher.update(serde_json::to_string(&self.quality_control_data.testing_tasks).unwrap_or_default());
        hasher.update(serde_json::to_string(&self.procurement_data.report.items).unwrap_or_default());

        hex::encode(hasher.finalize())
    }

    pub fn verify_integrity(&self) -> bool {
        self.metadata.checksum == self.calculate_checksum()
    }
}
