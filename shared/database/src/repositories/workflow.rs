//! Workflow Snapshots
//!
//! Section-level operations on top of a `SnapshotStore`. Callers record one
//! compiled artifact or one workflow stage at a time and never handle the
//! whole document, so the storage model can change without touching them.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::info;

use torvan_models::{
    AdvanceOutcome, BillOfMaterialsData, BomAnalysis, BuildConfiguration, ManufacturingData, OrderDetails,
    OrderSnapshot, ProcurementData, ProcurementReport, QualityControlData, TrackedProcurement,
    WorkflowStage,
};
use torvan_utils::{PlanningError, PlanningResult};

use super::snapshot::SnapshotStore;

/// Reconciliation run against the stored BOM analysis and the tracked
/// procurement records, inside the order's exclusive section.
pub type ReconcileFn =
    Box<dyn FnOnce(&BomAnalysis, &[TrackedProcurement]) -> ProcurementReport + Send>;

/// Output of one compile, written in a single exclusive update
pub struct CompiledSections {
    pub details: OrderDetails,
    pub configuration: BTreeMap<String, BuildConfiguration>,
    pub bill_of_materials: BillOfMaterialsData,
    pub manufacturing: ManufacturingData,
    pub quality_control: QualityControlData,
    pub reconcile: ReconcileFn,
    /// Stage to record once the sections are written.
    pub stage: WorkflowStage,
}

pub struct WorkflowSnapshots<S> {
    store: S,
    generated_by: String,
}

impl<S: SnapshotStore> WorkflowSnapshots<S> {
    pub fn new(store: S, generated_by: impl Into<String>) -> Self {
        Self {
            store,
            generated_by: generated_by.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load(&self, order_id: &str) -> PlanningResult<OrderSnapshot> {
        self.store
            .load(order_id)
            .await?
            .ok_or_else(|| PlanningError::not_found(format!("snapshot for order {}", order_id)))
    }

    pub async fn save(&self, snapshot: OrderSnapshot) -> PlanningResult<OrderSnapshot> {
        self.store.save(snapshot).await
    }

    /// Record `stage` for an existing order. Re-recording a stage only
    /// refreshes `lastUpdated`; the current stage never moves backward.
    pub async fn advance(
        &self,
        order_id: &str,
        stage: WorkflowStage,
        extra_data: Option<Value>,
    ) -> PlanningResult<(OrderSnapshot, AdvanceOutcome)> {
        let missing = order_id.to_string();
        let (sender, mut receiver) = oneshot::channel();

        let snapshot = self
            .store
            .update(
                order_id,
                Box::new(move |current| {
                    let mut snapshot = current.ok_or_else(|| {
                        PlanningError::not_found(format!("snapshot for order {}", missing))
                    })?;
                    let _ = sender.send(snapshot.workflow_state.advance(stage, extra_data, Utc::now()));
                    Ok(snapshot)
                }),
            )
            .await?;

        let outcome = receiver.try_recv().map_err(|_| {
            PlanningError::internal(format!("advance of order {} reported no outcome", order_id))
        })?;

        info!(
            order_id = %order_id,
            stage = ?stage,
            outcome = ?outcome,
            current_stage = ?snapshot.workflow_state.current_stage,
            "Workflow stage recorded"
        );
        Ok((snapshot, outcome))
    }

    /// Write the BOM section, creating the snapshot when the order is new.
    pub async fn record_bom(
        &self,
        details: OrderDetails,
        configuration: BTreeMap<String, BuildConfiguration>,
        bill_of_materials: BillOfMaterialsData,
    ) -> PlanningResult<OrderSnapshot> {
        let order_id = details.order_id.clone();
        let generated_by = self.generated_by.clone();

        self.store
            .update(
                &order_id,
                Box::new(move |current| {
                    let mut snapshot = existing_or_new(current, &details, &generated_by);
                    snapshot.order_details = details;
                    snapshot.configuration = configuration;
                    snapshot.bill_of_materials = bill_of_materials;
                    Ok(snapshot)
                }),
            )
            .await
    }

    pub async fn record_production_plan(
        &self,
        order_id: &str,
        manufacturing: ManufacturingData,
        quality_control: QualityControlData,
    ) -> PlanningResult<OrderSnapshot> {
        let missing = order_id.to_string();
        self.store
            .update(
                order_id,
                Box::new(move |current| {
                    let mut snapshot = current.ok_or_else(|| {
                        PlanningError::not_found(format!("snapshot for order {}", missing))
                    })?;
                    snapshot.manufacturing_data = manufacturing;
                    snapshot.quality_control_data = quality_control;
                    Ok(snapshot)
                }),
            )
            .await
    }

    /// Re-run reconciliation against the stored tracked records.
    pub async fn record_procurement(&self, order_id: &str, reconcile: ReconcileFn) -> PlanningResult<OrderSnapshot> {
        let missing = order_id.to_string();
        self.store
            .update(
                order_id,
                Box::new(move |current| {
                    let mut snapshot = current.ok_or_else(|| {
                        PlanningError::not_found(format!("snapshot for order {}", missing))
                    })?;
                    apply_procurement(&mut snapshot, reconcile);
                    Ok(snapshot)
                }),
            )
            .await
    }

    /// Replace the tracked procurement records and re-reconcile.
    pub async fn record_tracked_procurement(
        &self,
        order_id: &str,
        tracked: Vec<TrackedProcurement>,
        reconcile: ReconcileFn,
    ) -> PlanningResult<OrderSnapshot> {
        let missing = order_id.to_string();
        self.store
            .update(
                order_id,
                Box::new(move |current| {
                    let mut snapshot = current.ok_or_else(|| {
                        PlanningError::not_found(format!("snapshot for order {}", missing))
                    })?;
                    snapshot.procurement_data.tracked = tracked;
                    apply_procurement(&mut snapshot, reconcile);
                    Ok(snapshot)
                }),
            )
            .await
    }

    /// Write every compiled section and record the stage in one exclusive
    /// update.
    pub async fn record_compilation(&self, sections: CompiledSections) -> PlanningResult<OrderSnapshot> {
        let order_id = sections.details.order_id.clone();
        let generated_by = self.generated_by.clone();

        self.store
            .update(
                &order_id,
                Box::new(move |current| {
                    let CompiledSections {
                        details,
                        configuration,
                        bill_of_materials,
                        manufacturing,
                        quality_control,
                        reconcile,
                        stage,
                    } = sections;

                    let mut snapshot = existing_or_new(current, &details, &generated_by);
                    let now = Utc::now();
                    snapshot.order_details = details;
                    snapshot.configuration = configuration;
                    snapshot.bill_of_materials = bill_of_materials;
                    snapshot.manufacturing_data = manufacturing;
                    snapshot.quality_control_data = quality_control;
                    apply_procurement(&mut snapshot, reconcile);
                    snapshot.workflow_state.advance(stage, None, now);
                    Ok(snapshot)
                }),
            )
            .await
    }
}

fn existing_or_new(current: Option<OrderSnapshot>, details: &OrderDetails, generated_by: &str) -> OrderSnapshot {
    current.unwrap_or_else(|| OrderSnapshot::new(details.clone(), generated_by, Utc::now()))
}

/// Tracked records are operational data and are carried over untouched.
fn apply_procurement(snapshot: &mut OrderSnapshot, reconcile: ReconcileFn) {
    let report = reconcile(
        &snapshot.bill_of_materials.analysis,
        &snapshot.procurement_data.tracked,
    );
    let tracked = std::mem::take(&mut snapshot.procurement_data.tracked);
    snapshot.procurement_data = ProcurementData {
        report,
        tracked,
        reconciled_at: Some(Utc::now()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::snapshot::MemorySnapshotStore;
    use torvan_models::{ProcurementStatus, ProcurementSummary};

    fn details(order_id: &str) -> OrderDetails {
        OrderDetails {
            order_id: order_id.to_string(),
            build_numbers: vec!["B1".to_string()],
            ..Default::default()
        }
    }

    fn workflow() -> WorkflowSnapshots<MemorySnapshotStore> {
        WorkflowSnapshots::new(MemorySnapshotStore::new(), "test")
    }

    #[tokio::test]
    async fn test_advance_requires_existing_snapshot() {
        let error = workflow()
            .advance("ORD-404", WorkflowStage::BomGenerated, None)
            .await
            .unwrap_err();
        assert_eq!(error.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_advance_never_moves_backward() {
        let workflow = workflow();
        workflow
            .record_bom(details("ORD-1"), BTreeMap::new(), BillOfMaterialsData::default())
            .await
            .unwrap();

        let (snapshot, outcome) = workflow
            .advance("ORD-1", WorkflowStage::ProcurementPlanning, None)
            .await
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced);
        let recorded = snapshot
            .workflow_state
            .milestone(WorkflowStage::ProcurementPlanning)
            .unwrap();

        let (snapshot, outcome) = workflow
            .advance("ORD-1", WorkflowStage::OrderCreated, None)
            .await
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::AlreadyRecorded);
        assert_eq!(
            snapshot.workflow_state.current_stage,
            WorkflowStage::ProcurementPlanning
        );
        assert_eq!(
            snapshot.workflow_state.milestone(WorkflowStage::ProcurementPlanning),
            Some(recorded)
        );
    }

    #[tokio::test]
    async fn test_section_writes_require_existing_snapshot() {
        let workflow = workflow();

        let error = workflow
            .record_production_plan("ORD-404", ManufacturingData::default(), QualityControlData::default())
            .await
            .unwrap_err();
        assert_eq!(error.error_code(), "NOT_FOUND");

        let error = workflow
            .record_procurement("ORD-404", Box::new(|_, _| ProcurementReport::default()))
            .await
            .unwrap_err();
        assert_eq!(error.error_code(), "NOT_FOUND");
        assert!(workflow.store().load("ORD-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_production_plan_keeps_other_sections() {
        let workflow = workflow();
        workflow
            .record_bom(details("ORD-1"), BTreeMap::new(), BillOfMaterialsData::default())
            .await
            .unwrap();

        let manufacturing = ManufacturingData {
            estimated_minutes: BTreeMap::from([("B1".to_string(), 240)]),
            ..Default::default()
        };
        let snapshot = workflow
            .record_production_plan("ORD-1", manufacturing, QualityControlData::default())
            .await
            .unwrap();

        assert_eq!(snapshot.manufacturing_data.estimated_minutes["B1"], 240);
        assert_eq!(snapshot.order_details.build_numbers, vec!["B1"]);
        assert_eq!(snapshot.workflow_state.current_stage, WorkflowStage::OrderCreated);
    }

    #[tokio::test]
    async fn test_record_procurement_reconciles_stored_tracked_records() {
        let workflow = workflow();
        workflow
            .record_bom(details("ORD-1"), BTreeMap::new(), BillOfMaterialsData::default())
            .await
            .unwrap();
        workflow
            .record_tracked_procurement(
                "ORD-1",
                vec![
                    TrackedProcurement::new("T2-DL27-KIT", ProcurementStatus::Received),
                    TrackedProcurement::new("T2-LEVELING-CASTOR-475", ProcurementStatus::Sent),
                ],
                Box::new(|_, _| ProcurementReport::default()),
            )
            .await
            .unwrap();

        let snapshot = workflow
            .record_procurement(
                "ORD-1",
                Box::new(|_, tracked| ProcurementReport {
                    items: Vec::new(),
                    summary: ProcurementSummary {
                        total: tracked.len(),
                        ..Default::default()
                    },
                    procurement_needed: false,
                }),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.procurement_data.report.summary.total, 2);
        assert_eq!(snapshot.procurement_data.tracked.len(), 2);
        assert!(snapshot.procurement_data.reconciled_at.is_some());
    }

    #[tokio::test]
    async fn test_tracked_records_survive_recompilation() {
        let workflow = workflow();
        workflow
            .record_bom(details("ORD-1"), BTreeMap::new(), BillOfMaterialsData::default())
            .await
            .unwrap();
        workflow
            .record_tracked_procurement(
                "ORD-1",
                vec![TrackedProcurement::new("T2-DL27-KIT", ProcurementStatus::Sent)],
                Box::new(|_, _| ProcurementReport::default()),
            )
            .await
            .unwrap();

        let snapshot = workflow
            .record_compilation(CompiledSections {
                details: details("ORD-1"),
                configuration: BTreeMap::new(),
                bill_of_materials: BillOfMaterialsData::default(),
                manufacturing: ManufacturingData::default(),
                quality_control: QualityControlData::default(),
                reconcile: Box::new(|_, tracked| ProcurementReport {
                    items: Vec::new(),
                    summary: ProcurementSummary {
                        total: tracked.len(),
                        ..Default::default()
                    },
                    procurement_needed: !tracked.is_empty(),
                }),
                stage: WorkflowStage::BomGenerated,
            })
            .await
            .unwrap();

        assert_eq!(snapshot.procurement_data.tracked.len(), 1);
        assert_eq!(snapshot.procurement_data.report.summary.total, 1);
        assert!(snapshot.procurement_data.reconciled_at.is_some());
        assert_eq!(snapshot.workflow_state.current_stage, WorkflowStage::BomGenerated);
    }
}
