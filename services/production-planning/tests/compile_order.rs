use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use torvan_database::{MemorySnapshotStore, MemoryTaskLedger, SnapshotStore, TaskKind, TaskLedger};
use torvan_models::{
    AdvanceOutcome, BasinConfigurationRow, BomResult, BuildConfiguration, ProcurementCategory,
    ProcurementSource, ProcurementStatus, RawBasin, RawOrder, SinkConfigurationRow, TestType,
    TrackedProcurement, WorkflowStage,
};
use torvan_production_planning::{BomSource, LocalBomSource, ProductionPlanCompiler};
use torvan_utils::{InMemoryCatalog, PlanningConfig, PlanningError, PlanningResult};

const CATALOG: &str = r#"
assemblies:
  - id: T2-BODY-48-60-HA
    name: Sink body 48-60in height adjustable
    type: COMPLEX
    category: FRAME
    components:
      - childPartId: T2-FRAME-WELD
        quantity: 1
  - id: T2-DL27-KIT
    name: DL27 leg kit
    type: KIT
    category: LEGS
    components:
      - childPartId: T2-DL27
        quantity: 4
  - id: T2-BSN-EDR-KIT
    name: E-Drain basin kit
    type: KIT
    category: BASIN
    components:
      - childPartId: T2-OVERFLOW-SENSOR
        quantity: 1
parts:
  - id: T2-FRAME-WELD
    name: Welded frame
    type: PART
  - id: T2-DL27
    name: DL27 column
    type: PART
  - id: T2-LEVELING-CASTOR-475
    name: Leveling castor
    type: SERVICE_PART
  - id: T2-OVERFLOW-SENSOR
    name: Overflow sensor
    type: PART
"#;

type MemoryCompiler = ProductionPlanCompiler<MemorySnapshotStore, MemoryTaskLedger>;

fn compiler_with(bom_source: Box<dyn BomSource>) -> MemoryCompiler {
    ProductionPlanCompiler::new(
        bom_source,
        MemorySnapshotStore::new(),
        MemoryTaskLedger::new(),
        &PlanningConfig::default(),
    )
    .unwrap()
}

fn compiler() -> MemoryCompiler {
    let catalog = InMemoryCatalog::from_yaml_str(CATALOG).unwrap();
    compiler_with(Box::new(LocalBomSource::new(Arc::new(catalog))))
}

/// Pegboard enabled, one E-Drain basin, no accessories.
fn edrain_order(order_id: &str) -> RawOrder {
    RawOrder {
        order_id: order_id.to_string(),
        po_number: Some("PO-1001".to_string()),
        customer_name: Some("Mercy General".to_string()),
        want_date: None,
        build_numbers: vec!["B1".to_string()],
        sink_configurations: Some(vec![SinkConfigurationRow {
            build_number: "B1".to_string(),
            sink_model_id: "T2-B1".to_string(),
            width: 30,
            length: 60,
            legs_type_id: Some("T2-DL27-KIT".to_string()),
            feet_type_id: Some("T2-LEVELING-CASTOR-475".to_string()),
            pegboard: true,
            pegboard_type_id: None,
            pegboard_size: None,
            control_box_id: None,
        }]),
        basin_configurations: Some(vec![BasinConfigurationRow {
            build_number: "B1".to_string(),
            basins: vec![RawBasin {
                basin_type: "E-Drain".to_string(),
                basin_size_part_number: None,
                addon_ids: Vec::new(),
            }],
        }]),
        faucet_configurations: None,
        sprayer_configurations: None,
        accessories: None,
    }
}

struct FailingBomSource;

#[async_trait]
impl BomSource for FailingBomSource {
    async fn generate(
        &self,
        _order_id: &str,
        _builds: &[BuildConfiguration],
    ) -> PlanningResult<BomResult> {
        Err(PlanningError::upstream_bom(Some(503), "BOM service unavailable"))
    }
}

#[tokio::test]
async fn test_edrain_order_produces_full_plan() {
    let compiler = compiler();
    let outcome = compiler.compile(&edrain_order("ORD-E2E")).await.unwrap();
    let snapshot = &outcome.snapshot;

    let production = &snapshot.manufacturing_data.production_tasks["B1"];
    assert_eq!(production.len(), 12);
    let basin_tasks: Vec<_> = production
        .iter()
        .filter(|t| t.basin_number == Some(1))
        .collect();
    assert_eq!(basin_tasks.len(), 4);
    assert!(basin_tasks.iter().all(|t| t.task_id.starts_with("BASIN_1_")));

    let testing = &snapshot.quality_control_data.testing_tasks["B1"];
    assert_eq!(testing.len(), 8);
    assert_eq!(
        testing
            .iter()
            .filter(|t| t.basin_number == Some(1) && t.test_type == TestType::PassFail)
            .count(),
        4
    );
    assert_eq!(
        testing.iter().filter(|t| t.test_type == TestType::Setup).count(),
        1
    );

    assert_eq!(snapshot.workflow_state.current_stage, WorkflowStage::BomGenerated);
    assert!(snapshot.verify_integrity());
    assert_eq!(snapshot.metadata.revision, 1);
    assert_eq!(outcome.tasks_registered, 20);
}

#[tokio::test]
async fn test_bom_and_procurement_sections_are_populated() {
    let compiler = compiler();
    let outcome = compiler.compile(&edrain_order("ORD-BOM")).await.unwrap();
    let snapshot = &outcome.snapshot;

    let roots: Vec<&str> = snapshot
        .bill_of_materials
        .hierarchical
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(
        &roots[..4],
        &["T2-BODY-48-60-HA", "T2-DL27-KIT", "T2-LEVELING-CASTOR-475", "T2-BSN-EDR-KIT"]
    );
    // Pegboard kit, pegboard size and control box are not in the test catalog.
    assert_eq!(snapshot.bill_of_materials.warnings.len(), 3);
    // Plus the auto-selected control box that has no install task.
    assert_eq!(outcome.warnings.len(), 4);
    let task_warnings = &snapshot.manufacturing_data.task_warnings;
    assert_eq!(task_warnings.len(), 1);
    assert!(task_warnings[0].contains("T2-CTRL-EDR1"));

    let report = &snapshot.procurement_data.report;
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[0].part_number, "T2-DL27-KIT");
    assert_eq!(report.items[0].category, Some(ProcurementCategory::Legs));
    assert_eq!(report.items[1].category, Some(ProcurementCategory::Feet));
    assert!(report
        .items
        .iter()
        .all(|item| item.status == ProcurementStatus::Pending));
    assert!(report.procurement_needed);
}

#[tokio::test]
async fn test_bom_failure_writes_nothing() {
    let compiler = compiler_with(Box::new(FailingBomSource));

    let error = compiler.compile(&edrain_order("ORD-FAIL")).await.unwrap_err();

    assert_eq!(error.error_code(), "UPSTREAM_BOM_ERROR");
    assert!(compiler.workflow().store().load("ORD-FAIL").await.unwrap().is_none());
    assert!(compiler.ledger().list("ORD-FAIL").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_sink_configuration_is_rejected() {
    let compiler = compiler();
    let mut order = edrain_order("ORD-INCOMPLETE");
    order.build_numbers.push("B2".to_string());

    let error = compiler.compile(&order).await.unwrap_err();

    assert_eq!(
        error,
        PlanningError::ConfigurationIncomplete {
            build_number: "B2".to_string()
        }
    );
    assert!(compiler
        .workflow()
        .store()
        .load("ORD-INCOMPLETE")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_recompile_registers_no_duplicate_tasks() {
    let compiler = compiler();
    let order = edrain_order("ORD-IDEMPOTENT");

    let first = compiler.compile(&order).await.unwrap();
    let second = compiler.compile(&order).await.unwrap();

    assert_eq!(first.tasks_registered, 20);
    assert_eq!(second.tasks_registered, 0);
    assert_eq!(first.plans, second.plans);
    assert_eq!(second.snapshot.metadata.revision, 2);

    let records = compiler.ledger().list("ORD-IDEMPOTENT").await.unwrap();
    assert_eq!(records.len(), 20);
    assert_eq!(
        records.iter().filter(|r| r.kind == TaskKind::Testing).count(),
        8
    );
}

#[tokio::test]
async fn test_tracked_procurement_overrides_bom_defaults() {
    let compiler = compiler();
    compiler.compile(&edrain_order("ORD-PROC")).await.unwrap();

    let mut manual = TrackedProcurement::new("T2-EXTRA-SHELF", ProcurementStatus::Sent);
    manual.quantity = Some(2);
    let snapshot = compiler
        .record_tracked_procurement(
            "ORD-PROC",
            vec![
                TrackedProcurement::new("T2-DL27-KIT", ProcurementStatus::Received),
                manual,
            ],
        )
        .await
        .unwrap();

    let items = &snapshot.procurement_data.report.items;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].status, ProcurementStatus::Received);
    assert_eq!(items[1].status, ProcurementStatus::Pending);
    assert_eq!(items[2].source, ProcurementSource::Manual);
    assert_eq!(items[2].quantity, 2);

    // Recompiling keeps the tracked layer and re-applies it.
    let outcome = compiler.compile(&edrain_order("ORD-PROC")).await.unwrap();
    let report = &outcome.snapshot.procurement_data.report;
    assert_eq!(report.items[0].status, ProcurementStatus::Received);
    assert_eq!(report.summary.received, 1);
    assert_eq!(report.summary.sent, 1);
    assert_eq!(report.summary.pending, 1);
}

#[tokio::test]
async fn test_reconcile_procurement_rereads_stored_state() {
    let compiler = compiler();
    let error = compiler.reconcile_procurement("ORD-MISSING").await.unwrap_err();
    assert_eq!(error.error_code(), "NOT_FOUND");

    let compiled = compiler.compile(&edrain_order("ORD-RECON")).await.unwrap();
    let snapshot = compiler.reconcile_procurement("ORD-RECON").await.unwrap();

    assert_eq!(
        snapshot.procurement_data.report,
        compiled.snapshot.procurement_data.report
    );
    assert_eq!(snapshot.metadata.revision, compiled.snapshot.metadata.revision + 1);
}

#[tokio::test]
async fn test_workflow_stage_never_moves_backward() {
    let compiler = compiler();
    compiler.compile(&edrain_order("ORD-FLOW")).await.unwrap();

    let (snapshot, outcome) = compiler
        .advance(
            "ORD-FLOW",
            WorkflowStage::ProcurementPlanning,
            Some(serde_json::json!({ "planner": "jdoe" })),
        )
        .await
        .unwrap();
    assert_eq!(outcome, AdvanceOutcome::Advanced);
    let recorded = snapshot
        .workflow_state
        .milestone(WorkflowStage::ProcurementPlanning)
        .unwrap();

    let (snapshot, outcome) = compiler
        .advance("ORD-FLOW", WorkflowStage::OrderCreated, None)
        .await
        .unwrap();
    assert_eq!(outcome, AdvanceOutcome::AlreadyRecorded);
    assert_eq!(
        snapshot.workflow_state.current_stage,
        WorkflowStage::ProcurementPlanning
    );
    assert_eq!(
        snapshot
            .workflow_state
            .milestone(WorkflowStage::ProcurementPlanning),
        Some(recorded)
    );

    // A recompile records BOM_GENERATED again without rewinding.
    let outcome = compiler.compile(&edrain_order("ORD-FLOW")).await.unwrap();
    assert_eq!(
        outcome.snapshot.workflow_state.current_stage,
        WorkflowStage::ProcurementPlanning
    );
}

#[tokio::test]
async fn test_concurrent_compiles_of_one_order_serialize() {
    let compiler = Arc::new(compiler());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let compiler = Arc::clone(&compiler);
        handles.push(tokio::spawn(async move {
            compiler.compile(&edrain_order("ORD-RACE")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = compiler
        .workflow()
        .store()
        .load("ORD-RACE")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.metadata.revision, 8);
    assert!(stored.verify_integrity());
    assert_eq!(compiler.ledger().list("ORD-RACE").await.unwrap().len(), 20);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_basin_fan_out_through_compiler(kinds in prop::collection::vec(prop::bool::ANY, 0..4)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let compiler = compiler();
        let mut order = edrain_order("ORD-PROP");
        order.basin_configurations = Some(vec![BasinConfigurationRow {
            build_number: "B1".to_string(),
            basins: kinds
                .iter()
                .map(|&e_sink| RawBasin {
                    basin_type: if e_sink { "E-Sink" } else { "E-Drain" }.to_string(),
                    basin_size_part_number: None,
                    addon_ids: Vec::new(),
                })
                .collect(),
        }]);

        let first = runtime.block_on(compiler.compile(&order)).unwrap();
        let second = runtime.block_on(compiler.compile(&order)).unwrap();

        let production = &first.snapshot.manufacturing_data.production_tasks["B1"];
        for (index, &e_sink) in kinds.iter().enumerate() {
            let number = index as u32 + 1;
            let tagged = production
                .iter()
                .filter(|t| t.basin_number == Some(number))
                .count();
            prop_assert_eq!(tagged, if e_sink { 8 } else { 4 });
        }

        let ids = |outcome: &torvan_production_planning::CompileOutcome| -> Vec<String> {
            outcome.plans[0].production.iter().map(|t| t.task_id.clone()).collect()
        };
        prop_assert_eq!(ids(&first), ids(&second));
        prop_assert_eq!(second.tasks_registered, 0);
    }
}
