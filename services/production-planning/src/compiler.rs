//! Production Plan Compiler
//!
//! Runs one order through normalization, BOM expansion, analysis, task
//! generation and procurement reconciliation, then writes every section of
//! the snapshot in a single exclusive update. A failed BOM stage aborts
//! before any task is generated or anything is written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::Instrument;

use torvan_database::{CompiledSections, SnapshotStore, TaskLedger, TaskRecord, WorkflowSnapshots};
use torvan_models::{
    AdvanceOutcome, BillOfMaterialsData, ManufacturingData, OrderSnapshot, QualityControlData,
    RawOrder, TrackedProcurement, WorkflowStage,
};
use torvan_utils::{
    log_planning_error, log_stage, planning_span, BomAnalyzer, BuildTaskPlan,
    ConfigurationNormalizer, PlanningConfig, PlanningResult, ProcurementReconciler,
    TaskRuleEngine,
};

use crate::bom_source::BomSource;

pub const GENERATED_BY: &str = "torvan-production-planning";

/// Result of one compile
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub snapshot: OrderSnapshot,
    pub plans: Vec<BuildTaskPlan>,
    /// Tasks newly added to the ledger. Zero when recompiling an
    /// unchanged order.
    pub tasks_registered: usize,
    /// Every recovered condition, in pipeline order.
    pub warnings: Vec<String>,
}

pub struct ProductionPlanCompiler<S, L> {
    normalizer: ConfigurationNormalizer,
    bom_source: Box<dyn BomSource>,
    analyzer: BomAnalyzer,
    tasks: TaskRuleEngine,
    reconciler: ProcurementReconciler,
    workflow: WorkflowSnapshots<S>,
    ledger: L,
}

impl<S: SnapshotStore, L: TaskLedger> ProductionPlanCompiler<S, L> {
    pub fn new(
        bom_source: Box<dyn BomSource>,
        store: S,
        ledger: L,
        config: &PlanningConfig,
    ) -> PlanningResult<Self> {
        Ok(Self {
            normalizer: ConfigurationNormalizer::new(),
            bom_source,
            analyzer: BomAnalyzer::from_config(config)?,
            tasks: TaskRuleEngine::new(),
            reconciler: ProcurementReconciler::from_config(config),
            workflow: WorkflowSnapshots::new(store, GENERATED_BY),
            ledger,
        })
    }

    pub fn workflow(&self) -> &WorkflowSnapshots<S> {
        &self.workflow
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Replace the tracked procurement records of a compiled order and
    /// reconcile them against its stored BOM analysis.
    pub async fn record_tracked_procurement(
        &self,
        order_id: &str,
        tracked: Vec<TrackedProcurement>,
    ) -> PlanningResult<OrderSnapshot> {
        let reconciler = self.reconciler.clone();
        self.workflow
            .record_tracked_procurement(
                order_id,
                tracked,
                Box::new(move |analysis, tracked| reconciler.reconcile(analysis, tracked)),
            )
            .await
    }

    /// Re-run reconciliation for a compiled order against its stored BOM
    /// analysis and tracked records.
    pub async fn reconcile_procurement(&self, order_id: &str) -> PlanningResult<OrderSnapshot> {
        let reconciler = self.reconciler.clone();
        self.workflow
            .record_procurement(
                order_id,
                Box::new(move |analysis, tracked| reconciler.reconcile(analysis, tracked)),
            )
            .await
    }

    pub async fn advance(
        &self,
        order_id: &str,
        stage: WorkflowStage,
        extra_data: Option<Value>,
    ) -> PlanningResult<(OrderSnapshot, AdvanceOutcome)> {
        self.workflow.advance(order_id, stage, extra_data).await
    }

    pub async fn compile(&self, order: &RawOrder) -> PlanningResult<CompileOutcome> {
        let span = planning_span(&order.order_id);
        self.compile_order(order).instrument(span).await
    }

    async fn compile_order(&self, order: &RawOrder) -> PlanningResult<CompileOutcome> {
        let normalized = self.normalizer.normalize(order).map_err(|e| {
            log_planning_error!(e, "Order normalization failed");
            e
        })?;
        let order_id = normalized.details.order_id.clone();
        let mut warnings = normalized.warnings.clone();
        log_stage!("normalize", order_id, builds = normalized.builds.len());

        let bom = self
            .bom_source
            .generate(&order_id, &normalized.builds)
            .await
            .map_err(|e| {
                log_planning_error!(e, "BOM generation failed; nothing written");
                e
            })?;
        warnings.extend(bom.warnings.iter().map(|w| w.message.clone()));
        log_stage!("bom", order_id, total_items = bom.total_items, warnings = bom.warnings.len());

        let analysis = self.analyzer.analyze(&bom.hierarchical);
        log_stage!(
            "analyze",
            order_id,
            items = analysis.items.len(),
            critical = analysis.critical_components.len()
        );

        let plans: Vec<BuildTaskPlan> = normalized
            .builds
            .iter()
            .map(|build| self.tasks.generate(build))
            .collect();
        for plan in &plans {
            warnings.extend(plan.warnings.iter().cloned());
        }
        log_stage!(
            "tasks",
            order_id,
            production = plans.iter().map(|p| p.production.len()).sum::<usize>(),
            testing = plans.iter().map(|p| p.testing.len()).sum::<usize>()
        );

        let now = Utc::now();
        let reconciler = self.reconciler.clone();
        let bill_of_materials = BillOfMaterialsData {
            hierarchical: bom.hierarchical,
            analysis,
            total_items: bom.total_items,
            warnings: bom.warnings,
            generated_at: Some(now),
        };

        let snapshot = self
            .workflow
            .record_compilation(CompiledSections {
                details: normalized.details.clone(),
                configuration: normalized
                    .builds
                    .iter()
                    .map(|build| (build.build_number.clone(), build.clone()))
                    .collect(),
                bill_of_materials,
                manufacturing: manufacturing_section(&plans, now),
                quality_control: quality_control_section(&plans, now),
                reconcile: Box::new(move |analysis, tracked| reconciler.reconcile(analysis, tracked)),
                stage: WorkflowStage::BomGenerated,
            })
            .await
            .map_err(|e| {
                log_planning_error!(e, "Snapshot update failed");
                e
            })?;
        log_stage!(
            "snapshot",
            order_id,
            revision = snapshot.metadata.revision,
            procurement_needed = snapshot.procurement_data.report.procurement_needed
        );

        let mut records = Vec::new();
        for plan in &plans {
            records.extend(TaskRecord::from_plan(&order_id, plan)?);
        }
        let tasks_registered = self.ledger.register(&records).await?;
        log_stage!("register", order_id, submitted = records.len(), created = tasks_registered);

        Ok(CompileOutcome {
            snapshot,
            plans,
            tasks_registered,
            warnings,
        })
    }
}

fn manufacturing_section(plans: &[BuildTaskPlan], now: DateTime<Utc>) -> ManufacturingData {
    let mut production_tasks = BTreeMap::new();
    let mut estimated_minutes = BTreeMap::new();
    let mut task_warnings = Vec::new();

    for plan in plans {
        production_tasks.insert(plan.build_number.clone(), plan.production.clone());
        estimated_minutes.insert(plan.build_number.clone(), plan.estimated_minutes());
        task_warnings.extend(plan.warnings.iter().cloned());
    }

    ManufacturingData {
        production_tasks,
        estimated_minutes,
        task_warnings,
        generated_at: Some(now),
    }
}

fn quality_control_section(plans: &[BuildTaskPlan], now: DateTime<Utc>) -> QualityControlData {
    QualityControlData {
        testing_tasks: plans
            .iter()
            .map(|plan| (plan.build_number.clone(), plan.testing.clone()))
            .collect(),
        generated_at: Some(now),
    }
}
