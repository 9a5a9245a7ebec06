//! Order workflow state.
//!
//! Stages are strictly ordered. `current_stage` only ever moves forward and a
//! milestone timestamp, once recorded, is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow stages in production order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    OrderCreated,
    BomGenerated,
    ProcurementPlanning,
    PartsOrdered,
    PartsReceived,
    ProductionPlanning,
    Manufacturing,
    QualityControl,
    Packaging,
    Shipped,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 10] = [
        WorkflowStage::OrderCreated,
        WorkflowStage::BomGenerated,
        WorkflowStage::ProcurementPlanning,
        WorkflowStage::PartsOrdered,
        WorkflowStage::PartsReceived,
        WorkflowStage::ProductionPlanning,
        WorkflowStage::Manufacturing,
        WorkflowStage::QualityControl,
        WorkflowStage::Packaging,
        WorkflowStage::Shipped,
    ];

    /// Check if moving to `target` advances the workflow
    pub fn can_transition_to(&self, target: WorkflowStage) -> bool {
        target > *self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Shipped)
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "ORDER_CREATED" => Some(Self::OrderCreated),
            "BOM_GENERATED" => Some(Self::BomGenerated),
            "PROCUREMENT_PLANNING" => Some(Self::ProcurementPlanning),
            "PARTS_ORDERED" => Some(Self::PartsOrdered),
            "PARTS_RECEIVED" => Some(Self::PartsReceived),
            "PRODUCTION_PLANNING" => Some(Self::ProductionPlanning),
            "MANUFACTURING" => Some(Self::Manufacturing),
            "QUALITY_CONTROL" => Some(Self::QualityControl),
            "PACKAGING" => Some(Self::Packaging),
            "SHIPPED" => Some(Self::Shipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderCreated => write!(f, "ORDER_CREATED"),
            Self::BomGenerated => write!(f, "BOM_GENERATED"),
            Self::ProcurementPlanning => write!(f, "PROCUREMENT_PLANNING"),
            Self::PartsOrdered => write!(f, "PARTS_ORDERED"),
            Self::PartsReceived => write!(f, "PARTS_RECEIVED"),
            Self::ProductionPlanning => write!(f, "PRODUCTION_PLANNING"),
            Self::Manufacturing => write!(f, "MANUFACTURING"),
            Self::QualityControl => write!(f, "QUALITY_CONTROL"),
            Self::Packaging => write!(f, "PACKAGING"),
            Self::Shipped => write!(f, "SHIPPED"),
        }
    }
}

/// Outcome of a single `advance` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceOutcome {
    /// `current_stage` moved forward.
    Advanced,
    /// Stage was behind the current one; its milestone was backfilled.
    MilestoneRecorded,
    /// Stage already recorded; only `last_updated` changed.
    AlreadyRecorded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub current_stage: WorkflowStage,
    pub milestones: BTreeMap<WorkflowStage, DateTime<Utc>>,
    pub next_steps: Vec<WorkflowStage>,
    pub completed_steps: Vec<WorkflowStage>,
    #[serde(default)]
    pub stage_data: BTreeMap<WorkflowStage, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut state = Self {
            current_stage: WorkflowStage::OrderCreated,
            milestones: BTreeMap::from([(WorkflowStage::OrderCreated, now)]),
            next_steps: Vec::new(),
            completed_steps: Vec::new(),
            stage_data: BTreeMap::new(),
            last_updated: now,
        };
        state.refresh_steps();
        state
    }

    /// Record `stage`. Idempotent per stage: a second call for an already
    /// recorded stage only touches `last_updated`. Extra data is merged into
    /// `stage_data` when the milestone is first written.
    pub fn advance(
        &mut self,
        stage: WorkflowStage,
        extra_data: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AdvanceOutcome {
        self.last_updated = now;

        if self.milestones.contains_key(&stage) {
            return AdvanceOutcome::AlreadyRecorded;
        }

        self.milestones.insert(stage, now);
        if let Some(data) = extra_data {
            let slot = self
                .stage_data
                .entry(stage)
                .or_insert(serde_json::Value::Null);
            merge_json(slot, data);
        }

        let outcome = if self.current_stage.can_transition_to(stage) {
            self.current_stage = stage;
            AdvanceOutcome::Advanced
        } else {
            AdvanceOutcome::MilestoneRecorded
        };

        self.refresh_steps();
        outcome
    }

    pub fn milestone(&self, stage: WorkflowStage) -> Option<DateTime<Utc>> {
        self.milestones.get(&stage).copied()
    }

    fn refresh_steps(&mut self) {
        self.completed_steps = WorkflowStage::ALL
            .iter()
            .copied()
            .filter(|s| *s <= self.current_stage && self.milestones.contains_key(s))
            .collect();
        self.next_steps = WorkflowStage::ALL
            .iter()
            .copied()
            .filter(|s| *s > self.current_stage)
            .collect();
    }
}

/// Recursive object merge; non-object values from `incoming` replace `target`.
pub fn merge_json(target: &mut serde_json::Value, incoming: serde_json::Value) {
    match (target, incoming) {
        (serde_json::Value::Object(existing), serde_json::Value::Object(update)) => {
            for (key, value) in update {
                merge_json(existing.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}
