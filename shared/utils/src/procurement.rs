//! Procurement Reconciler
//!
//! Merges the outsourced leg and feet kits found in the BOM with the
//! procurement specialist's tracked records. Tracked records are
//! authoritative: when a part number exists in both, the tracked status,
//! timestamps, assignee and notes replace the BOM defaults as a whole.

use std::collections::{HashMap, HashSet};

use torvan_models::{
    BomAnalysis, ProcurementCategory, ProcurementItem, ProcurementReport, ProcurementSource,
    ProcurementStatus, ProcurementSummary, TrackedProcurement,
};
use tracing::debug;

use crate::config::PlanningConfig;

#[derive(Debug, Clone)]
pub struct ProcurementReconciler {
    legs: HashSet<String>,
    feet: HashSet<String>,
}

impl ProcurementReconciler {
    pub fn new(legs: impl IntoIterator<Item = String>, feet: impl IntoIterator<Item = String>) -> Self {
        Self {
            legs: legs.into_iter().collect(),
            feet: feet.into_iter().collect(),
        }
    }

    pub fn from_config(config: &PlanningConfig) -> Self {
        Self::new(
            config.leg_part_numbers.iter().cloned(),
            config.feet_part_numbers.iter().cloned(),
        )
    }

    fn category_of(&self, part_number: &str) -> Option<ProcurementCategory> {
        if self.legs.contains(part_number) {
            Some(ProcurementCategory::Legs)
        } else if self.feet.contains(part_number) {
            Some(ProcurementCategory::Feet)
        } else {
            None
        }
    }

    /// Allow-listed BOM items, one per part number in BOM order. Quantities
    /// are total consumption across the tree.
    pub fn candidates(&self, analysis: &BomAnalysis) -> Vec<ProcurementItem> {
        let mut candidates: Vec<ProcurementItem> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (index, item) in analysis.items.iter().enumerate() {
            let category = match self.category_of(&item.id) {
                Some(category) => category,
                None => continue,
            };
            let quantity = u32::try_from(analysis.total_quantity(index)).unwrap_or(u32::MAX);

            match positions.get(item.id.as_str()) {
                Some(&position) => {
                    let existing = &mut candidates[position];
                    existing.quantity = existing.quantity.saturating_add(quantity);
                }
                None => {
                    positions.insert(item.id.as_str(), candidates.len());
                    candidates.push(ProcurementItem {
                        part_number: item.id.clone(),
                        name: Some(item.name.clone()),
                        category: Some(category),
                        quantity,
                        source: ProcurementSource::SingleSourceOfTruth,
                        status: ProcurementStatus::Pending,
                        sent_at: None,
                        received_at: None,
                        assignee: None,
                        notes: None,
                    });
                }
            }
        }

        candidates
    }

    pub fn reconcile(&self, analysis: &BomAnalysis, tracked: &[TrackedProcurement]) -> ProcurementReport {
        merge(self.candidates(analysis), tracked)
    }
}

/// Overlay tracked records onto BOM candidates. With duplicate tracked
/// records for one part number the last one wins.
pub fn merge(candidates: Vec<ProcurementItem>, tracked: &[TrackedProcurement]) -> ProcurementReport {
    let mut latest: HashMap<&str, &TrackedProcurement> = HashMap::new();
    let mut tracked_order: Vec<&str> = Vec::new();
    for record in tracked {
        if latest.insert(record.part_number.as_str(), record).is_none() {
            tracked_order.push(record.part_number.as_str());
        }
    }

    let bom_parts: HashSet<String> = candidates.iter().map(|c| c.part_number.clone()).collect();

    let mut items: Vec<ProcurementItem> = candidates
        .into_iter()
        .map(|candidate| match latest.get(candidate.part_number.as_str()) {
            Some(record) => overlay(candidate, record),
            None => candidate,
        })
        .collect();

    for part_number in tracked_order {
        if bom_parts.contains(part_number) {
            continue;
        }
        if let Some(record) = latest.get(part_number) {
            items.push(manual_item(record));
        }
    }

    let summary = ProcurementSummary::from_items(&items);
    let procurement_needed = items
        .iter()
        .any(|item| item.status != ProcurementStatus::Received);

    debug!(
        items = items.len(),
        pending = summary.pending,
        sent = summary.sent,
        received = summary.received,
        "Procurement reconciled"
    );

    ProcurementReport {
        items,
        summary,
        procurement_needed,
    }
}

fn overlay(candidate: ProcurementItem, record: &TrackedProcurement) -> ProcurementItem {
    ProcurementItem {
        status: record.status.unwrap_or_default(),
        sent_at: record.sent_at,
        received_at: record.received_at,
        assignee: record.assignee.clone(),
        notes: record.notes.clone(),
        ..candidate
    }
}

fn manual_item(record: &TrackedProcurement) -> ProcurementItem {
    ProcurementItem {
        part_number: record.part_number.clone(),
        name: record.name.clone(),
        category: record.category,
        quantity: record.quantity.unwrap_or(1),
        source: ProcurementSource::Manual,
        status: record.status.unwrap_or_default(),
        sent_at: record.sent_at,
        received_at: record.received_at,
        assignee: record.assignee.clone(),
        notes: record.notes.clone(),
    }
}
