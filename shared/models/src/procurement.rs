//! Procurement tracking for outsourced parts.
//!
//! A `ProcurementItem` combines two layers keyed by part number: what the BOM
//! says is needed and what the procurement specialist has tracked so far.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcurementCategory {
    Legs,
    Feet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcurementStatus {
    #[default]
    Pending,
    Sent,
    Received,
}

impl fmt::Display for ProcurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Sent => write!(f, "SENT"),
            Self::Received => write!(f, "RECEIVED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcurementSource {
    /// Derived from the compiled BOM.
    SingleSourceOfTruth,
    /// Added by hand outside the BOM-derived set.
    Manual,
}

/// Merged procurement record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementItem {
    pub part_number: String,
    pub name: Option<String>,
    pub category: Option<ProcurementCategory>,
    pub quantity: u32,
    pub source: ProcurementSource,
    pub status: ProcurementStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub notes: Option<String>,
}

/// Operational record kept by the procurement module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProcurement {
    pub part_number: String,
    #[serde(default)]
    pub status: Option<ProcurementStatus>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<ProcurementCategory>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl TrackedProcurement {
    pub fn new(part_number: impl Into<String>, status: ProcurementStatus) -> Self {
        Self {
            part_number: part_number.into(),
            status: Some(status),
            sent_at: None,
            received_at: None,
            assignee: None,
            notes: None,
            name: None,
            category: None,
            quantity: None,
        }
    }
}

impl From<&ProcurementItem> for TrackedProcurement {
    fn from(item: &ProcurementItem) -> Self {
        Self {
            part_number: item.part_number.clone(),
            status: Some(item.status),
            sent_at: item.sent_at,
            received_at: item.received_at,
            assignee: item.assignee.clone(),
            notes: item.notes.clone(),
            name: item.name.clone(),
            category: item.category,
            quantity: Some(item.quantity),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementSummary {
    pub total: usize,
    pub pending: usize,
    pub sent: usize,
    pub received: usize,
}

impl ProcurementSummary {
    pub fn from_items(items: &[ProcurementItem]) -> Self {
        items.iter().fold(Self::default(), |mut summary, item| {
            summary.total += 1;
            match item.status {
                ProcurementStatus::Pending => summary.pending += 1,
                ProcurementStatus::Sent => summary.sent += 1,
                ProcurementStatus::Received => summary.received += 1,
            }
            summary
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementReport {
    pub items: Vec<ProcurementItem>,
    pub summary: ProcurementSummary,
    pub procurement_needed: bool,
}
