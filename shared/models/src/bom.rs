//! Bill of materials models.
//!
//! Two shapes exist side by side: the expansion output (`BomResult`, matching
//! the upstream BOM service contract) and the analyzed view (`BomAnalysis`)
//! with classification and critical-component flags.
//!
//! Quantities are always local to the parent-child edge. Nothing here is
//! pre-multiplied across levels; use [`BomAnalysis::total_quantity`] when the
//! total consumption of an item is needed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::AssemblyType;

/// Node of the per-order BOM tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BomNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: AssemblyType,
    pub category: String,
    pub quantity: u32,
    /// Ancestor names joined with `" > "`; empty for roots.
    pub parent_path: String,
    #[serde(default)]
    pub children: Vec<BomNode>,
}

impl BomNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(BomNode::subtree_size).sum::<usize>()
    }
}

/// Pre-order flattening produced alongside the tree by the expansion engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: AssemblyType,
    pub category: String,
    pub quantity: u32,
    pub level: usize,
    pub parent_path: String,
    pub has_children: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BomWarningKind {
    UnresolvedReference,
    UnresolvedRoot,
    SinkLengthOutOfRange,
    UnrecognizedBasinType,
}

/// Recovered problem recorded during expansion instead of failing the compile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BomWarning {
    pub kind: BomWarningKind,
    pub node_id: String,
    pub parent_id: Option<String>,
    pub build_number: Option<String>,
    pub message: String,
}

/// Expansion output. Same shape as the upstream BOM service response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BomResult {
    pub hierarchical: Vec<BomNode>,
    pub flattened: Vec<BomLine>,
    pub total_items: usize,
    #[serde(default)]
    pub warnings: Vec<BomWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManufacturingType {
    AssemblyKit,
    ComplexAssembly,
    SimpleAssembly,
    ManufacturedPart,
    PurchasedPart,
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcurementType {
    InternalManufacture,
    ExternalPurchase,
    Assembly,
}

impl fmt::Display for ProcurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InternalManufacture => write!(f, "INTERNAL_MANUFACTURE"),
            Self::ExternalPurchase => write!(f, "EXTERNAL_PURCHASE"),
            Self::Assembly => write!(f, "ASSEMBLY"),
        }
    }
}

/// One BOM tree node after analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedBomItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: AssemblyType,
    pub category: String,
    pub quantity: u32,
    pub parent_path: Vec<String>,
    /// Index of the parent in the flattened list; `None` for roots.
    pub parent_index: Option<usize>,
    pub depth: usize,
    pub child_count: usize,
    pub is_assembly: bool,
    pub is_part: bool,
    pub manufacturing_type: ManufacturingType,
    pub procurement_type: ProcurementType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalPriority {
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalReason {
    ElectronicControl,
    CoreFunctionality,
    Structural,
    ExternalDependency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriticalComponent {
    pub item_index: usize,
    pub id: String,
    pub name: String,
    pub reason: CriticalReason,
    pub priority: CriticalPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BomStatistics {
    pub total_items: usize,
    pub assemblies: usize,
    pub parts: usize,
    pub max_depth: usize,
    pub by_manufacturing_type: BTreeMap<ManufacturingType, usize>,
    pub by_procurement_type: BTreeMap<ProcurementType, usize>,
}

/// Analyzer output. Index maps hold positions into `items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BomAnalysis {
    pub items: Vec<FlattenedBomItem>,
    pub by_category: BTreeMap<String, Vec<usize>>,
    pub by_type: BTreeMap<AssemblyType, Vec<usize>>,
    pub by_assembly_id: BTreeMap<String, Vec<usize>>,
    pub critical_components: Vec<CriticalComponent>,
    pub statistics: BomStatistics,
}

impl BomAnalysis {
    /// Edge quantity multiplied along the ancestor chain, saturating at
    /// `u64::MAX`.
    pub fn total_quantity(&self, index: usize) -> u64 {
        let mut total = 1u64;
        let mut cursor = Some(index);

        while let Some(i) = cursor {
            match self.items.get(i) {
                Some(item) => {
                    total = total.saturating_mul(u64::from(item.quantity));
                    cursor = item.parent_index;
                }
                None => break,
            }
        }

        total
    }
}
