//! BOM Analyzer
//!
//! Flattens the expanded tree, classifies every node for manufacturing and
//! procurement, and flags critical components. Classification rules are
//! ordered and the first match wins.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use torvan_models::{
    AssemblyType, BomAnalysis, BomNode, BomStatistics, CriticalComponent, CriticalPriority,
    CriticalReason, FlattenedBomItem, ManufacturingType, ProcurementType, PART_CATEGORY,
};
use tracing::debug;

use crate::config::PlanningConfig;
use crate::error::{PlanningError, PlanningResult};

/// Compiled classification conventions
#[derive(Debug, Clone)]
pub struct AnalyzerRules {
    internal_prefixes: Vec<String>,
    electronic: Option<Regex>,
    core_function: Option<Regex>,
    structural: Option<Regex>,
}

impl AnalyzerRules {
    pub fn from_config(config: &PlanningConfig) -> PlanningResult<Self> {
        Ok(Self {
            internal_prefixes: config.internal_manufacture_prefixes.clone(),
            electronic: keyword_pattern(&config.electronic_keywords)?,
            core_function: keyword_pattern(&config.core_function_keywords)?,
            structural: keyword_pattern(&config.structural_keywords)?,
        })
    }
}

/// Case-insensitive alternation of literal keywords; `None` when empty.
fn keyword_pattern(keywords: &[String]) -> PlanningResult<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| regex::escape(k.trim()))
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| PlanningError::configuration(format!("Invalid keyword pattern: {}", e)))
}

/// BOM analyzer
pub struct BomAnalyzer {
    rules: AnalyzerRules,
}

impl BomAnalyzer {
    pub fn new(rules: AnalyzerRules) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &PlanningConfig) -> PlanningResult<Self> {
        Ok(Self::new(AnalyzerRules::from_config(config)?))
    }

    /// Analyze the hierarchical BOM
    pub fn analyze(&self, hierarchical: &[BomNode]) -> BomAnalysis {
        let mut items = Vec::new();
        for root in hierarchical {
            let mut path = Vec::new();
            self.flatten_node(root, None, &mut path, &mut items);
        }

        let mut by_category: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_type: BTreeMap<AssemblyType, Vec<usize>> = BTreeMap::new();
        let mut by_assembly_id: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (index, item) in items.iter().enumerate() {
            by_category.entry(item.category.clone()).or_default().push(index);
            by_type.entry(item.item_type).or_default().push(index);
            if item.is_assembly {
                by_assembly_id.entry(item.id.clone()).or_default().push(index);
            }
        }

        let critical_components = self.critical_components(&items);
        let statistics = statistics(&items);

        debug!(
            items = items.len(),
            critical = critical_components.len(),
            max_depth = statistics.max_depth,
            "BOM analyzed"
        );

        BomAnalysis {
            items,
            by_category,
            by_type,
            by_assembly_id,
            critical_components,
            statistics,
        }
    }

    /// Pre-order walk; `path` carries the ancestor names of `node`.
    fn flatten_node(
        &self,
        node: &BomNode,
        parent_index: Option<usize>,
        path: &mut Vec<String>,
        items: &mut Vec<FlattenedBomItem>,
    ) {
        let index = items.len();
        items.push(FlattenedBomItem {
            id: node.id.clone(),
            name: node.name.clone(),
            item_type: node.node_type,
            category: node.category.clone(),
            quantity: node.quantity,
            parent_path: path.clone(),
            parent_index,
            depth: path.len(),
            child_count: node.children.len(),
            is_assembly: !node.children.is_empty(),
            is_part: node.children.is_empty(),
            manufacturing_type: manufacturing_type(node),
            procurement_type: self.procurement_type(node),
        });

        path.push(node.name.clone());
        for child in &node.children {
            self.flatten_node(child, Some(index), path, items);
        }
        path.pop();
    }

    pub fn procurement_type(&self, node: &BomNode) -> ProcurementType {
        if node.node_type == AssemblyType::ServicePart {
            ProcurementType::ExternalPurchase
        } else if node.category == PART_CATEGORY {
            let internal = self
                .rules
                .internal_prefixes
                .iter()
                .any(|prefix| node.id.starts_with(prefix.as_str()));
            if internal {
                ProcurementType::InternalManufacture
            } else {
                ProcurementType::ExternalPurchase
            }
        } else {
            ProcurementType::Assembly
        }
    }

    /// Critical components, CRITICAL before HIGH, insertion order within a tier.
    fn critical_components(&self, items: &[FlattenedBomItem]) -> Vec<CriticalComponent> {
        let mut critical: Vec<CriticalComponent> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                self.critical_reason(item).map(|(reason, priority)| CriticalComponent {
                    item_index: index,
                    id: item.id.clone(),
                    name: item.name.clone(),
                    reason,
                    priority,
                })
            })
            .collect();

        // sort_by is stable
        critical.sort_by(|a, b| b.priority.cmp(&a.priority));
        critical
    }

    fn critical_reason(&self, item: &FlattenedBomItem) -> Option<(CriticalReason, CriticalPriority)> {
        let matches = |pattern: &Option<Regex>| {
            pattern.as_ref().map_or(false, |p| {
                p.is_match(&item.name) || p.is_match(&item.id) || p.is_match(&item.category)
            })
        };

        if matches(&self.rules.electronic) {
            Some((CriticalReason::ElectronicControl, CriticalPriority::Critical))
        } else if matches(&self.rules.core_function) {
            Some((CriticalReason::CoreFunctionality, CriticalPriority::High))
        } else if matches(&self.rules.structural) {
            Some((CriticalReason::Structural, CriticalPriority::High))
        } else if item.procurement_type == ProcurementType::ExternalPurchase {
            Some((CriticalReason::ExternalDependency, CriticalPriority::High))
        } else {
            None
        }
    }
}

pub fn manufacturing_type(node: &BomNode) -> ManufacturingType {
    match node.node_type {
        AssemblyType::Kit => ManufacturingType::AssemblyKit,
        AssemblyType::Complex => ManufacturingType::ComplexAssembly,
        AssemblyType::Simple => ManufacturingType::SimpleAssembly,
        _ if node.category == PART_CATEGORY => ManufacturingType::ManufacturedPart,
        AssemblyType::ServicePart => ManufacturingType::PurchasedPart,
        _ => ManufacturingType::Component,
    }
}

fn statistics(items: &[FlattenedBomItem]) -> BomStatistics {
    let mut stats = BomStatistics {
        total_items: items.len(),
        ..Default::default()
    };

    for item in items {
        if item.is_assembly {
            stats.assemblies += 1;
        } else {
            stats.parts += 1;
        }
        stats.max_depth = stats.max_depth.max(item.depth);
        *stats
            .by_manufacturing_type
            .entry(item.manufacturing_type)
            .or_insert(0) += 1;
        *stats
            .by_procurement_type
            .entry(item.procurement_type)
            .or_insert(0) += 1;
    }

    stats
}
