//! BOM Expansion Engine
//!
//! Turns build configurations into root catalog lines and expands each root
//! depth-first against the catalog. Unknown ids are skipped with a warning;
//! a node that reappears on its own ancestor chain is a cycle and aborts
//! the expansion.

use std::collections::HashMap;

use torvan_models::{
    BasinType, BomLine, BomNode, BomResult, BomWarning, BomWarningKind,
    BuildConfiguration, CatalogAssembly, CatalogPart, PegboardSizeBasis, PegboardType,
    PART_CATEGORY,
};
use tracing::{debug, warn};

use super::catalog::Catalog;
use crate::error::{PlanningError, PlanningResult};

const PATH_SEPARATOR: &str = " > ";

/// Sink body kits by maximum sink length in inches.
const BODY_BY_LENGTH: [(u32, &str); 3] = [
    (60, "T2-BODY-48-60-HA"),
    (72, "T2-BODY-61-72-HA"),
    (120, "T2-BODY-73-120-HA"),
];

/// Top-level catalog line requested for a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLine {
    pub id: String,
    pub quantity: u32,
    /// Build that first requested this id.
    pub build_number: String,
}

/// Root lines for one build, aggregated by id in first-seen order.
pub fn derive_root_lines(config: &BuildConfiguration) -> (Vec<RootLine>, Vec<BomWarning>) {
    let mut lines = RootLines::default();
    let mut warnings = Vec::new();
    let build = config.build_number.as_str();

    let length = config.dimensions.length;
    match BODY_BY_LENGTH.iter().find(|(max, _)| length <= *max) {
        Some((_, body)) => lines.push(body, 1, build),
        None => {
            let message = format!(
                "Sink length {}\" exceeds the largest body kit; no body line added",
                length
            );
            warn!(build_number = %build, length, "{}", message);
            warnings.push(BomWarning {
                kind: BomWarningKind::SinkLengthOutOfRange,
                node_id: config.sink_model_id.clone(),
                parent_id: None,
                build_number: Some(build.to_string()),
                message,
            });
        }
    }

    if let Some(legs) = &config.legs_type_id {
        lines.push(legs, 1, build);
    }
    if let Some(feet) = &config.feet_type_id {
        lines.push(feet, 1, build);
    }

    if config.pegboard.enabled {
        let pegboard_type = config
            .pegboard
            .pegboard_type
            .unwrap_or(PegboardType::Perforated);
        lines.push(&format!("T2-ADW-PB-{}-KIT", pegboard_type.code()), 1, build);

        let size = match &config.pegboard.size_basis {
            PegboardSizeBasis::SameAsSink => ((length / 12) * 12).max(12).to_string(),
            PegboardSizeBasis::Custom(size) => size.clone(),
        };
        lines.push(&format!("T2-ADW-PB-{}", size), 1, build);
    }

    for (index, basin) in config.basins.iter().enumerate() {
        let kit = match &basin.basin_type {
            BasinType::EDrain => Some("T2-BSN-EDR-KIT"),
            BasinType::ESink => Some("T2-BSN-ESK-KIT"),
            BasinType::ESinkDi => Some("T2-BSN-ESK-DI-KIT"),
            BasinType::Unrecognized(raw) => {
                let message = format!(
                    "Basin {} has unrecognized type '{}'; no basin kit added",
                    index + 1,
                    raw
                );
                warn!(build_number = %build, basin_number = index + 1, "{}", message);
                warnings.push(BomWarning {
                    kind: BomWarningKind::UnrecognizedBasinType,
                    node_id: raw.clone(),
                    parent_id: None,
                    build_number: Some(build.to_string()),
                    message,
                });
                None
            }
        };

        if let Some(kit) = kit {
            lines.push(kit, 1, build);
        }
        if let Some(size_code) = &basin.size_code {
            lines.push(size_code, 1, build);
        }
        for addon in &basin.addons {
            lines.push(addon, 1, build);
        }
    }

    if let Some(control_box) = control_box_line(config) {
        lines.push(&control_box, 1, build);
    }

    for faucet in &config.faucets {
        lines.push(&faucet.faucet_type_id, faucet.quantity, build);
    }
    for sprayer in &config.sprayers {
        lines.push(&sprayer.sprayer_type_id, sprayer.quantity, build);
    }
    for item in &config.accessory_items {
        lines.push(&item.assembly_id, item.quantity, build);
    }

    (lines.into_vec(), warnings)
}

/// Configured control box, or one derived from the basin mix.
pub fn control_box_line(config: &BuildConfiguration) -> Option<String> {
    if let Some(id) = &config.control_box_id {
        return Some(id.clone());
    }

    match (config.e_drain_count(), config.e_sink_count()) {
        (0, 0) => None,
        (drains, 0) => Some(format!("T2-CTRL-EDR{}", drains)),
        (0, sinks) => Some(format!("T2-CTRL-ESK{}", sinks)),
        (drains, sinks) => Some(format!("T2-CTRL-EDR{}-ESK{}", drains, sinks)),
    }
}

#[derive(Default)]
struct RootLines {
    lines: Vec<RootLine>,
    positions: HashMap<String, usize>,
}

impl RootLines {
    fn push(&mut self, id: &str, quantity: u32, build_number: &str) {
        match self.positions.get(id) {
            Some(&index) => {
                self.lines[index].quantity = self.lines[index].quantity.saturating_add(quantity);
            }
            None => {
                self.positions.insert(id.to_string(), self.lines.len());
                self.lines.push(RootLine {
                    id: id.to_string(),
                    quantity,
                    build_number: build_number.to_string(),
                });
            }
        }
    }

    fn extend(&mut self, lines: Vec<RootLine>) {
        for line in lines {
            self.push(&line.id, line.quantity, &line.build_number);
        }
    }

    fn into_vec(self) -> Vec<RootLine> {
        self.lines
    }
}

enum Resolved<'c> {
    Assembly(&'c CatalogAssembly),
    Part(&'c CatalogPart),
}

/// Depth-first expander over a catalog
pub struct BomExpander<'c, C: Catalog + ?Sized> {
    catalog: &'c C,
}

impl<'c, C: Catalog + ?Sized> BomExpander<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        Self { catalog }
    }

    /// Expand every build of an order into one BOM. Identical root ids
    /// across builds are merged into one line with the summed quantity.
    pub fn expand_order(&self, configs: &[BuildConfiguration]) -> PlanningResult<BomResult> {
        let mut roots = RootLines::default();
        let mut warnings = Vec::new();

        for config in configs {
            let (lines, build_warnings) = derive_root_lines(config);
            roots.extend(lines);
            warnings.extend(build_warnings);
        }

        self.expand_roots(&roots.into_vec(), warnings)
    }

    pub fn expand_roots(
        &self,
        roots: &[RootLine],
        mut warnings: Vec<BomWarning>,
    ) -> PlanningResult<BomResult> {
        let mut hierarchical = Vec::with_capacity(roots.len());

        for root in roots {
            let mut ancestors = Vec::new();
            let node = self.expand_node(
                &root.id,
                root.quantity,
                None,
                &root.build_number,
                &mut ancestors,
                &mut warnings,
            )?;
            if let Some(node) = node {
                hierarchical.push(node);
            }
        }

        let flattened = flatten_lines(&hierarchical);
        debug!(
            roots = hierarchical.len(),
            total_items = flattened.len(),
            warnings = warnings.len(),
            "BOM expanded"
        );

        Ok(BomResult {
            total_items: flattened.len(),
            hierarchical,
            flattened,
            warnings,
        })
    }

    fn resolve(&self, id: &str) -> Option<Resolved<'c>> {
        self.catalog
            .get_assembly(id)
            .map(Resolved::Assembly)
            .or_else(|| self.catalog.get_part(id).map(Resolved::Part))
    }

    /// `ancestors` holds `(id, name)` of every node above `id` on the
    /// current path.
    fn expand_node(
        &self,
        id: &str,
        quantity: u32,
        parent_id: Option<&str>,
        build_number: &str,
        ancestors: &mut Vec<(String, String)>,
        warnings: &mut Vec<BomWarning>,
    ) -> PlanningResult<Option<BomNode>> {
        if ancestors.iter().any(|(ancestor, _)| ancestor == id) {
            let mut path: Vec<String> = ancestors.iter().map(|(a, _)| a.clone()).collect();
            path.push(id.to_string());
            return Err(PlanningError::bom_cycle(id, path));
        }

        let resolved = match self.resolve(id) {
            Some(resolved) => resolved,
            None => {
                warnings.push(unresolved_warning(id, parent_id, build_number));
                return Ok(None);
            }
        };

        let parent_path = ancestors
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);

        let assembly = match resolved {
            Resolved::Part(part) => {
                return Ok(Some(BomNode {
                    id: part.id.clone(),
                    name: part.name.clone(),
                    node_type: part.part_type,
                    category: PART_CATEGORY.to_string(),
                    quantity,
                    parent_path,
                    children: Vec::new(),
                }));
            }
            Resolved::Assembly(assembly) => assembly,
        };

        ancestors.push((assembly.id.clone(), assembly.name.clone()));
        let mut children = Vec::with_capacity(assembly.components.len());

        for edge in &assembly.components {
            let child_id = match edge.child_id() {
                Some(child_id) => child_id,
                None => {
                    warn!(parent_id = %assembly.id, "Component edge without child id skipped");
                    warnings.push(BomWarning {
                        kind: BomWarningKind::UnresolvedReference,
                        node_id: String::new(),
                        parent_id: Some(assembly.id.clone()),
                        build_number: Some(build_number.to_string()),
                        message: format!("Component of {} names no child id", assembly.id),
                    });
                    continue;
                }
            };

            let child = self.expand_node(
                child_id,
                edge.quantity,
                Some(&assembly.id),
                build_number,
                ancestors,
                warnings,
            );
            match child {
                Ok(Some(node)) => children.push(node),
                Ok(None) => {}
                Err(e) => {
                    ancestors.pop();
                    return Err(e);
                }
            }
        }

        ancestors.pop();

        Ok(Some(BomNode {
            id: assembly.id.clone(),
            name: assembly.name.clone(),
            node_type: assembly.assembly_type,
            category: assembly.category.clone(),
            quantity,
            parent_path,
            children,
        }))
    }
}

fn unresolved_warning(id: &str, parent_id: Option<&str>, build_number: &str) -> BomWarning {
    let (kind, message) = match parent_id {
        Some(parent) => (
            BomWarningKind::UnresolvedReference,
            format!("Catalog has no entry for {} (child of {}); skipped", id, parent),
        ),
        None => (
            BomWarningKind::UnresolvedRoot,
            format!("Catalog has no entry for root line {}; skipped", id),
        ),
    };

    warn!(node_id = %id, parent_id = ?parent_id, build_number = %build_number, "{}", message);

    BomWarning {
        kind,
        node_id: id.to_string(),
        parent_id: parent_id.map(str::to_string),
        build_number: Some(build_number.to_string()),
        message,
    }
}

/// Pre-order flattening of the tree into upstream-compatible lines.
pub fn flatten_lines(nodes: &[BomNode]) -> Vec<BomLine> {
    fn walk(node: &BomNode, level: usize, out: &mut Vec<BomLine>) {
        out.push(BomLine {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            category: node.category.clone(),
            quantity: node.quantity,
            level,
            parent_path: node.parent_path.clone(),
            has_children: !node.children.is_empty(),
        });
        for child in &node.children {
            walk(child, level + 1, out);
        }
    }

    let mut out = Vec::new();
    for node in nodes {
        walk(node, 0, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::catalog::InMemoryCatalog;
    use std::collections::BTreeSet;
    use torvan_models::{
        AccessoryFlags, AssemblyType, BasinConfiguration, ComponentEdge, PegboardSpec, SinkDimensions,
    };

    fn config(length: u32, basins: Vec<BasinType>) -> BuildConfiguration {
        BuildConfiguration {
            build_number: "B1".to_string(),
            sink_model_id: "T2-B1".to_string(),
            dimensions: SinkDimensions { width: 30, length },
            legs_type_id: Some("T2-DL27-KIT".to_string()),
            feet_type_id: Some("T2-LEVELING-CASTOR-475".to_string()),
            pegboard: PegboardSpec {
                enabled: true,
                pegboard_type: Some(PegboardType::Solid),
                size_basis: PegboardSizeBasis::SameAsSink,
            },
            basins: basins
                .into_iter()
                .map(|basin_type| BasinConfiguration {
                    basin_type,
                    size_code: None,
                    addons: BTreeSet::new(),
                })
                .collect(),
            faucets: Vec::new(),
            sprayers: Vec::new(),
            accessories: AccessoryFlags::default(),
            accessory_items: Vec::new(),
            control_box_id: None,
        }
    }

    fn assembly(id: &str, children: &[(&str, u32)]) -> CatalogAssembly {
        CatalogAssembly {
            id: id.to_string(),
            name: format!("{} name", id),
            assembly_type: AssemblyType::Simple,
            category: "TEST".to_string(),
            components: children
                .iter()
                .map(|(child, quantity)| ComponentEdge {
                    child_part_id: None,
                    child_assembly_id: Some(child.to_string()),
                    quantity: *quantity,
                    notes: None,
                })
                .collect(),
        }
    }

    fn part(id: &str) -> CatalogPart {
        CatalogPart {
            id: id.to_string(),
            name: format!("{} name", id),
            part_type: AssemblyType::Part,
            status: Some("ACTIVE".to_string()),
        }
    }

    fn root(id: &str) -> RootLine {
        RootLine {
            id: id.to_string(),
            quantity: 1,
            build_number: "B1".to_string(),
        }
    }

    #[test]
    fn test_root_lines_follow_build_order() {
        let (lines, warnings) =
            derive_root_lines(&config(60, vec![BasinType::EDrain, BasinType::ESink]));
        let ids: Vec<&str> = lines.iter().map(|l| l.id.as_str()).collect();

        assert!(warnings.is_empty());
        assert_eq!(
            ids,
            vec![
                "T2-BODY-48-60-HA",
                "T2-DL27-KIT",
                "T2-LEVELING-CASTOR-475",
                "T2-ADW-PB-SOLID-KIT",
                "T2-ADW-PB-60",
                "T2-BSN-EDR-KIT",
                "T2-BSN-ESK-KIT",
                "T2-CTRL-EDR1-ESK1",
            ]
        );
    }

    #[test]
    fn test_root_lines_aggregate_repeated_ids() {
        let (lines, _) = derive_root_lines(&config(72, vec![BasinType::EDrain, BasinType::EDrain]));
        let kit = lines.iter().find(|l| l.id == "T2-BSN-EDR-KIT").unwrap();

        assert_eq!(kit.quantity, 2);
        assert!(lines.iter().any(|l| l.id == "T2-BODY-61-72-HA"));
        assert!(lines.iter().any(|l| l.id == "T2-CTRL-EDR2"));
    }

    #[test]
    fn test_oversized_sink_records_warning() {
        let (lines, warnings) = derive_root_lines(&config(130, vec![]));

        assert!(!lines.iter().any(|l| l.id.starts_with("T2-BODY")));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, BomWarningKind::SinkLengthOutOfRange);
    }

    #[test]
    fn test_configured_control_box_wins() {
        let mut cfg = config(60, vec![BasinType::ESinkDi]);
        cfg.control_box_id = Some("T2-CTRL-CUSTOM".to_string());
        let (lines, _) = derive_root_lines(&cfg);

        assert!(lines.iter().any(|l| l.id == "T2-CTRL-CUSTOM"));
        assert!(!lines.iter().any(|l| l.id.starts_with("T2-CTRL-ESK")));
    }

    #[test]
    fn test_expansion_builds_parent_paths() {
        let catalog = InMemoryCatalog::new()
            .with_assembly(assembly("A", &[("B", 2)]))
            .with_assembly(assembly("B", &[("P", 4)]))
            .with_part(part("P"));
        let expander = BomExpander::new(&catalog);

        let result = expander.expand_roots(&[root("A")], Vec::new()).unwrap();

        assert_eq!(result.total_items, 3);
        let leaf = &result.hierarchical[0].children[0].children[0];
        assert_eq!(leaf.id, "P");
        assert_eq!(leaf.quantity, 4);
        assert_eq!(leaf.category, PART_CATEGORY);
        assert_eq!(leaf.parent_path, "A name > B name");
        assert_eq!(result.flattened[2].level, 2);
    }

    #[test]
    fn test_unresolved_child_is_skipped_with_warning() {
        let catalog = InMemoryCatalog::new().with_assembly(assembly("A", &[("GHOST", 1)]));
        let expander = BomExpander::new(&catalog);

        let result = expander
            .expand_roots(&[root("A"), root("MISSING-ROOT")], Vec::new())
            .unwrap();

        assert_eq!(result.hierarchical.len(), 1);
        assert!(result.hierarchical[0].children.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].kind, BomWarningKind::UnresolvedReference);
        assert_eq!(result.warnings[0].parent_id.as_deref(), Some("A"));
        assert_eq!(result.warnings[1].kind, BomWarningKind::UnresolvedRoot);
    }

    #[test]
    fn test_diamond_reuse_is_allowed() {
        let catalog = InMemoryCatalog::new()
            .with_assembly(assembly("TOP", &[("LEFT", 1), ("RIGHT", 1)]))
            .with_assembly(assembly("LEFT", &[("SHARED", 1)]))
            .with_assembly(assembly("RIGHT", &[("SHARED", 1)]))
            .with_part(part("SHARED"));
        let expander = BomExpander::new(&catalog);

        let result = expander.expand_roots(&[root("TOP")], Vec::new()).unwrap();
        let shared = result.flattened.iter().filter(|l| l.id == "SHARED").count();

        assert_eq!(shared, 2);
        assert_eq!(result.total_items, 5);
    }

    #[test]
    fn test_cycle_fails_with_repeated_node() {
        let catalog = InMemoryCatalog::new()
            .with_assembly(assembly("A", &[("B", 1)]))
            .with_assembly(assembly("B", &[("A", 1)]));
        let expander = BomExpander::new(&catalog);

        let error = expander.expand_roots(&[root("A")], Vec::new()).unwrap_err();
        assert_eq!(
            error,
            PlanningError::bom_cycle("A", vec!["A".into(), "B".into(), "A".into()])
        );
    }

    #[test]
    fn test_order_expansion_merges_builds() {
        let catalog = InMemoryCatalog::new().with_part(part("T2-DL27-KIT"));
        let expander = BomExpander::new(&catalog);
        let mut second = config(60, vec![]);
        second.build_number = "B2".to_string();

        let result = expander
            .expand_order(&[config(60, vec![]), second])
            .unwrap();
        let legs = result
            .hierarchical
            .iter()
            .find(|n| n.id == "T2-DL27-KIT")
            .unwrap();

        assert_eq!(legs.quantity, 2);
    }
}
