//! BOM (Bill of Materials) Processing Module
//!
//! Catalog lookup, configuration-driven expansion into a BOM tree, and
//! analysis of the expanded tree.

pub mod analyzer;
pub mod catalog;
pub mod expander;

pub use analyzer::{manufacturing_type, AnalyzerRules, BomAnalyzer};
pub use catalog::{Catalog, CatalogDocument, InMemoryCatalog};
pub use expander::{control_box_line, derive_root_lines, flatten_lines, BomExpander, RootLine};
