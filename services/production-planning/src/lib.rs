//! # Torvan Production Planning
//!
//! Compiles a captured sink order into its production plan: BOM, production
//! and testing tasks, procurement view and workflow state, persisted as one
//! order snapshot.

pub mod bom_source;
pub mod compiler;

pub use bom_source::{bom_source_from_config, BomSource, HttpBomService, LocalBomSource};
pub use compiler::{CompileOutcome, ProductionPlanCompiler, GENERATED_BY};
