//! # Torvan Core Domain Models
//!
//! Domain types shared by the production-planning compiler and its
//! collaborators. Everything here is plain data with serde support; the
//! compiler stages that produce these values live in `torvan-utils`.
//!
//! ## Key Models
//!
//! - **BuildConfiguration**: canonical per-build configuration of one sink
//! - **CatalogAssembly / CatalogPart**: read-only catalog entries
//! - **BomNode / BomResult**: expanded BOM tree with its flattened twin
//! - **BomAnalysis**: classified, indexed BOM items and critical components
//! - **ProductionTask / TestingTask**: generated work and QC instructions
//! - **ProcurementItem**: merged BOM-derived and tracked procurement record
//! - **WorkflowState**: forward-only stage machine with write-once milestones
//! - **OrderSnapshot**: persisted artifact combining all of the above

pub mod bom;
pub mod catalog;
pub mod configuration;
pub mod order;
pub mod procurement;
pub mod snapshot;
pub mod task;
pub mod workflow;

#[cfg(test)]
pub mod property_tests;

pub use bom::*;
pub use catalog::*;
pub use configuration::*;
pub use order::*;
pub use procurement::*;
pub use snapshot::*;
pub use task::*;
pub use workflow::{merge_json, AdvanceOutcome, WorkflowStage, WorkflowState};
