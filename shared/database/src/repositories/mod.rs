//! Repository module for order persistence
//!
//! Snapshot storage, the task ledger and the workflow facade, each with an
//! in-memory and a PostgreSQL implementation.

pub mod snapshot;
pub mod task_ledger;
pub mod workflow;

pub use snapshot::{MemorySnapshotStore, PgSnapshotStore, SnapshotStore, SnapshotUpdate};
pub use task_ledger::{MemoryTaskLedger, PgTaskLedger, TaskKind, TaskLedger, TaskRecord};
pub use workflow::{CompiledSections, ReconcileFn, WorkflowSnapshots};
