//! Torvan Production Planner
//!
//! One-shot runner: compiles an order file and prints the resulting
//! snapshot as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use torvan_database::{
    initialize_database, MemorySnapshotStore, MemoryTaskLedger, PgSnapshotStore, PgTaskLedger,
    SnapshotStore, TaskLedger,
};
use torvan_models::RawOrder;
use torvan_production_planning::{bom_source_from_config, ProductionPlanCompiler};
use torvan_utils::{init_logging, AppConfig, Catalog, InMemoryCatalog};

const USAGE: &str = "usage: torvan-planner <order.json> [catalog.yaml|catalog.json]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;
    info!("Starting Torvan production planner");

    let mut args = std::env::args().skip(1);
    let order_path = args.next().context(USAGE)?;
    let catalog_path = args.next().or_else(|| config.catalog.path.clone());

    let content = std::fs::read_to_string(&order_path)
        .with_context(|| format!("Failed to read order file {}", order_path))?;
    let order: RawOrder = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse order file {}", order_path))?;

    let catalog: Arc<dyn Catalog> = match catalog_path {
        Some(path) => {
            let catalog = InMemoryCatalog::from_path(&path)?;
            info!(
                path = %path,
                assemblies = catalog.assembly_count(),
                parts = catalog.part_count(),
                "Catalog loaded"
            );
            Arc::new(catalog)
        }
        None => {
            warn!("No catalog configured; every catalog reference will be reported unresolved");
            Arc::new(InMemoryCatalog::new())
        }
    };
    let bom_source = bom_source_from_config(&config.bom_service, catalog)?;

    match initialize_database(&config.database).await? {
        Some(pool) => {
            let compiler = ProductionPlanCompiler::new(
                bom_source,
                PgSnapshotStore::new(pool.clone()),
                PgTaskLedger::new(pool),
                &config.planning,
            )?;
            run(&compiler, &order).await
        }
        None => {
            let compiler = ProductionPlanCompiler::new(
                bom_source,
                MemorySnapshotStore::new(),
                MemoryTaskLedger::new(),
                &config.planning,
            )?;
            run(&compiler, &order).await
        }
    }
}

async fn run<S: SnapshotStore, L: TaskLedger>(
    compiler: &ProductionPlanCompiler<S, L>,
    order: &RawOrder,
) -> Result<()> {
    let outcome = compiler.compile(order).await?;

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }
    info!(
        order_id = %order.order_id,
        revision = outcome.snapshot.metadata.revision,
        tasks_registered = outcome.tasks_registered,
        warnings = outcome.warnings.len(),
        "Order compiled"
    );

    println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
    Ok(())
}
