use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    // One JSONB document per order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_snapshots (
            order_id TEXT PRIMARY KEY,
            revision BIGINT NOT NULL,
            snapshot JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Task ledger, keyed for idempotent registration
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS production_tasks (
            seq BIGSERIAL,
            order_id TEXT NOT NULL,
            build_number TEXT NOT NULL,
            task_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (order_id, build_number, task_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_production_tasks_order ON production_tasks (order_id, seq)",
    )
    .execute(pool)
    .await?;

    tracing::info!("PostgreSQL migrations completed");
    Ok(())
}
