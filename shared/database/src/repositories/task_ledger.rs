//! Task Ledger
//!
//! Registry of generated tasks keyed by `(orderId, buildNumber, taskId)`.
//! Registering the same key twice never creates a duplicate, so regenerating
//! tasks for an unchanged configuration is a no-op.
//!
//! Task ids come from per-prefix counters, so after a configuration edit the
//! same key can name a different task (`ACC_1` moving from the air gun to the
//! water gun). The stored payload is then replaced by the regenerated one.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use tracing::debug;

use torvan_models::{ProductionTask, TestingTask};
use torvan_utils::{BuildTaskPlan, PlanningError, PlanningResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Production,
    Testing,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "PRODUCTION",
            Self::Testing => "TESTING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRODUCTION" => Some(Self::Production),
            "TESTING" => Some(Self::Testing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub order_id: String,
    pub build_number: String,
    pub task_id: String,
    pub kind: TaskKind,
    pub payload: serde_json::Value,
}

impl TaskRecord {
    pub fn production(order_id: &str, build_number: &str, task: &ProductionTask) -> PlanningResult<Self> {
        Ok(Self {
            order_id: order_id.to_string(),
            build_number: build_number.to_string(),
            task_id: task.task_id.clone(),
            kind: TaskKind::Production,
            payload: serde_json::to_value(task)?,
        })
    }

    pub fn testing(order_id: &str, build_number: &str, task: &TestingTask) -> PlanningResult<Self> {
        Ok(Self {
            order_id: order_id.to_string(),
            build_number: build_number.to_string(),
            task_id: task.task_id.clone(),
            kind: TaskKind::Testing,
            payload: serde_json::to_value(task)?,
        })
    }

    /// Production tasks first, then testing tasks, each in emission order.
    pub fn from_plan(order_id: &str, plan: &BuildTaskPlan) -> PlanningResult<Vec<Self>> {
        let production = plan
            .production
            .iter()
            .map(|task| Self::production(order_id, &plan.build_number, task));
        let testing = plan
            .testing
            .iter()
            .map(|task| Self::testing(order_id, &plan.build_number, task));

        production.chain(testing).collect()
    }

    fn key(&self) -> (String, String, String) {
        (
            self.order_id.clone(),
            self.build_number.clone(),
            self.task_id.clone(),
        )
    }
}

#[async_trait]
pub trait TaskLedger: Send + Sync {
    /// Insert records whose key is not yet present and replace the payload
    /// of existing keys whose payload changed. Returns how many were newly
    /// created.
    async fn register(&self, records: &[TaskRecord]) -> PlanningResult<usize>;

    /// All records of an order in registration order.
    async fn list(&self, order_id: &str) -> PlanningResult<Vec<TaskRecord>>;
}

#[derive(Default)]
struct LedgerState {
    positions: HashMap<(String, String, String), usize>,
    records: Vec<TaskRecord>,
}

#[derive(Default)]
pub struct MemoryTaskLedger {
    state: RwLock<LedgerState>,
}

impl MemoryTaskLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskLedger for MemoryTaskLedger {
    async fn register(&self, records: &[TaskRecord]) -> PlanningResult<usize> {
        let mut state = self.state.write().await;
        let mut created = 0;
        let mut refreshed = 0;

        for record in records {
            match state.positions.get(&record.key()).copied() {
                Some(index) => {
                    let stored = &mut state.records[index];
                    if stored.payload != record.payload || stored.kind != record.kind {
                        stored.kind = record.kind;
                        stored.payload = record.payload.clone();
                        refreshed += 1;
                    }
                }
                None => {
                    let index = state.records.len();
                    state.positions.insert(record.key(), index);
                    state.records.push(record.clone());
                    created += 1;
                }
            }
        }

        debug!(submitted = records.len(), created, refreshed, "Tasks registered");
        Ok(created)
    }

    async fn list(&self, order_id: &str) -> PlanningResult<Vec<TaskRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL ledger over `production_tasks`
pub struct PgTaskLedger {
    pool: PgPool,
}

impl PgTaskLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskLedger for PgTaskLedger {
    async fn register(&self, records: &[TaskRecord]) -> PlanningResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;
        let mut refreshed = 0usize;

        for record in records {
            // No row comes back for an unchanged existing task; `xmax = 0`
            // tells a fresh insert apart from an updated row.
            let inserted: Option<bool> = sqlx::query_scalar(
                r#"
                INSERT INTO production_tasks (order_id, build_number, task_id, kind, payload)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (order_id, build_number, task_id) DO UPDATE
                SET kind = EXCLUDED.kind, payload = EXCLUDED.payload
                WHERE production_tasks.kind IS DISTINCT FROM EXCLUDED.kind
                   OR production_tasks.payload IS DISTINCT FROM EXCLUDED.payload
                RETURNING (xmax = 0)
                "#,
            )
            .bind(&record.order_id)
            .bind(&record.build_number)
            .bind(&record.task_id)
            .bind(record.kind.as_str())
            .bind(&record.payload)
            .fetch_optional(&mut *tx)
            .await?;

            match inserted {
                Some(true) => created += 1,
                Some(false) => refreshed += 1,
                None => {}
            }
        }

        tx.commit().await?;

        debug!(submitted = records.len(), created, refreshed, "Tasks registered");
        Ok(created)
    }

    async fn list(&self, order_id: &str) -> PlanningResult<Vec<TaskRecord>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT order_id, build_number, task_id, kind, payload
            FROM production_tasks
            WHERE order_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    order_id: String,
    build_number: String,
    task_id: String,
    kind: String,
    payload: serde_json::Value,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = PlanningError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let kind = TaskKind::from_str(&row.kind).ok_or_else(|| {
            PlanningError::database(format!("Unknown task kind '{}' for {}", row.kind, row.task_id))
        })?;

        Ok(Self {
            order_id: row.order_id,
            build_number: row.build_number,
            task_id: row.task_id,
            kind,
            payload: row.payload,
        })
    }
}
