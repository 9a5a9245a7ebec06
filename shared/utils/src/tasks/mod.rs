//! Task Rule Engine
//!
//! Production and testing tasks are produced by evaluating an ordered list
//! of `{predicate, emit}` rules against one build configuration. Rule order
//! is the assembly sequence and must not change. Task ids come from a
//! `TaskIdCounter` scoped to one generation run, so the same configuration
//! always yields the same ids.

pub mod production;
pub mod testing;

use std::collections::HashMap;

use torvan_models::{BuildConfiguration, ProductionTask, TestingTask};
use tracing::debug;

/// Per-prefix counters for `{PREFIX}_{n}` task ids
#[derive(Debug, Clone, Default)]
pub struct TaskIdCounter {
    counters: HashMap<String, u32>,
}

impl TaskIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{}_{}", prefix, counter)
    }
}

/// State threaded through one rule evaluation pass
pub struct RuleContext<'a> {
    pub config: &'a BuildConfiguration,
    pub ids: TaskIdCounter,
    pub warnings: Vec<String>,
}

impl<'a> RuleContext<'a> {
    pub fn new(config: &'a BuildConfiguration) -> Self {
        Self {
            config,
            ids: TaskIdCounter::new(),
            warnings: Vec::new(),
        }
    }
}

/// One rule record. `applies` is checked first; `emit` runs only when it
/// returns true.
pub struct TaskRule<T> {
    pub name: &'static str,
    pub applies: fn(&BuildConfiguration) -> bool,
    pub emit: fn(&mut RuleContext<'_>) -> Vec<T>,
}

pub(crate) fn always(_: &BuildConfiguration) -> bool {
    true
}

/// Evaluate `rules` in order against `config`.
pub fn evaluate<T>(rules: &[TaskRule<T>], context: &mut RuleContext<'_>) -> Vec<T> {
    let mut tasks = Vec::new();
    for rule in rules {
        if (rule.applies)(context.config) {
            let emitted = (rule.emit)(context);
            debug!(rule = rule.name, emitted = emitted.len(), "Task rule applied");
            tasks.extend(emitted);
        }
    }
    tasks
}

/// Generated tasks for one build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTaskPlan {
    pub build_number: String,
    pub production: Vec<ProductionTask>,
    pub testing: Vec<TestingTask>,
    pub warnings: Vec<String>,
}

impl BuildTaskPlan {
    /// Sum of production task estimates in minutes.
    pub fn estimated_minutes(&self) -> u32 {
        self.production.iter().map(|t| t.estimated_time).sum()
    }
}

pub struct TaskRuleEngine {
    production_rules: Vec<TaskRule<ProductionTask>>,
    testing_rules: Vec<TaskRule<TestingTask>>,
}

impl Default for TaskRuleEngine {
    fn default() -> Self {
        Self {
            production_rules: production::rules(),
            testing_rules: testing::rules(),
        }
    }
}

impl TaskRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, config: &BuildConfiguration) -> BuildTaskPlan {
        let mut production_context = RuleContext::new(config);
        let production = evaluate(&self.production_rules, &mut production_context);

        let mut testing_context = RuleContext::new(config);
        let testing = evaluate(&self.testing_rules, &mut testing_context);

        let mut warnings = production_context.warnings;
        warnings.extend(testing_context.warnings);

        debug!(
            build_number = %config.build_number,
            production = production.len(),
            testing = testing.len(),
            "Tasks generated"
        );

        BuildTaskPlan {
            build_number: config.build_number.clone(),
            production,
            testing,
            warnings,
        }
    }
}
