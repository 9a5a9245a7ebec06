//! Generated production and testing tasks.
//!
//! Tasks are derived artifacts: they are regenerated from a build
//! configuration and keyed by `(orderId, buildNumber, taskId)` downstream.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Electrical,
    Mechanical,
    Plumbing,
    Lighting,
    Labeling,
    Accessory,
    Finishing,
    Calibration,
    Measurement,
    Functional,
    Setup,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Electrical => "electrical",
            Self::Mechanical => "mechanical",
            Self::Plumbing => "plumbing",
            Self::Lighting => "lighting",
            Self::Labeling => "labeling",
            Self::Accessory => "accessory",
            Self::Finishing => "finishing",
            Self::Calibration => "calibration",
            Self::Measurement => "measurement",
            Self::Functional => "functional",
            Self::Setup => "setup",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionTask {
    pub task_id: String,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    /// Minutes.
    pub estimated_time: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub basin_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    PassFail,
    Measurement,
    Calibration,
    Setup,
}

impl TestType {
    pub fn carries_tolerance(&self) -> bool {
        matches!(self, Self::Measurement | Self::Calibration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestingTask {
    pub task_id: String,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub estimated_time: u32,
    pub test_type: TestType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub basin_number: Option<u32>,
}

impl TestingTask {
    /// The acceptance band, if the task carries a complete and ordered one.
    pub fn tolerance(&self) -> Option<Tolerance> {
        match (&self.unit, self.min_value, self.max_value) {
            (Some(unit), Some(min), Some(max)) => Tolerance::new(unit.clone(), min, max).ok(),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToleranceError {
    #[error("Tolerance band is inverted: min {min} > max {max}")]
    Inverted { min: f64, max: f64 },

    #[error("Tolerance bound is not a finite number")]
    NotFinite,
}

/// Acceptance band for measurement and calibration tests. `min_value <= max_value`
/// holds for every constructed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tolerance {
    pub unit: String,
    pub min_value: f64,
    pub max_value: f64,
}

impl Tolerance {
    pub fn new(unit: impl Into<String>, min_value: f64, max_value: f64) -> Result<Self, ToleranceError> {
        if !min_value.is_finite() || !max_value.is_finite() {
            return Err(ToleranceError::NotFinite);
        }
        if min_value > max_value {
            return Err(ToleranceError::Inverted {
                min: min_value,
                max: max_value,
            });
        }

        Ok(Self {
            unit: unit.into(),
            min_value,
            max_value,
        })
    }

    /// Symmetric band `reference ± delta`.
    pub fn around(unit: impl Into<String>, reference: f64, delta: f64) -> Result<Self, ToleranceError> {
        let delta = delta.abs();
        Self::new(unit, reference - delta, reference + delta)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}
