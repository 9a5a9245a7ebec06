//! Raw order records as captured by the order-entry screens.
//!
//! Every per-build sub-record carries the `buildNumber` it belongs to. Sub-arrays
//! are optional on the wire; the normalizer treats an absent array as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::configuration::{AccessoryItem, FaucetSelection, SprayerSelection};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub order_id: String,
    pub po_number: Option<String>,
    pub customer_name: Option<String>,
    pub want_date: Option<DateTime<Utc>>,
    pub build_numbers: Vec<String>,
    pub sink_configurations: Option<Vec<SinkConfigurationRow>>,
    pub basin_configurations: Option<Vec<BasinConfigurationRow>>,
    pub faucet_configurations: Option<Vec<FaucetConfigurationRow>>,
    pub sprayer_configurations: Option<Vec<SprayerConfigurationRow>>,
    pub accessories: Option<Vec<AccessoryRow>>,
}

/// Sink body selection. Mandatory for every build number.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfigurationRow {
    #[validate(length(min = 1, message = "Build number must not be empty"))]
    pub build_number: String,
    #[validate(length(min = 1, max = 100, message = "Sink model id must be between 1 and 100 characters"))]
    pub sink_model_id: String,
    #[validate(range(min = 1, max = 240, message = "Sink width must be between 1 and 240 inches"))]
    pub width: u32,
    #[validate(range(min = 1, max = 240, message = "Sink length must be between 1 and 240 inches"))]
    pub length: u32,
    pub legs_type_id: Option<String>,
    pub feet_type_id: Option<String>,
    #[serde(default)]
    pub pegboard: bool,
    pub pegboard_type_id: Option<String>,
    pub pegboard_size: Option<String>,
    pub control_box_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasinConfigurationRow {
    pub build_number: String,
    #[serde(default)]
    pub basins: Vec<RawBasin>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBasin {
    pub basin_type: String,
    pub basin_size_part_number: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaucetConfigurationRow {
    pub build_number: String,
    #[serde(default)]
    pub faucets: Vec<FaucetSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SprayerConfigurationRow {
    pub build_number: String,
    #[serde(default)]
    pub sprayers: Vec<SprayerSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessoryRow {
    pub build_number: String,
    pub air_gun: bool,
    pub water_gun: bool,
    pub di_faucet: bool,
    pub combo_faucet: bool,
    pub dosing_pump: bool,
    pub led_lighting: bool,
    pub items: Vec<AccessoryItem>,
}

/// Rows keyed by build number.
pub trait BuildScoped {
    fn build_number(&self) -> &str;
}

macro_rules! impl_build_scoped {
    ($($ty:ty),*) => {
        $(impl BuildScoped for $ty {
            fn build_number(&self) -> &str {
                &self.build_number
            }
        })*
    };
}

impl_build_scoped!(
    SinkConfigurationRow,
    BasinConfigurationRow,
    FaucetConfigurationRow,
    SprayerConfigurationRow,
    AccessoryRow
);
