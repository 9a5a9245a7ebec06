//! Build configuration models.
//!
//! A `BuildConfiguration` is the canonical, per-build-number description of one
//! configured sink. It is produced by the normalizer from raw order rows and is
//! treated as immutable input by every downstream compiler stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use validator::Validate;

/// Canonical configuration for a single physical unit within an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    pub build_number: String,
    pub sink_model_id: String,
    pub dimensions: SinkDimensions,
    pub legs_type_id: Option<String>,
    pub feet_type_id: Option<String>,
    pub pegboard: PegboardSpec,
    pub basins: Vec<BasinConfiguration>,
    pub faucets: Vec<FaucetSelection>,
    pub sprayers: Vec<SprayerSelection>,
    pub accessories: AccessoryFlags,
    pub accessory_items: Vec<AccessoryItem>,
    pub control_box_id: Option<String>,
}

/// Sink body dimensions in inches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SinkDimensions {
    pub width: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PegboardSpec {
    pub enabled: bool,
    pub pegboard_type: Option<PegboardType>,
    pub size_basis: PegboardSizeBasis,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PegboardType {
    Perforated,
    Solid,
}

impl PegboardType {
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        if upper.contains("PERF") {
            Some(Self::Perforated)
        } else if upper.contains("SOLID") {
            Some(Self::Solid)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Perforated => "PERF",
            Self::Solid => "SOLID",
        }
    }
}

/// How the pegboard size is chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "basis", content = "size")]
pub enum PegboardSizeBasis {
    /// Derived from the sink length.
    #[default]
    SameAsSink,
    /// Explicit size code picked on the order, e.g. `"7236"`.
    Custom(String),
}

/// One basin slot, ordered left to right. Basin numbers are 1-indexed positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BasinConfiguration {
    pub basin_type: BasinType,
    pub size_code: Option<String>,
    pub addons: BTreeSet<String>,
}

impl BasinConfiguration {
    pub fn has_basin_light(&self) -> bool {
        self.addons
            .iter()
            .any(|addon| addon.to_uppercase().contains("BASIN-LIGHT"))
    }
}

/// Basin type. A basin carries exactly one type; values outside the known
/// set are preserved verbatim so that later stages can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BasinType {
    EDrain,
    ESink,
    ESinkDi,
    Unrecognized(String),
}

impl BasinType {
    /// Lenient parse: `E-Drain`, `E_DRAIN` and `edrain` are the same type.
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();

        match key.as_str() {
            "EDRAIN" => Self::EDrain,
            "ESINK" => Self::ESink,
            "ESINKDI" => Self::ESinkDi,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::EDrain => "E-Drain",
            Self::ESink => "E-Sink",
            Self::ESinkDi => "E-Sink-DI",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// E-Sink and E-Sink-DI share the mixing-valve / touchscreen build.
    pub fn is_e_sink_family(&self) -> bool {
        matches!(self, Self::ESink | Self::ESinkDi)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for BasinType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<BasinType> for String {
    fn from(value: BasinType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BasinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FaucetSelection {
    #[validate(length(min = 1, message = "Faucet type id must not be empty"))]
    pub faucet_type_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Faucet quantity must be between 1 and 100"))]
    pub quantity: u32,
    pub placement: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SprayerSelection {
    #[validate(length(min = 1, message = "Sprayer type id must not be empty"))]
    pub sprayer_type_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Sprayer quantity must be between 1 and 100"))]
    pub quantity: u32,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessoryFlags {
    pub air_gun: bool,
    pub water_gun: bool,
    pub di_faucet: bool,
    pub combo_faucet: bool,
    pub dosing_pump: bool,
    pub led_lighting: bool,
}

/// Catalog-backed accessory picked on the order (goes straight into the BOM).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryItem {
    #[validate(length(min = 1, message = "Accessory assembly id must not be empty"))]
    pub assembly_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Accessory quantity must be between 1 and 100"))]
    pub quantity: u32,
}

pub(crate) fn default_quantity() -> u32 {
    1
}

impl BuildConfiguration {
    pub fn has_basin_of(&self, predicate: impl Fn(&BasinType) -> bool) -> bool {
        self.basins.iter().any(|b| predicate(&b.basin_type))
    }

    pub fn e_drain_count(&self) -> usize {
        self.basins
            .iter()
            .filter(|b| b.basin_type == BasinType::EDrain)
            .count()
    }

    pub fn e_sink_count(&self) -> usize {
        self.basins
            .iter()
            .filter(|b| b.basin_type.is_e_sink_family())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basin_type_lenient_parse() {
        assert_eq!(BasinType::parse("E-Drain"), BasinType::EDrain);
        assert_eq!(BasinType::parse("E_DRAIN"), BasinType::EDrain);
        assert_eq!(BasinType::parse("e-sink"), BasinType::ESink);
        assert_eq!(BasinType::parse("E-Sink-DI"), BasinType::ESinkDi);
        assert_eq!(
            BasinType::parse("Standard"),
            BasinType::Unrecognized("Standard".to_string())
        );
    }

    #[test]
    fn test_basin_type_serializes_as_string() {
        let json = serde_json::to_string(&BasinType::ESinkDi).unwrap();
        assert_eq!(json, "\"E-Sink-DI\"");

        let parsed: BasinType = serde_json::from_str("\"MYSTERY\"").unwrap();
        assert!(!parsed.is_recognized());
        assert_eq!(parsed.as_str(), "MYSTERY");
    }

    #[test]
    fn test_basin_light_addon_detection() {
        let basin = BasinConfiguration {
            basin_type: BasinType::EDrain,
            size_code: None,
            addons: ["T2-OA-BASIN-LIGHT-EDR-KIT".to_string()].into_iter().collect(),
        };
        assert!(basin.has_basin_light());
    }
}
