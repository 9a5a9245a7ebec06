//! Configuration Normalizer
//!
//! Turns a raw order record into one `BuildConfiguration` per declared build
//! number. Pure transform: nothing is read or written outside the inputs.

use std::collections::BTreeSet;

use torvan_models::{
    AccessoryFlags, BasinConfiguration, BasinType, BuildConfiguration, BuildScoped, OrderDetails,
    PegboardSizeBasis, PegboardSpec, PegboardType, RawBasin, RawOrder, SinkConfigurationRow,
    SinkDimensions,
};
use tracing::{debug, warn};

use crate::error::{PlanningError, PlanningResult};
use crate::validation::{dedupe_preserving_order, validate_build_number, validate_model};

/// Normalizer output
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrder {
    pub details: OrderDetails,
    /// One entry per distinct build number, in declaration order.
    pub builds: Vec<BuildConfiguration>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationNormalizer;

impl ConfigurationNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, order: &RawOrder) -> PlanningResult<NormalizedOrder> {
        if order.order_id.trim().is_empty() {
            return Err(PlanningError::validation("order_id", "Order id must not be empty"));
        }
        if order.build_numbers.is_empty() {
            return Err(PlanningError::validation(
                "build_numbers",
                format!("Order {} declares no build numbers", order.order_id),
            ));
        }

        let mut warnings = Vec::new();
        let (build_numbers, duplicates) = dedupe_preserving_order(&order.build_numbers);
        for duplicate in duplicates {
            warn!(order_id = %order.order_id, build_number = %duplicate, "Duplicate build number ignored");
            warnings.push(format!("Duplicate build number {} ignored", duplicate));
        }

        let builds = build_numbers
            .iter()
            .map(|build_number| self.normalize_build(order, build_number))
            .collect::<PlanningResult<Vec<_>>>()?;

        debug!(order_id = %order.order_id, builds = builds.len(), "Order normalized");

        Ok(NormalizedOrder {
            details: OrderDetails {
                order_id: order.order_id.clone(),
                po_number: order.po_number.clone(),
                customer_name: order.customer_name.clone(),
                want_date: order.want_date,
                build_numbers,
            },
            builds,
            warnings,
        })
    }

    fn normalize_build(&self, order: &RawOrder, build_number: &str) -> PlanningResult<BuildConfiguration> {
        validate_build_number(build_number)?;

        let sink = find_row(order.sink_configurations.as_deref(), build_number)
            .ok_or_else(|| PlanningError::configuration_incomplete(build_number))?;
        validate_model(sink)?;

        let basins = find_row(order.basin_configurations.as_deref(), build_number)
            .map(|row| row.basins.iter().map(basin_configuration).collect())
            .unwrap_or_default();
        let faucets: Vec<_> = find_row(order.faucet_configurations.as_deref(), build_number)
            .map(|row| row.faucets.clone())
            .unwrap_or_default();
        let sprayers: Vec<_> = find_row(order.sprayer_configurations.as_deref(), build_number)
            .map(|row| row.sprayers.clone())
            .unwrap_or_default();

        let accessory_row = find_row(order.accessories.as_deref(), build_number);
        let accessories = accessory_row
            .map(|row| AccessoryFlags {
                air_gun: row.air_gun,
                water_gun: row.water_gun,
                di_faucet: row.di_faucet,
                combo_faucet: row.combo_faucet,
                dosing_pump: row.dosing_pump,
                led_lighting: row.led_lighting,
            })
            .unwrap_or_default();
        let accessory_items: Vec<_> = accessory_row
            .map(|row| row.items.clone())
            .unwrap_or_default();

        for faucet in &faucets {
            validate_model(faucet)?;
        }
        for sprayer in &sprayers {
            validate_model(sprayer)?;
        }
        for item in &accessory_items {
            validate_model(item)?;
        }

        Ok(BuildConfiguration {
            build_number: build_number.to_string(),
            sink_model_id: sink.sink_model_id.clone(),
            dimensions: SinkDimensions {
                width: sink.width,
                length: sink.length,
            },
            legs_type_id: non_empty(&sink.legs_type_id),
            feet_type_id: non_empty(&sink.feet_type_id),
            pegboard: pegboard_spec(sink),
            basins,
            faucets,
            sprayers,
            accessories,
            accessory_items,
            control_box_id: non_empty(&sink.control_box_id),
        })
    }
}

/// First row whose build number matches; an absent array has no rows.
fn find_row<'a, T: BuildScoped>(rows: Option<&'a [T]>, build_number: &str) -> Option<&'a T> {
    rows.unwrap_or_default()
        .iter()
        .find(|row| row.build_number() == build_number)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn basin_configuration(raw: &RawBasin) -> BasinConfiguration {
    BasinConfiguration {
        basin_type: BasinType::parse(&raw.basin_type),
        size_code: non_empty(&raw.basin_size_part_number),
        addons: raw
            .addon_ids
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>(),
    }
}

fn pegboard_spec(sink: &SinkConfigurationRow) -> PegboardSpec {
    let size_basis = match non_empty(&sink.pegboard_size) {
        None => PegboardSizeBasis::SameAsSink,
        Some(size) => {
            let key = size.to_uppercase().replace(['-', ' '], "_");
            if key == "SAME_AS_SINK" {
                PegboardSizeBasis::SameAsSink
            } else {
                PegboardSizeBasis::Custom(size)
            }
        }
    };

    PegboardSpec {
        enabled: sink.pegboard,
        pegboard_type: sink.pegboard_type_id.as_deref().and_then(PegboardType::parse),
        size_basis,
    }
}
