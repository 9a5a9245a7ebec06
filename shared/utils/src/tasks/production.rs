//! Production task rules, in assembly order.

use torvan_models::{BasinType, BuildConfiguration, ProductionTask, TaskCategory};
use tracing::warn;

use super::{always, RuleContext, TaskRule};
use crate::bom::control_box_line;

const ELECTRICAL: &str = "ELEC";
const MECHANICAL: &str = "MECH";
const PLUMBING: &str = "PLUMB";
const LIGHTING: &str = "LIGHT";
const LABELING: &str = "LABEL";
const ACCESSORY: &str = "ACC";
const FINISHING: &str = "FINISH";

struct Step {
    category: TaskCategory,
    title: &'static str,
    description: &'static str,
    minutes: u32,
    /// Step touches the water supply and gets DI wording on E-Sink-DI basins.
    water_supply: bool,
}

const E_DRAIN_STEPS: [Step; 4] = [
    Step {
        category: TaskCategory::Plumbing,
        title: "Install bottom-fill valve and faucet",
        description: "Mount the bottom-fill valve and faucet on the basin and tighten the supply fittings.",
        minutes: 30,
        water_supply: true,
    },
    Step {
        category: TaskCategory::Plumbing,
        title: "Assemble bottom-fill plumbing",
        description: "Connect the bottom-fill assembly between the valve and the basin inlet.",
        minutes: 25,
        water_supply: true,
    },
    Step {
        category: TaskCategory::Labeling,
        title: "Label drain and fill pipes",
        description: "Apply flow-direction labels to the drain and bottom-fill pipes.",
        minutes: 10,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Electrical,
        title: "Install overflow sensor",
        description: "Mount the overflow sensor at the basin overflow and route its cable to the control box.",
        minutes: 15,
        water_supply: false,
    },
];

const E_SINK_STEPS: [Step; 8] = [
    Step {
        category: TaskCategory::Plumbing,
        title: "Mount mixing valve plate",
        description: "Fix the mixing valve plate under the basin.",
        minutes: 30,
        water_supply: true,
    },
    Step {
        category: TaskCategory::Plumbing,
        title: "Connect mixing valve hot and cold supply",
        description: "Connect the hot and cold supply lines to the mixing valve.",
        minutes: 25,
        water_supply: true,
    },
    Step {
        category: TaskCategory::Electrical,
        title: "Install emergency stop button",
        description: "Mount the emergency stop button and wire it to the control box.",
        minutes: 15,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Mechanical,
        title: "Mount touchscreen",
        description: "Install the touchscreen bracket and fix the touchscreen.",
        minutes: 20,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Electrical,
        title: "Wire touchscreen to control box",
        description: "Route and connect the touchscreen cable to the control box.",
        minutes: 25,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Electrical,
        title: "Install overflow sensor",
        description: "Mount the overflow sensor at the basin overflow and route its cable to the control box.",
        minutes: 15,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Plumbing,
        title: "Install dosing port",
        description: "Fit the dosing port on the basin and seal it.",
        minutes: 15,
        water_supply: false,
    },
    Step {
        category: TaskCategory::Electrical,
        title: "Install temperature sensor cable gland",
        description: "Fit the cable gland for the temperature sensor and pass the cable through.",
        minutes: 10,
        water_supply: false,
    },
];

pub fn rules() -> Vec<TaskRule<ProductionTask>> {
    vec![
        TaskRule { name: "lifter_control_button", applies: always, emit: lifter_control_button },
        TaskRule { name: "lifter_controller", applies: always, emit: lifter_controller },
        TaskRule { name: "logo", applies: always, emit: logo },
        TaskRule { name: "power_bar", applies: always, emit: power_bar },
        TaskRule { name: "pegboard_lighting", applies: pegboard_enabled, emit: pegboard_lighting },
        TaskRule { name: "faucets", applies: has_faucets, emit: faucets },
        TaskRule { name: "air_gun", applies: |c| c.accessories.air_gun, emit: air_gun },
        TaskRule { name: "water_gun", applies: |c| c.accessories.water_gun, emit: water_gun },
        TaskRule { name: "di_faucet", applies: |c| c.accessories.di_faucet, emit: di_faucet },
        TaskRule { name: "combo_faucet", applies: |c| c.accessories.combo_faucet, emit: combo_faucet },
        TaskRule { name: "basins", applies: has_basins, emit: basins },
        TaskRule { name: "control_box", applies: always, emit: control_box },
        TaskRule { name: "cable_labeling", applies: always, emit: cable_labeling },
        TaskRule { name: "cleaning", applies: always, emit: cleaning },
    ]
}

fn task(
    context: &mut RuleContext<'_>,
    prefix: &str,
    category: TaskCategory,
    title: &str,
    description: impl Into<String>,
    minutes: u32,
) -> ProductionTask {
    ProductionTask {
        task_id: context.ids.next_id(prefix),
        category,
        title: title.to_string(),
        description: description.into(),
        estimated_time: minutes,
        basin_number: None,
    }
}

fn pegboard_enabled(config: &BuildConfiguration) -> bool {
    config.pegboard.enabled
}

fn has_faucets(config: &BuildConfiguration) -> bool {
    !config.faucets.is_empty()
}

fn has_basins(config: &BuildConfiguration) -> bool {
    !config.basins.is_empty()
}

/// A control box is installed when one was selected and some basin needs it.
fn needs_control_box(config: &BuildConfiguration) -> bool {
    config.control_box_id.is_some() && config.has_basin_of(BasinType::is_recognized)
}

fn lifter_control_button(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ELECTRICAL,
        TaskCategory::Electrical,
        "Install lifter control button",
        "Mount the lifter up/down button on the front panel and connect it to the lifter controller.",
        15,
    )]
}

fn lifter_controller(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ELECTRICAL,
        TaskCategory::Electrical,
        "Install lifter controller",
        "Mount the lifter controller and connect both lifting columns.",
        30,
    )]
}

fn logo(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        MECHANICAL,
        TaskCategory::Mechanical,
        "Attach Torvan logo",
        "Attach the logo plate to the front of the sink body.",
        10,
    )]
}

fn power_bar(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ELECTRICAL,
        TaskCategory::Electrical,
        "Install power bar",
        "Mount the power bar under the sink body and connect the mains lead.",
        20,
    )]
}

fn pegboard_lighting(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![
        task(
            context,
            LIGHTING,
            TaskCategory::Lighting,
            "Install pegboard light strip",
            "Fix the LED light strip along the top of the pegboard.",
            25,
        ),
        task(
            context,
            LIGHTING,
            TaskCategory::Lighting,
            "Wire pegboard lighting",
            "Connect the pegboard light strip and switch to the power bar.",
            20,
        ),
    ]
}

fn faucets(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    let count = context
        .config
        .faucets
        .iter()
        .fold(0u32, |total, f| total.saturating_add(f.quantity));
    let description = format!("Install and connect {} faucet(s) to the water supply.", count);
    vec![task(
        context,
        PLUMBING,
        TaskCategory::Plumbing,
        "Install faucets",
        description,
        30,
    )]
}

fn air_gun(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ACCESSORY,
        TaskCategory::Accessory,
        "Install air gun",
        "Mount the air gun holder and connect the compressed air line.",
        20,
    )]
}

fn water_gun(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ACCESSORY,
        TaskCategory::Accessory,
        "Install water gun",
        "Mount the water gun holder and connect it to the water supply.",
        20,
    )]
}

fn di_faucet(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ACCESSORY,
        TaskCategory::Accessory,
        "Install DI faucet",
        "Mount the DI faucet and connect it to the DI water supply.",
        20,
    )]
}

fn combo_faucet(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        ACCESSORY,
        TaskCategory::Accessory,
        "Install combo faucet",
        "Mount the combination faucet and connect the hot and cold supply.",
        25,
    )]
}

/// Fixed step sequence per basin, tagged with the 1-indexed basin number.
fn basins(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    let config = context.config;
    let mut tasks = Vec::new();

    for (index, basin) in config.basins.iter().enumerate() {
        let number = index as u32 + 1;
        let steps: &[Step] = match &basin.basin_type {
            BasinType::EDrain => &E_DRAIN_STEPS,
            BasinType::ESink | BasinType::ESinkDi => &E_SINK_STEPS,
            BasinType::Unrecognized(raw) => {
                warn!(
                    build_number = %config.build_number,
                    basin_number = number,
                    basin_type = %raw,
                    "Unrecognized basin type, no basin tasks generated"
                );
                context.warnings.push(format!(
                    "Basin {} of build {} has unrecognized type '{}'; no basin tasks generated",
                    number, config.build_number, raw
                ));
                continue;
            }
        };

        let di = basin.basin_type == BasinType::ESinkDi;
        let prefix = format!("BASIN_{}", number);

        for step in steps {
            let description = if di && step.water_supply {
                format!("{} Use DI-rated fittings on the DI water supply.", step.description)
            } else {
                step.description.to_string()
            };

            let mut basin_task = task(
                context,
                &prefix,
                step.category,
                step.title,
                description,
                step.minutes,
            );
            basin_task.basin_number = Some(number);
            tasks.push(basin_task);
        }
    }

    tasks
}

/// Installs the control box the BOM carries. A box the BOM carries without
/// an install task (auto-selected, or selected without any basin) is
/// reported as a warning instead.
fn control_box(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    let config = context.config;
    let Some(bom_box) = control_box_line(config) else {
        return Vec::new();
    };
    if !needs_control_box(config) {
        warn!(
            build_number = %config.build_number,
            control_box = %bom_box,
            "BOM control box has no install task"
        );
        context.warnings.push(format!(
            "BOM for build {} includes control box {} but no control box was selected for installation; no install task generated",
            config.build_number, bom_box
        ));
        return Vec::new();
    }

    let mut triggered: Vec<&str> = Vec::new();
    for basin in config.basins.iter().filter(|b| b.basin_type.is_recognized()) {
        if !triggered.contains(&basin.basin_type.as_str()) {
            triggered.push(basin.basin_type.as_str());
        }
    }

    let description = format!(
        "Install control box {} and connect the {} basin wiring.",
        bom_box,
        triggered.join(" and ")
    );

    vec![task(
        context,
        ELECTRICAL,
        TaskCategory::Electrical,
        "Install control box",
        description,
        45,
    )]
}

fn cable_labeling(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        LABELING,
        TaskCategory::Labeling,
        "Label cables",
        "Label every cable at both ends according to the wiring diagram.",
        15,
    )]
}

fn cleaning(context: &mut RuleContext<'_>) -> Vec<ProductionTask> {
    vec![task(
        context,
        FINISHING,
        TaskCategory::Finishing,
        "Clean sink",
        "Remove protective film and clean all stainless steel surfaces.",
        30,
    )]
}
