//! Testing task rules.
//!
//! Mirrors the production rules with pass/fail, calibration and measurement
//! checks. The mixing-point and in-basin temperature checks use different
//! bands because they measure at different locations.

use torvan_models::{
    BasinConfiguration, BasinType, TaskCategory, TestType, TestingTask, Tolerance, ToleranceError,
};
use tracing::{debug, warn};

use super::{always, RuleContext, TaskRule};

const TEST: &str = "TEST";
const CALIBRATION: &str = "CAL";
const MEASUREMENT: &str = "MEAS";
const SETUP: &str = "SETUP";

const CELSIUS: &str = "°C";
const LITERS: &str = "L";

/// Temperature reference for calibration and mixing checks.
const REFERENCE_TEMPERATURE: f64 = 40.0;
/// Flow-meter reference volume.
const REFERENCE_VOLUME: f64 = 40.0;

pub fn rules() -> Vec<TaskRule<TestingTask>> {
    vec![
        TaskRule { name: "station_setup", applies: always, emit: station_setup },
        TaskRule { name: "lifter_travel", applies: always, emit: lifter_travel },
        TaskRule { name: "power_and_labels", applies: always, emit: power_and_labels },
        TaskRule { name: "led_lighting", applies: |c| c.accessories.led_lighting, emit: led_lighting },
        TaskRule { name: "basins", applies: |c| !c.basins.is_empty(), emit: basins },
        TaskRule { name: "dosing_pump", applies: |c| c.accessories.dosing_pump, emit: dosing_pump },
        TaskRule { name: "final_inspection", applies: always, emit: final_inspection },
    ]
}

struct Check<'s> {
    prefix: &'s str,
    category: TaskCategory,
    test_type: TestType,
    title: String,
    description: String,
    minutes: u32,
}

impl<'s> Check<'s> {
    fn pass_fail(prefix: &'s str, category: TaskCategory, title: &str, description: &str, minutes: u32) -> Self {
        Self {
            prefix,
            category,
            test_type: TestType::PassFail,
            title: title.to_string(),
            description: description.to_string(),
            minutes,
        }
    }

    fn emit(self, context: &mut RuleContext<'_>, tolerance: Option<Tolerance>, basin: Option<u32>) -> TestingTask {
        let expected_result = match (&tolerance, self.test_type) {
            (Some(band), _) => Some(format!(
                "{} to {} {}",
                band.min_value, band.max_value, band.unit
            )),
            (None, TestType::PassFail) => Some("PASS".to_string()),
            (None, _) => None,
        };

        TestingTask {
            task_id: context.ids.next_id(self.prefix),
            category: self.category,
            title: self.title,
            description: self.description,
            estimated_time: self.minutes,
            test_type: self.test_type,
            expected_result,
            unit: tolerance.as_ref().map(|t| t.unit.clone()),
            min_value: tolerance.as_ref().map(|t| t.min_value),
            max_value: tolerance.as_ref().map(|t| t.max_value),
            basin_number: basin,
        }
    }
}

/// Unwraps a reference band. A rejected band drops the tolerance from the
/// check and is reported as a warning.
fn band(context: &mut RuleContext<'_>, band: Result<Tolerance, ToleranceError>) -> Option<Tolerance> {
    match band {
        Ok(band) => Some(band),
        Err(error) => {
            warn!(build_number = %context.config.build_number, error = %error, "Tolerance band rejected");
            context
                .warnings
                .push(format!("Tolerance band rejected: {}", error));
            None
        }
    }
}

fn station_setup(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    let check = Check {
        prefix: SETUP,
        category: TaskCategory::Setup,
        test_type: TestType::Setup,
        title: "Prepare test station".to_string(),
        description: "Connect water, drain and mains supply to the test station and record the serial number.".to_string(),
        minutes: 15,
    };
    vec![check.emit(context, None, None)]
}

fn lifter_travel(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    vec![Check::pass_fail(
        TEST,
        TaskCategory::Functional,
        "Lifter travel test",
        "Run the lifter through its full travel with the control button; movement must be smooth and stop at both limits.",
        10,
    )
    .emit(context, None, None)]
}

fn power_and_labels(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    vec![Check::pass_fail(
        TEST,
        TaskCategory::Functional,
        "Power bar and labeling verification",
        "Verify every power bar outlet is live and every cable label matches the wiring diagram.",
        10,
    )
    .emit(context, None, None)]
}

fn led_lighting(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    vec![Check::pass_fail(
        TEST,
        TaskCategory::Lighting,
        "LED lighting test",
        "Switch the LED lighting on and off; all segments must light evenly.",
        5,
    )
    .emit(context, None, None)]
}

fn dosing_pump(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    vec![Check::pass_fail(
        TEST,
        TaskCategory::Functional,
        "Dosing pump test",
        "Run a dosing cycle; detergent must reach the dosing port without leaks.",
        10,
    )
    .emit(context, None, None)]
}

fn final_inspection(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    vec![Check::pass_fail(
        TEST,
        TaskCategory::Functional,
        "Visual and cleanliness inspection",
        "Inspect all surfaces for scratches, residue and missing parts before packaging.",
        10,
    )
    .emit(context, None, None)]
}

fn basins(context: &mut RuleContext<'_>) -> Vec<TestingTask> {
    let config = context.config;
    let mut tasks = Vec::new();

    for (index, basin) in config.basins.iter().enumerate() {
        let number = index as u32 + 1;
        match &basin.basin_type {
            BasinType::EDrain => tasks.extend(e_drain_checks(context, number)),
            BasinType::ESink | BasinType::ESinkDi => tasks.extend(e_sink_checks(context, number)),
            BasinType::Unrecognized(raw) => {
                // Warned by the production rules already.
                debug!(basin_number = number, basin_type = %raw, "No basin tests for unrecognized type");
                continue;
            }
        }
        tasks.extend(basin_light_check(context, basin, number));
    }

    tasks
}

fn e_drain_checks(context: &mut RuleContext<'_>, number: u32) -> Vec<TestingTask> {
    let prefix = format!("BASIN_{}_TEST", number);
    let checks = [
        ("Bottom-fill valve test", "Open and close the bottom-fill valve; the basin must fill without leaks."),
        ("Overflow sensor activation", "Fill to the overflow level; the overflow alarm must activate."),
        ("Overflow sensor deactivation", "Drain below the overflow level; the overflow alarm must clear."),
        ("Drain valve test", "Open the drain valve; the basin must empty completely."),
    ];

    let mut tasks = Vec::with_capacity(checks.len());
    for (title, description) in checks {
        tasks.push(
            Check::pass_fail(&prefix, TaskCategory::Functional, title, description, 10)
                .emit(context, None, Some(number)),
        );
    }
    tasks
}

fn e_sink_checks(context: &mut RuleContext<'_>, number: u32) -> Vec<TestingTask> {
    let prefix = format!("BASIN_{}_TEST", number);
    let mut tasks = Vec::new();

    let calibration = |title: &str, description: &str| Check {
        prefix: CALIBRATION,
        category: TaskCategory::Calibration,
        test_type: TestType::Calibration,
        title: title.to_string(),
        description: description.to_string(),
        minutes: 20,
    };
    let measurement = |title: &str, description: &str| Check {
        prefix: MEASUREMENT,
        category: TaskCategory::Measurement,
        test_type: TestType::Measurement,
        title: title.to_string(),
        description: description.to_string(),
        minutes: 15,
    };

    let sensor = band(context, Tolerance::around(CELSIUS, REFERENCE_TEMPERATURE, 2.0));
    tasks.push(
        calibration(
            "Temperature sensor calibration",
            "Calibrate the temperature sensor against a reference thermometer at 40 °C.",
        )
        .emit(context, sensor, Some(number)),
    );
    let flow = band(context, Tolerance::around(LITERS, REFERENCE_VOLUME, 1.0));
    tasks.push(
        calibration(
            "Flow meter calibration",
            "Dispense 40 L through the flow meter into a calibrated container and compare.",
        )
        .emit(context, flow, Some(number)),
    );
    let mixing = band(context, Tolerance::new(CELSIUS, 36.0, 44.0));
    tasks.push(
        measurement(
            "Mixing point temperature at 40 °C",
            "Set 40 °C and measure the water temperature at the mixing valve outlet.",
        )
        .emit(context, mixing, Some(number)),
    );
    let in_basin = band(context, Tolerance::new(CELSIUS, 38.0, 42.0));
    tasks.push(
        measurement(
            "In-basin temperature at 40 °C",
            "Set 40 °C and measure the water temperature in the filled basin.",
        )
        .emit(context, in_basin, Some(number)),
    );

    let pass_fail = [
        ("Overflow sensor activation", "Fill to the overflow level; the overflow alarm must activate."),
        ("Overflow sensor deactivation", "Drain below the overflow level; the overflow alarm must clear."),
        ("Emergency stop test", "Press the emergency stop during filling; all valves must close immediately."),
        ("Touchscreen test", "Operate every touchscreen control; each must respond and show the correct state."),
    ];
    for (title, description) in pass_fail {
        tasks.push(
            Check::pass_fail(&prefix, TaskCategory::Functional, title, description, 10)
                .emit(context, None, Some(number)),
        );
    }

    tasks
}

fn basin_light_check(context: &mut RuleContext<'_>, basin: &BasinConfiguration, number: u32) -> Option<TestingTask> {
    if !basin.has_basin_light() {
        return None;
    }

    let prefix = format!("BASIN_{}_TEST", number);
    Some(
        Check::pass_fail(
            &prefix,
            TaskCategory::Lighting,
            "Basin light test",
            "Switch the basin light on and off; the light must illuminate the whole basin.",
            5,
        )
        .emit(context, None, Some(number)),
    )
}
