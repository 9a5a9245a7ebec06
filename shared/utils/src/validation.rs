use crate::error::{PlanningError, PlanningResult};
use regex::Regex;
use std::collections::HashSet;
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> PlanningResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(PlanningError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match (&error.message, error.code.as_ref()) {
                (Some(message), _) => format!("{}: {}", field, message),
                (None, "length") => format!("Length validation failed for field '{}'", field),
                (None, "range") => format!("Value out of range for field '{}'", field),
                (None, "required") => format!("Field '{}' is required", field),
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Build numbers are used in task ledger keys and file names.
pub fn validate_build_number(build_number: &str) -> PlanningResult<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$")
        .map_err(|e| PlanningError::internal(e.to_string()))?;

    if !pattern.is_match(build_number) {
        return Err(PlanningError::validation(
            "build_number",
            format!(
                "Invalid build number '{}'. Expected 1-64 characters of letters, digits, '.', '_' or '-'",
                build_number
            ),
        ));
    }

    Ok(())
}

/// Returns the input without duplicates (first occurrence kept) and the
/// values that were dropped.
pub fn dedupe_preserving_order(values: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(values.len());
    let mut duplicates = Vec::new();

    for value in values {
        if seen.insert(value.as_str()) {
            unique.push(value.clone());
        } else {
            duplicates.push(value.clone());
        }
    }

    (unique, duplicates)
}
