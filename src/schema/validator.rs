//! Submission gate.
//!
//! The default gate only checks that every required field is present as a
//! key. Strict mode additionally checks each supplied value against its
//! declared kind; it is opt-in so that the default gate never rejects input
//! the presence check accepts.

use serde_json::Value;

use super::field::{FieldKind, InputField};
use crate::error::ValidationError;
use crate::jobs::InputData;

/// How thoroughly submissions are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Required keys must be present.
    #[default]
    Presence,
    /// Presence, plus type, option membership and numeric bounds.
    Strict,
}

/// Check that every required field of `schema` is a key of `submission`.
pub fn validate(schema: &[InputField], submission: &InputData) -> Result<(), ValidationError> {
    match schema
        .iter()
        .find(|field| field.required && !submission.contains_key(&field.name))
    {
        Some(field) => Err(ValidationError::MissingRequiredField {
            name: field.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Presence check followed by per-value constraint checks. Null values are
/// treated as "not supplied" for the constraint pass.
pub fn validate_strict(
    schema: &[InputField],
    submission: &InputData,
) -> Result<(), ValidationError> {
    validate(schema, submission)?;

    for field in schema {
        match submission.get(&field.name) {
            None | Some(Value::Null) => continue,
            Some(value) => check_value(field, value)?,
        }
    }
    Ok(())
}

/// Run the gate for `mode`.
pub fn validate_with(
    mode: ValidationMode,
    schema: &[InputField],
    submission: &InputData,
) -> Result<(), ValidationError> {
    match mode {
        ValidationMode::Presence => validate(schema, submission),
        ValidationMode::Strict => validate_strict(schema, submission),
    }
}

fn check_value(field: &InputField, value: &Value) -> Result<(), ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        name: field.name.clone(),
        expected: field.kind.field_type().to_string(),
    };

    match &field.kind {
        FieldKind::String => value.is_string().then_some(()).ok_or_else(wrong_type),
        FieldKind::Boolean => value.is_boolean().then_some(()).ok_or_else(wrong_type),
        FieldKind::Number(bounds) => {
            let n = value.as_f64().ok_or_else(wrong_type)?;
            if bounds.contains(n) {
                Ok(())
            } else {
                let show = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |b| b.to_string());
                Err(ValidationError::OutOfRange {
                    name: field.name.clone(),
                    value: n,
                    min: show(bounds.min),
                    max: show(bounds.max),
                })
            }
        }
        FieldKind::Option(options) => {
            let choice = value.as_str().ok_or_else(wrong_type)?;
            if options.is_empty() || options.iter().any(|o| o == choice) {
                Ok(())
            } else {
                Err(ValidationError::NotAnOption {
                    name: field.name.clone(),
                    value: choice.to_string(),
                    allowed: options.join(", "),
                })
            }
        }
    }
}
