//! Field validators
//!
//! Stateless predicates declared on fields, plus a recursive walk that checks
//! a configuration record against its field table before it is sent.

use super::field::{FieldDef, FieldType, Mode};
use super::value::{ConfigValue, Record};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    /// Length in characters, inclusive
    StringLenBetween { min: usize, max: usize },
    IntBetween { min: i64, max: i64 },
    StringInSlice { values: Vec<String> },
}

impl Validator {
    pub fn string_len_between(min: usize, max: usize) -> Self {
        Self::StringLenBetween { min, max }
    }

    pub fn int_between(min: i64, max: i64) -> Self {
        Self::IntBetween { min, max }
    }

    pub fn string_in_slice(values: &[&str]) -> Self {
        Self::StringInSlice {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn check(&self, value: &ConfigValue) -> Result<(), String> {
        match (self, value) {
            (Validator::StringLenBetween { min, max }, ConfigValue::String(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    return Err(format!(
                        "expected length between {} and {}, got {}",
                        min, max, len
                    ));
                }
                Ok(())
            }
            (Validator::IntBetween { min, max }, ConfigValue::Int(i)) => {
                if i < min || i > max {
                    return Err(format!("expected value between {} and {}, got {}", min, max, i));
                }
                Ok(())
            }
            (Validator::StringInSlice { values }, ConfigValue::String(s)) => {
                if !values.iter().any(|v| v == s) {
                    return Err(format!("expected one of [{}], got {:?}", values.join(", "), s));
                }
                Ok(())
            }
            (Validator::StringLenBetween { .. }, other)
            | (Validator::StringInSlice { .. }, other) => {
                Err(format!("expected string, got {}", other.kind()))
            }
            (Validator::IntBetween { .. }, other) => {
                Err(format!("expected int, got {}", other.kind()))
            }
        }
    }
}

/// A single validation failure at a dotted path (`srcintf.0.name`)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

/// Check a configuration record against its field table.
///
/// Reports unknown keys, missing required fields, values supplied for
/// computed fields, type mismatches and validator failures.
pub fn validate(record: &Record, table: &[FieldDef]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_record(record, table, "", &mut errors);
    errors
}

fn validate_record(record: &Record, table: &[FieldDef], prefix: &str, errors: &mut Vec<ValidationError>) {
    for key in record.keys() {
        if !table.iter().any(|f| &f.name == key) {
            errors.push(ValidationError {
                path: join_path(prefix, key),
                message: "unknown field".to_string(),
            });
        }
    }

    for field in table {
        let path = join_path(prefix, &field.name);
        let Some(value) = record.get(&field.name) else {
            if field.mode == Mode::Required && field.default.is_none() {
                errors.push(ValidationError {
                    path,
                    message: "required field is not set".to_string(),
                });
            }
            continue;
        };

        if field.is_computed_only() {
            errors.push(ValidationError {
                path,
                message: "field is computed and cannot be set".to_string(),
            });
            continue;
        }

        if let Err(message) = check_type(field.field_type, value) {
            errors.push(ValidationError { path, message });
            continue;
        }

        if let ConfigValue::Block(items) = value {
            for (idx, item) in items.iter().enumerate() {
                validate_record(item, &field.fields, &format!("{}.{}", path, idx), errors);
            }
            continue;
        }

        if let Some(validator) = &field.validate {
            if let Err(message) = validator.check(value) {
                errors.push(ValidationError { path, message });
            }
        }
    }
}

fn check_type(field_type: FieldType, value: &ConfigValue) -> Result<(), String> {
    let ok = matches!(
        (field_type, value),
        (FieldType::String, ConfigValue::String(_))
            | (FieldType::Int, ConfigValue::Int(_))
            | (FieldType::Float, ConfigValue::Float(_) | ConfigValue::Int(_))
            | (FieldType::Bool, ConfigValue::Bool(_))
            | (FieldType::Block, ConfigValue::Block(_))
    );
    if ok {
        Ok(())
    } else {
        Err(format!("expected {:?}, got {}", field_type, value.kind()).to_lowercase())
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
