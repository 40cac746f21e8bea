//! Expand: configuration into a wire JSON object
//!
//! Unset fields are omitted so the device leaves them untouched. Clear mode
//! emits every field as `null` or `[]` so the device resets the object.

use super::data::ResourceData;
use super::error::MapError;
use super::field::{BoolStyle, FieldDef, FieldType};
use super::transform::{join_quoted_names, select_shape, NameShape, Transform};
use super::value::{ConfigValue, Record};
use semver::Version;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandMode {
    /// Send what the caller set
    #[default]
    Apply,
    /// Reset every field to its default before removal
    Clear,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandContext<'a> {
    pub mode: ExpandMode,
    /// API version, needed by `quoted_name_list` fields
    pub version: Option<&'a Version>,
}

/// Expand the top-level configuration of `data`
pub fn expand(
    data: &ResourceData,
    table: &[FieldDef],
    ctx: &ExpandContext<'_>,
) -> Result<Map<String, Value>, MapError> {
    if ctx.mode == ExpandMode::Clear {
        return Ok(expand_clear(table));
    }

    let mut wire = Map::new();
    for field in table {
        if field.is_computed_only() {
            continue;
        }
        let key = field.wire_key().into_owned();

        if field.is_block() {
            match data.get(&field.name) {
                Some(ConfigValue::Block(items)) => {
                    wire.insert(key, expand_block(field, items, ctx.version, &field.name)?);
                }
                Some(other) => {
                    return Err(MapError::UnexpectedShape {
                        field: field.name.clone(),
                        expected: "block",
                        found: other.kind().to_string(),
                    });
                }
                // Cleared since the last apply: send an explicit empty list
                None if data.has_change(&field.name) => {
                    wire.insert(key, Value::Array(Vec::new()));
                }
                None => {}
            }
            continue;
        }

        let value = data.get(&field.name).or(field.default.as_ref());
        if let Some(value) = value {
            wire.insert(key, scalar_to_wire(field, value, &field.name)?);
        }
    }
    Ok(wire)
}

/// Expand one nested record; presence alone decides what is sent
pub fn expand_record(
    record: &Record,
    table: &[FieldDef],
    version: Option<&Version>,
    prefix: &str,
) -> Result<Map<String, Value>, MapError> {
    let mut wire = Map::new();
    for field in table {
        if field.is_computed_only() {
            continue;
        }
        let Some(value) = record.get(&field.name) else {
            continue;
        };
        let path = format!("{}.{}", prefix, field.name);
        let key = field.wire_key().into_owned();

        match (field.is_block(), value) {
            (true, ConfigValue::Block(items)) => {
                wire.insert(key, expand_block(field, items, version, &path)?);
            }
            (true, other) => {
                return Err(MapError::UnexpectedShape {
                    field: path,
                    expected: "block",
                    found: other.kind().to_string(),
                });
            }
            (false, value) => {
                wire.insert(key, scalar_to_wire(field, value, &path)?);
            }
        }
    }
    Ok(wire)
}

/// Every field of `table`: scalars as `null`, blocks as `[]`
pub fn expand_clear(table: &[FieldDef]) -> Map<String, Value> {
    table
        .iter()
        .map(|field| {
            let value = if field.is_block() {
                Value::Array(Vec::new())
            } else {
                Value::Null
            };
            (field.wire_key().into_owned(), value)
        })
        .collect()
}

fn expand_block(
    field: &FieldDef,
    items: &[Record],
    version: Option<&Version>,
    path: &str,
) -> Result<Value, MapError> {
    if let Some(Transform::QuotedNameList { rules }) = &field.transform {
        let key = field.name_subfield();
        let names: Vec<&str> = items
            .iter()
            .filter_map(|item| item.get(key).and_then(|v| v.as_str()))
            .collect();
        match select_shape(path, rules, version)? {
            NameShape::Single => {
                if names.len() > 1 {
                    return Err(MapError::invalid(
                        path,
                        format!("accepts a single name, got {}", names.len()),
                    ));
                }
                let name = names.first().copied().unwrap_or_default();
                return Ok(Value::String(name.to_string()));
            }
            NameShape::List => return Ok(Value::String(join_quoted_names(&names))),
            NameShape::Records => {}
        }
    }

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let item_path = format!("{}.{}", path, idx);
        out.push(Value::Object(expand_record(item, &field.fields, version, &item_path)?));
    }
    Ok(Value::Array(out))
}

/// Convert a configuration scalar to its wire form for `field`
pub fn scalar_to_wire(field: &FieldDef, value: &ConfigValue, path: &str) -> Result<Value, MapError> {
    match (field.field_type, value) {
        (FieldType::String, ConfigValue::String(s)) => Ok(Value::String(s.clone())),
        (FieldType::String, ConfigValue::Int(i)) => Ok(Value::String(i.to_string())),

        (FieldType::Int, ConfigValue::Int(i)) => Ok(Value::from(*i)),
        (FieldType::Int, ConfigValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| MapError::invalid(path, format!("{:?} is not an integer", s))),

        (FieldType::Float, ConfigValue::Float(f)) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| MapError::invalid(path, format!("{} is not a finite number", f))),
        (FieldType::Float, ConfigValue::Int(i)) => Ok(Value::from(*i)),

        (FieldType::Bool, ConfigValue::Bool(b)) => Ok(match field.bool_style {
            BoolStyle::EnableDisable => Value::String(if *b { "enable" } else { "disable" }.to_string()),
            BoolStyle::Json => Value::Bool(*b),
        }),

        (_, other) => {
            let expected = format!("{:?}", field.field_type).to_lowercase();
            Err(MapError::InvalidValue {
                field: path.to_string(),
                reason: format!("cannot send {} as {}", other.kind(), expected),
            })
        }
    }
}
