//! Flatten: wire JSON into a configuration record
//!
//! Malformed fields are reported and left unset; they never abort the walk.

use super::error::{json_kind, MapError};
use super::field::{find_field, FieldDef, FieldType};
use super::transform::{is_cidr, mask_to_cidr, select_shape, split_quoted_names, NameShape, Transform};
use super::value::{compare_values, ConfigValue, Record};
use semver::Version;
use serde_json::Value;

/// Inputs Flatten needs besides the wire tree
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenContext<'a> {
    /// Locally held record, consulted by sensitive and classnet fields
    pub prior: Option<&'a Record>,
    /// API version reported by the device
    pub version: Option<&'a Version>,
}

/// Flatten result with the field errors that were skipped over
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub record: Record,
    pub errors: Vec<MapError>,
}

/// Flatten `wire` according to `table`, logging field errors
pub fn flatten(wire: &Value, table: &[FieldDef], ctx: &FlattenContext<'_>) -> Record {
    let flattened = flatten_report(wire, table, ctx);
    for error in &flattened.errors {
        tracing::warn!("flatten: {}", error);
    }
    flattened.record
}

/// Flatten `wire`, returning field errors instead of logging them
pub fn flatten_report(wire: &Value, table: &[FieldDef], ctx: &FlattenContext<'_>) -> Flattened {
    let mut errors = Vec::new();
    let record = match wire {
        Value::Object(_) => flatten_record(wire, table, ctx.prior, ctx.version, "", &mut errors),
        other => {
            errors.push(MapError::shape("<root>", "object", other));
            Record::new()
        }
    };
    Flattened { record, errors }
}

fn flatten_record(
    wire: &Value,
    table: &[FieldDef],
    prior: Option<&Record>,
    version: Option<&Version>,
    prefix: &str,
    errors: &mut Vec<MapError>,
) -> Record {
    let mut record = Record::new();
    for field in table {
        let wire_key = field.wire_key();
        let Some(raw) = wire.get(&*wire_key) else {
            continue;
        };
        let local = prior.and_then(|p| p.get(&field.name));
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        match flatten_field(field, raw, local, version, &path, errors) {
            Ok(Some(value)) => {
                record.insert(field.name.clone(), value);
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    record
}

fn flatten_field(
    field: &FieldDef,
    raw: &Value,
    local: Option<&ConfigValue>,
    version: Option<&Version>,
    path: &str,
    errors: &mut Vec<MapError>,
) -> Result<Option<ConfigValue>, MapError> {
    if field.sensitive {
        if let Some(local) = local.filter(|v| !v.is_zero()) {
            return Ok(Some(local.clone()));
        }
    }

    if let Some(Transform::QuotedNameList { rules }) = &field.transform {
        if let Value::String(s) = raw {
            let shape = select_shape(path, rules, version)?;
            return Ok(flatten_names(field, s, shape));
        }
    }

    if field.is_block() {
        return flatten_block(field, raw, local, version, path, errors);
    }

    if raw.is_null() {
        return Ok(None);
    }
    let value = scalar_from_wire(field.field_type, raw, path)?;

    if let (Some(Transform::Ipv4Classnet), ConfigValue::String(s)) = (&field.transform, &value) {
        let local_is_cidr = local.and_then(|v| v.as_str()).is_some_and(is_cidr);
        if local_is_cidr {
            if let Some(cidr) = mask_to_cidr(s) {
                return Ok(Some(ConfigValue::String(cidr)));
            }
        }
    }

    Ok(Some(value))
}

fn flatten_block(
    field: &FieldDef,
    raw: &Value,
    local: Option<&ConfigValue>,
    version: Option<&Version>,
    path: &str,
    errors: &mut Vec<MapError>,
) -> Result<Option<ConfigValue>, MapError> {
    let items = match raw {
        Value::Null => return Ok(None),
        Value::Array(items) if items.is_empty() => return Ok(None),
        Value::Array(items) => items,
        other => return Err(MapError::shape(path, "array", other)),
    };

    let local_items = local.and_then(|v| v.as_block()).unwrap_or(&[]);
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let item_path = format!("{}.{}", path, idx);
        if !item.is_object() {
            errors.push(MapError::shape(&item_path, "object", item));
            continue;
        }
        records.push(flatten_record(
            item,
            &field.fields,
            match_local(field, item, local_items, idx),
            version,
            &item_path,
            errors,
        ));
    }

    if let Some(key) = &field.sort_by {
        records.sort_by(|a, b| compare_values(a.get(key), b.get(key)));
    }

    Ok(Some(ConfigValue::Block(records)))
}

/// Local record for a wire element. Elements are matched on the block's
/// `sort_by` key, else its first subfield; position is used only when
/// neither side carries that key.
fn match_local<'a>(
    field: &FieldDef,
    item: &Value,
    local_items: &'a [Record],
    idx: usize,
) -> Option<&'a Record> {
    let key = field.sort_by.as_deref().unwrap_or_else(|| field.name_subfield());
    let wire_value = find_field(&field.fields, key).and_then(|key_field| {
        let raw = item.get(&*key_field.wire_key())?;
        scalar_from_wire(key_field.field_type, raw, key).ok()
    });
    let local_has_key = local_items.iter().any(|r| r.contains_key(key));

    match wire_value {
        Some(wanted) if local_has_key => local_items.iter().find(|r| r.get(key) == Some(&wanted)),
        _ => local_items.get(idx),
    }
}

fn flatten_names(field: &FieldDef, raw: &str, shape: NameShape) -> Option<ConfigValue> {
    let names = match shape {
        NameShape::Single => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.trim_matches('"').to_string()]
            }
        }
        NameShape::List | NameShape::Records => split_quoted_names(raw),
    };
    if names.is_empty() {
        return None;
    }
    let key = field.name_subfield();
    let records = names
        .into_iter()
        .map(|name| {
            let mut record = Record::new();
            record.insert(key.to_string(), ConfigValue::String(name));
            record
        })
        .collect();
    Some(ConfigValue::Block(records))
}

/// Whole number inside the i64 range (`i64::MAX as f64` is 2^63, itself out of range)
fn fits_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Coerce a wire scalar to the declared type
pub fn scalar_from_wire(field_type: FieldType, raw: &Value, path: &str) -> Result<ConfigValue, MapError> {
    match (field_type, raw) {
        (FieldType::String, Value::String(s)) => Ok(ConfigValue::String(s.clone())),
        (FieldType::String, Value::Number(n)) => Ok(ConfigValue::String(n.to_string())),
        (FieldType::String, Value::Bool(b)) => Ok(ConfigValue::String(b.to_string())),

        (FieldType::Int, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| fits_i64(*f)).map(|f| f as i64))
            .map(ConfigValue::Int)
            .ok_or_else(|| MapError::invalid(path, format!("{} is not an integer", n))),
        (FieldType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(ConfigValue::Int)
            .map_err(|_| MapError::invalid(path, format!("{:?} is not an integer", s))),

        (FieldType::Float, Value::Number(n)) => n
            .as_f64()
            .map(ConfigValue::Float)
            .ok_or_else(|| MapError::invalid(path, format!("{} is not a number", n))),
        (FieldType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(ConfigValue::Float)
            .map_err(|_| MapError::invalid(path, format!("{:?} is not a number", s))),

        (FieldType::Bool, Value::Bool(b)) => Ok(ConfigValue::Bool(*b)),
        (FieldType::Bool, Value::String(s)) => match s.as_str() {
            "enable" | "true" => Ok(ConfigValue::Bool(true)),
            "disable" | "false" => Ok(ConfigValue::Bool(false)),
            _ => Err(MapError::invalid(path, format!("{:?} is not a bool", s))),
        },
        (FieldType::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(ConfigValue::Bool(false)),
            Some(1) => Ok(ConfigValue::Bool(true)),
            _ => Err(MapError::invalid(path, format!("{} is not a bool", n))),
        },

        (FieldType::Block, other) => Err(MapError::shape(path, "array", other)),
        (_, other) => Err(MapError::UnexpectedShape {
            field: path.to_string(),
            expected: "scalar",
            found: json_kind(other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::transform::VersionRule;
    use crate::schema::value::record;
    use semver::VersionReq;
    use serde_json::json;

    fn policy_table() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("policyid", FieldType::Int),
            FieldDef::scalar("name", FieldType::String),
            FieldDef::scalar("nat", FieldType::Bool),
            FieldDef::block("srcintf", vec![FieldDef::scalar("name", FieldType::String)]),
            FieldDef::block("dstaddr", vec![FieldDef::scalar("name", FieldType::String)]),
        ]
    }

    #[test]
    fn test_flatten_policy_example() {
        let wire = json!({"policyid": 7, "srcintf": [{"name": "wan1"}]});
        let rec = flatten(&wire, &policy_table(), &FlattenContext::default());

        let mut expected = record([("policyid", 7i64)]);
        expected.insert(
            "srcintf".into(),
            ConfigValue::Block(vec![record([("name", "wan1")])]),
        );
        assert_eq!(rec, expected);
    }

    #[test]
    fn test_null_and_empty_blocks_are_unset() {
        let table = policy_table();
        let rec = flatten(
            &json!({"srcintf": null, "dstaddr": []}),
            &table,
            &FlattenContext::default(),
        );
        assert!(rec.is_empty());
    }

    #[test]
    fn test_block_with_wrong_shape_is_reported_not_fatal() {
        let out = flatten_report(
            &json!({"policyid": "12", "srcintf": "wan1", "nat": "enable"}),
            &policy_table(),
            &FlattenContext::default(),
        );
        assert_eq!(out.record.get("policyid"), Some(&ConfigValue::Int(12)));
        assert_eq!(out.record.get("nat"), Some(&ConfigValue::Bool(true)));
        assert!(!out.record.contains_key("srcintf"));
        assert_eq!(
            out.errors,
            vec![MapError::UnexpectedShape {
                field: "srcintf".into(),
                expected: "array",
                found: "string".into()
            }]
        );
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let out = flatten_report(
            &json!({"srcintf": [{"name": "a"}, 3, {"name": "b"}]}),
            &policy_table(),
            &FlattenContext::default(),
        );
        let items = out.record["srcintf"].as_block().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].to_string().contains("srcintf.1"));
    }

    #[test]
    fn test_sensitive_prefers_local_value() {
        let table = vec![
            FieldDef::scalar("name", FieldType::String),
            FieldDef::scalar("passwd", FieldType::String).sensitive(),
        ];
        let wire = json!({"name": "bob", "passwd": "ENC XXXX"});

        let local = record([("passwd", "s3cret")]);
        let ctx = FlattenContext { prior: Some(&local), version: None };
        let rec = flatten(&wire, &table, &ctx);
        assert_eq!(rec["passwd"], ConfigValue::from("s3cret"));

        let empty_local = record([("passwd", "")]);
        let ctx = FlattenContext { prior: Some(&empty_local), version: None };
        let rec = flatten(&wire, &table, &ctx);
        assert_eq!(rec["passwd"], ConfigValue::from("ENC XXXX"));
    }

    #[test]
    fn test_classnet_follows_local_notation() {
        let table = vec![FieldDef::scalar("subnet", FieldType::String)
            .with_transform(Transform::Ipv4Classnet)];
        let wire = json!({"subnet": "10.1.0.0 255.255.0.0"});

        let local = record([("subnet", "10.1.0.0/16")]);
        let ctx = FlattenContext { prior: Some(&local), version: None };
        assert_eq!(flatten(&wire, &table, &ctx)["subnet"], ConfigValue::from("10.1.0.0/16"));

        let rec = flatten(&wire, &table, &FlattenContext::default());
        assert_eq!(rec["subnet"], ConfigValue::from("10.1.0.0 255.255.0.0"));
    }

    #[test]
    fn test_reordered_elements_match_local_by_key() {
        let table = vec![FieldDef::block(
            "secondaryip",
            vec![
                FieldDef::scalar("id", FieldType::Int),
                FieldDef::scalar("ip", FieldType::String).with_transform(Transform::Ipv4Classnet),
            ],
        )
        .sorted_by("id")];

        let mut local = Record::new();
        local.insert(
            "secondaryip".into(),
            ConfigValue::Block(vec![
                record([("id", ConfigValue::Int(1)), ("ip", ConfigValue::from("10.0.0.1/24"))]),
                record([("id", ConfigValue::Int(2)), ("ip", ConfigValue::from("10.0.1.1 255.255.255.0"))]),
            ]),
        );
        let wire = json!({"secondaryip": [
            {"id": 2, "ip": "10.0.1.1 255.255.255.0"},
            {"id": 1, "ip": "10.0.0.1 255.255.255.0"}
        ]});

        let ctx = FlattenContext { prior: Some(&local), version: None };
        let rec = flatten(&wire, &table, &ctx);
        assert_eq!(rec["secondaryip"], local["secondaryip"]);
    }

    #[test]
    fn test_reordered_sensitive_elements_match_by_name() {
        let table = vec![FieldDef::block(
            "users",
            vec![
                FieldDef::scalar("name", FieldType::String),
                FieldDef::scalar("passwd", FieldType::String).sensitive(),
            ],
        )];
        let mut local = Record::new();
        local.insert(
            "users".into(),
            ConfigValue::Block(vec![
                record([("name", "alice"), ("passwd", "a-secret")]),
                record([("name", "bob"), ("passwd", "b-secret")]),
            ]),
        );
        let wire = json!({"users": [
            {"name": "bob", "passwd": "ENC XXXX"},
            {"name": "carol", "passwd": "ENC YYYY"},
            {"name": "alice", "passwd": "ENC ZZZZ"}
        ]});

        let ctx = FlattenContext { prior: Some(&local), version: None };
        let rec = flatten(&wire, &table, &ctx);
        let users = rec["users"].as_block().unwrap();
        assert_eq!(users[0]["passwd"], ConfigValue::from("b-secret"));
        assert_eq!(users[1]["passwd"], ConfigValue::from("ENC YYYY"));
        assert_eq!(users[2]["passwd"], ConfigValue::from("a-secret"));
    }

    #[test]
    fn test_int_out_of_range_is_rejected() {
        let err = scalar_from_wire(FieldType::Int, &json!(18446744073709551615u64), "max_clients").unwrap_err();
        assert!(matches!(err, MapError::InvalidValue { .. }));
        assert!(scalar_from_wire(FieldType::Int, &json!(1e19), "max_clients").is_err());
        assert_eq!(
            scalar_from_wire(FieldType::Int, &json!(4294967295u64), "max_clients").unwrap(),
            ConfigValue::Int(4294967295)
        );
        assert_eq!(scalar_from_wire(FieldType::Int, &json!(12.0), "x").unwrap(), ConfigValue::Int(12));
    }

    #[test]
    fn test_sort_by_is_stable() {
        let table = vec![FieldDef::block(
            "members",
            vec![
                FieldDef::scalar("seq_num", FieldType::Int),
                FieldDef::scalar("interface", FieldType::String),
            ],
        )
        .sorted_by("seq_num")];
        let wire = json!({"members": [
            {"seq-num": 3, "interface": "c"},
            {"seq-num": 1, "interface": "a"},
            {"seq-num": 3, "interface": "d"},
            {"seq-num": 2, "interface": "b"}
        ]});
        let rec = flatten(&wire, &table, &FlattenContext::default());
        let order: Vec<&str> = rec["members"]
            .as_block()
            .unwrap()
            .iter()
            .map(|m| m["interface"].as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_quoted_name_list_by_version() {
        let table = vec![FieldDef::block(
            "member",
            vec![FieldDef::scalar("interface_name", FieldType::String)],
        )
        .with_transform(Transform::QuotedNameList {
            rules: vec![
                VersionRule {
                    versions: VersionReq::parse(">=6.0.0, <6.2.0").unwrap(),
                    shape: NameShape::List,
                },
                VersionRule {
                    versions: VersionReq::parse(">=6.2.0").unwrap(),
                    shape: NameShape::Records,
                },
            ],
        })];

        let v60 = Version::new(6, 0, 4);
        let ctx = FlattenContext { prior: None, version: Some(&v60) };
        let rec = flatten(&json!({"member": "\"port1\" \"port2\""}), &table, &ctx);
        let names: Vec<&str> = rec["member"]
            .as_block()
            .unwrap()
            .iter()
            .map(|m| m["interface_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["port1", "port2"]);

        let v72 = Version::new(7, 2, 0);
        let ctx = FlattenContext { prior: None, version: Some(&v72) };
        let rec = flatten(
            &json!({"member": [{"interface-name": "port3"}]}),
            &table,
            &ctx,
        );
        assert_eq!(rec["member"].as_block().unwrap()[0]["interface_name"], ConfigValue::from("port3"));

        let v54 = Version::new(5, 4, 0);
        let ctx = FlattenContext { prior: None, version: Some(&v54) };
        let out = flatten_report(&json!({"member": "\"port1\""}), &table, &ctx);
        assert!(out.record.is_empty());
        assert!(matches!(out.errors[0], MapError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_non_object_root() {
        let out = flatten_report(&json!([1, 2]), &policy_table(), &FlattenContext::default());
        assert!(out.record.is_empty());
        assert_eq!(out.errors.len(), 1);
    }
}
