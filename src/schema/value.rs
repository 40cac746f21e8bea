//! Configuration-side values
//!
//! A [`Record`] is one node of the configuration tree. A key that is missing
//! from the record is *unset*; `Block(vec![])` is an explicit empty list.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One configuration record, keyed by underscore_case field names
pub type Record = BTreeMap<String, ConfigValue>;

/// A configuration value: a scalar or an ordered list of nested records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Block(Vec<Record>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&[Record]> {
        match self {
            ConfigValue::Block(items) => Some(items),
            _ => None,
        }
    }

    /// Zero value of its type (empty string, 0, false, empty list)
    pub fn is_zero(&self) -> bool {
        match self {
            ConfigValue::Bool(b) => !b,
            ConfigValue::Int(i) => *i == 0,
            ConfigValue::Float(f) => *f == 0.0,
            ConfigValue::String(s) => s.is_empty(),
            ConfigValue::Block(items) => items.is_empty(),
        }
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Block(_) => "block",
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<Vec<Record>> for ConfigValue {
    fn from(items: Vec<Record>) -> Self {
        ConfigValue::Block(items)
    }
}

/// Ordering used for `sort_by` on block lists.
///
/// Unset keys sort first; values of different kinds compare equal so the
/// stable sort keeps their input order.
pub fn compare_values(a: Option<&ConfigValue>, b: Option<&ConfigValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (ConfigValue::Int(x), ConfigValue::Int(y)) => x.cmp(y),
            (ConfigValue::Float(x), ConfigValue::Float(y)) => {
                x.partial_cmp(y).unwrap_or(Ordering::Equal)
            }
            (ConfigValue::String(x), ConfigValue::String(y)) => x.cmp(y),
            (ConfigValue::Bool(x), ConfigValue::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

/// Build a record from `(key, value)` pairs
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<ConfigValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_maps_to_variants() {
        let parsed: Record = serde_json::from_str(
            r#"{"policyid": 7, "name": "p1", "nat": true, "srcintf": [{"name": "wan1"}]}"#,
        )
        .unwrap();

        assert_eq!(parsed["policyid"], ConfigValue::Int(7));
        assert_eq!(parsed["name"], ConfigValue::from("p1"));
        assert_eq!(parsed["nat"], ConfigValue::Bool(true));
        let srcintf = parsed["srcintf"].as_block().unwrap();
        assert_eq!(srcintf.len(), 1);
        assert_eq!(srcintf[0]["name"], ConfigValue::from("wan1"));
    }

    #[test]
    fn test_is_zero() {
        assert!(ConfigValue::from("").is_zero());
        assert!(ConfigValue::Int(0).is_zero());
        assert!(ConfigValue::Block(vec![]).is_zero());
        assert!(!ConfigValue::from("x").is_zero());
        assert!(!ConfigValue::Bool(true).is_zero());
    }

    #[test]
    fn test_compare_values_unset_first() {
        let one = ConfigValue::Int(1);
        assert_eq!(compare_values(None, Some(&one)), Ordering::Less);
        assert_eq!(
            compare_values(Some(&ConfigValue::Int(2)), Some(&one)),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&ConfigValue::from("a")), Some(&one)),
            Ordering::Equal
        );
    }
}
