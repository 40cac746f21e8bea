//! Schema-driven tree mapping
//!
//! One generic walker maps between the configuration tree ([`Record`]) and
//! the FortiOS wire tree ([`serde_json::Value`]) using a declarative field
//! table.
//!
//! # Module Structure
//!
//! - [`value`] - configuration values and records
//! - [`field`] - field declarations
//! - [`validate`] - field validators
//! - [`transform`] - classnet, quoted name lists and version rules
//! - [`data`] - per-call resource state
//! - [`flatten`] - wire to configuration
//! - [`expand`] - configuration to wire
//!
//! # Example
//!
//! ```
//! use fosmap::schema::{flatten, FieldDef, FieldType, FlattenContext};
//! use serde_json::json;
//!
//! let table = vec![
//!     FieldDef::scalar("policyid", FieldType::Int),
//!     FieldDef::block("srcintf", vec![FieldDef::scalar("name", FieldType::String)]),
//! ];
//! let wire = json!({"policyid": 7, "srcintf": [{"name": "wan1"}]});
//! let record = flatten(&wire, &table, &FlattenContext::default());
//! assert_eq!(record["policyid"].as_int(), Some(7));
//! ```

pub mod data;
pub mod error;
pub mod expand;
pub mod field;
pub mod flatten;
pub mod transform;
pub mod validate;
pub mod value;

pub use data::ResourceData;
pub use error::MapError;
pub use expand::{expand, expand_clear, expand_record, ExpandContext, ExpandMode};
pub use field::{find_field, BoolStyle, FieldDef, FieldType, Mode};
pub use flatten::{flatten, flatten_report, FlattenContext, Flattened};
pub use transform::{parse_fos_version, NameShape, Transform, VersionRule};
pub use validate::{validate, ValidationError, Validator};
pub use value::{record, ConfigValue, Record};
