//! Field declarations
//!
//! A field table is an ordered slice of [`FieldDef`]s. Tables are normally
//! deserialized from the embedded resource JSON, but the builder methods
//! below make it easy to declare one in code.

use super::transform::Transform;
use super::validate::Validator;
use super::value::ConfigValue;
use serde::Deserialize;
use std::borrow::Cow;

/// Primitive type or nested list of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Block,
}

/// Who supplies the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Required,
    #[default]
    Optional,
    /// Assigned by the device, never sent
    Computed,
    /// May be set by the caller, otherwise assigned by the device
    OptionalComputed,
}

/// Wire encoding of bool fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoolStyle {
    /// `"enable"` / `"disable"`
    #[default]
    EnableDisable,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Wire key override; defaults to `name` with `_` replaced by `-`
    #[serde(default)]
    pub wire_key: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Nested table for block fields
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub validate: Option<Validator>,
    /// Stable sort key applied to flattened block lists
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub default: Option<ConfigValue>,
    #[serde(default)]
    pub bool_style: BoolStyle,
}

impl FieldDef {
    pub fn scalar(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            wire_key: None,
            field_type,
            fields: Vec::new(),
            mode: Mode::Optional,
            sensitive: false,
            transform: None,
            validate: None,
            sort_by: None,
            default: None,
            bool_style: BoolStyle::EnableDisable,
        }
    }

    pub fn block(name: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            ..Self::scalar(name, FieldType::Block)
        }
    }

    pub fn required(mut self) -> Self {
        self.mode = Mode::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = Mode::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.mode = Mode::OptionalComputed;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn wire(mut self, key: &str) -> Self {
        self.wire_key = Some(key.to_string());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn sorted_by(mut self, key: &str) -> Self {
        self.sort_by = Some(key.to_string());
        self
    }

    pub fn with_default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn json_bool(mut self) -> Self {
        self.bool_style = BoolStyle::Json;
        self
    }

    /// Key used on the wire
    pub fn wire_key(&self) -> Cow<'_, str> {
        match &self.wire_key {
            Some(key) => Cow::Borrowed(key.as_str()),
            None => Cow::Owned(self.name.replace('_', "-")),
        }
    }

    pub fn is_block(&self) -> bool {
        self.field_type == FieldType::Block
    }

    /// Assigned by the device only; callers never supply it
    pub fn is_computed_only(&self) -> bool {
        self.mode == Mode::Computed
    }

    /// Name of the subfield carrying names for `quoted_name_list` blocks
    pub fn name_subfield(&self) -> &str {
        self.fields.first().map(|f| f.name.as_str()).unwrap_or("name")
    }
}

/// Find a field by config key
pub fn find_field<'a>(table: &'a [FieldDef], name: &str) -> Option<&'a FieldDef> {
    table.iter().find(|f| f.name == name)
}
