//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads all FortiOS resource definitions from embedded JSON
//! files and provides lookup functions for the rest of the crate.

use crate::schema::error::MapError;
use crate::schema::field::FieldDef;
use crate::schema::transform::Transform;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/firewall.json"),
    include_str!("../resources/system.json"),
    include_str!("../resources/router.json"),
    include_str!("../resources/user.json"),
    include_str!("../resources/wireless.json"),
];

/// JSON type of a resource's identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MkeyType {
    #[default]
    String,
    Int,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Registry key (`firewall_policy`), filled in at load time
    #[serde(skip)]
    pub key: String,
    /// cmdb path (`firewall/policy`)
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// Identifier field; absent for singleton objects
    #[serde(default)]
    pub mkey: Option<String>,
    #[serde(default)]
    pub mkey_type: MkeyType,
    pub fields: Vec<FieldDef>,
}

impl ResourceDef {
    /// CamelCase type name used in messages and as fallback identifier
    /// (`firewall_policy` -> `FirewallPolicy`)
    pub fn type_name(&self) -> String {
        self.key
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }

    /// Singleton objects (`system/settings`) have no identifier
    pub fn is_singleton(&self) -> bool {
        self.mkey.is_none()
    }

    /// Whether mapping needs the device's API version
    pub fn needs_version(&self) -> bool {
        fn walk(fields: &[FieldDef]) -> bool {
            fields.iter().any(|f| {
                matches!(f.transform, Some(Transform::QuotedNameList { .. })) || walk(&f.fields)
            })
        }
        walk(&self.fields)
    }

    /// Check an identifier against `mkey_type`
    pub fn check_id(&self, id: &str) -> Result<(), MapError> {
        if self.mkey_type == MkeyType::Int && id.parse::<i64>().is_err() {
            return Err(MapError::IdType {
                found: format!("string {:?} (expected integer)", id),
            });
        }
        Ok(())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig::default();

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        for (key, def) in final_config.resources.iter_mut() {
            def.key = key.clone();
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::Mode;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_firewall_policy_resource_exists() {
        let resource = get_resource("firewall_policy");
        assert!(resource.is_some(), "Firewall policy resource should exist");

        let resource = resource.unwrap();
        assert_eq!(resource.key, "firewall_policy");
        assert_eq!(resource.path, "firewall/policy");
        assert_eq!(resource.mkey.as_deref(), Some("policyid"));
        assert_eq!(resource.mkey_type, MkeyType::Int);
        assert_eq!(resource.type_name(), "FirewallPolicy");
        assert!(!resource.is_singleton());
    }

    #[test]
    fn test_get_all_resource_keys() {
        let keys = get_all_resource_keys();
        assert!(keys.contains(&"firewall_address"));
        assert!(keys.contains(&"system_settings"));
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_singletons_and_versioned_resources() {
        let settings = get_resource("system_settings").unwrap();
        assert!(settings.is_singleton());
        assert_eq!(settings.type_name(), "SystemSettings");

        assert!(get_resource("system_interface").unwrap().needs_version());
        assert!(!get_resource("firewall_address").unwrap().needs_version());
    }

    #[test]
    fn test_every_definition_is_well_formed() {
        fn check(fields: &[FieldDef], key: &str) {
            for field in fields {
                assert_eq!(
                    field.is_block(),
                    !field.fields.is_empty(),
                    "{}: block {} must declare subfields",
                    key,
                    field.name
                );
                if let Some(sort_key) = &field.sort_by {
                    assert!(
                        field.fields.iter().any(|f| &f.name == sort_key),
                        "{}: sort key {} missing",
                        key,
                        sort_key
                    );
                }
                check(&field.fields, key);
            }
        }

        for (key, def) in &get_registry().resources {
            check(&def.fields, key);
            if let Some(mkey) = &def.mkey {
                let field = def.fields.iter().find(|f| &f.name == mkey);
                assert!(field.is_some(), "{}: mkey {} is not a field", key, mkey);
                assert_ne!(field.unwrap().mode, Mode::Computed, "{}", key);
            }
        }
    }

    #[test]
    fn test_check_id() {
        let policy = get_resource("firewall_policy").unwrap();
        assert!(policy.check_id("12").is_ok());
        assert!(matches!(policy.check_id("abc"), Err(MapError::IdType { .. })));
        assert!(get_resource("firewall_address").unwrap().check_id("abc").is_ok());
    }
}
