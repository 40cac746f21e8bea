//! Per-call resource state
//!
//! [`ResourceData`] is what the host hands to each CRUD call: the caller's
//! configuration, which top-level keys changed since the last applied state,
//! the external identifier, and the state populated by Read.

use super::field::FieldDef;
use super::value::{ConfigValue, Record};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: Option<String>,
    config: Record,
    state: Record,
    changed: BTreeSet<String>,
}

impl ResourceData {
    /// Fresh resource: every key present in `config` counts as changed
    pub fn new(config: Record) -> Self {
        let changed = config.keys().cloned().collect();
        Self {
            id: None,
            config,
            state: Record::new(),
            changed,
        }
    }

    /// Resource with a previously applied state. A key is changed when its
    /// value differs between `prior` and `config`, including keys that were
    /// removed from `config`.
    pub fn with_prior(config: Record, prior: Record) -> Self {
        let changed = config
            .keys()
            .chain(prior.keys())
            .filter(|key| config.get(*key) != prior.get(*key))
            .cloned()
            .collect();
        Self {
            id: None,
            config,
            state: prior,
            changed,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Marks the resource as gone
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Value as configured by the caller, `None` when unset
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// Value when set to something other than its zero value
    pub fn get_ok(&self, key: &str) -> Option<&ConfigValue> {
        self.config.get(key).filter(|v| !v.is_zero())
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.changed.contains(key)
    }

    pub fn mark_changed(&mut self, key: &str) {
        self.changed.insert(key.to_string());
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.config.insert(key.to_string(), value.into());
        self.changed.insert(key.to_string());
    }

    /// Unset a configuration value; the change is recorded
    pub fn unset(&mut self, key: &str) {
        if self.config.remove(key).is_some() {
            self.changed.insert(key.to_string());
        }
    }

    pub fn config(&self) -> &Record {
        &self.config
    }

    /// State populated by the last Read
    pub fn state(&self) -> &Record {
        &self.state
    }

    pub fn set_state(&mut self, state: Record) {
        self.state = state;
    }

    /// Overlay a freshly read record on the current state. Fields the
    /// device left unset keep their prior value; an unset sensitive field
    /// falls back to the configured value when that is non-empty.
    pub fn merge_state(&mut self, mut fetched: Record, table: &[FieldDef]) {
        for field in table {
            if let Some(value) = fetched.remove(&field.name) {
                self.state.insert(field.name.clone(), value);
                continue;
            }
            if field.sensitive && !self.state.contains_key(&field.name) {
                if let Some(local) = self.get_ok(&field.name) {
                    self.state.insert(field.name.clone(), local.clone());
                }
            }
        }
    }

    pub fn into_state(self) -> Record {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldType;
    use crate::schema::value::record;

    #[test]
    fn test_new_marks_every_configured_key() {
        let data = ResourceData::new(record([("name", "a"), ("comment", "")]));
        assert!(data.has_change("name"));
        assert!(data.has_change("comment"));
        assert!(!data.has_change("srcintf"));
        assert!(data.get("comment").is_some());
        assert!(data.get_ok("comment").is_none());
    }

    #[test]
    fn test_with_prior_detects_removed_block() {
        let mut prior = record([("name", "a")]);
        prior.insert(
            "src".into(),
            ConfigValue::Block(vec![record([("name", "h1")])]),
        );
        let config = record([("name", "a")]);

        let data = ResourceData::with_prior(config, prior);
        assert!(data.has_change("src"));
        assert!(!data.has_change("name"));
        assert!(data.get("src").is_none());
    }

    #[test]
    fn test_unset_records_change() {
        let mut data = ResourceData::with_prior(record([("x", "1")]), record([("x", "1")]));
        assert!(!data.has_change("x"));
        data.unset("x");
        assert!(data.has_change("x"));
        data.unset("never-set");
        assert!(!data.has_change("never-set"));
    }

    #[test]
    fn test_merge_state_keeps_fields_left_unset() {
        let table = vec![
            FieldDef::scalar("name", FieldType::String),
            FieldDef::scalar("comment", FieldType::String),
            FieldDef::scalar("passwd", FieldType::String).sensitive(),
            FieldDef::block("member", vec![FieldDef::scalar("name", FieldType::String)]),
        ];
        let mut prior = record([("name", "grp"), ("comment", "old")]);
        prior.insert("member".into(), ConfigValue::Block(vec![record([("name", "h1")])]));
        let config = record([("name", "grp"), ("passwd", "s3cret")]);
        let mut data = ResourceData::with_prior(config, prior);

        data.merge_state(record([("comment", "new")]), &table);

        let state = data.state();
        assert_eq!(state["name"], ConfigValue::from("grp"));
        assert_eq!(state["comment"], ConfigValue::from("new"));
        assert_eq!(state["passwd"], ConfigValue::from("s3cret"));
        assert_eq!(state["member"], ConfigValue::Block(vec![record([("name", "h1")])]));
    }

    #[test]
    fn test_id_lifecycle() {
        let mut data = ResourceData::default().with_id("7");
        assert_eq!(data.id(), Some("7"));
        data.set_id("8");
        assert_eq!(data.id(), Some("8"));
        data.clear_id();
        assert_eq!(data.id(), None);
    }
}
