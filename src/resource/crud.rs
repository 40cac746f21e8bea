//! CRUD orchestrators
//!
//! Four entry points per resource. Each expands the caller's configuration,
//! calls the transport, flattens the response into state and manages the
//! external identifier. Errors carry a fixed `Error <op> <Type> resource`
//! prefix.

use super::registry::ResourceDef;
use super::transport::{CallOptions, Transport};
use crate::schema::data::ResourceData;
use crate::schema::error::{json_kind, MapError};
use crate::schema::expand::{expand, ExpandContext, ExpandMode};
use crate::schema::flatten::{flatten, FlattenContext};
use crate::schema::transform::parse_fos_version;
use crate::schema::validate::validate;
use anyhow::{Context, Result};
use semver::Version;
use serde_json::Value;

/// Create the object, record its identifier and read it back
pub async fn create<T: Transport>(
    def: &ResourceDef,
    data: &mut ResourceData,
    transport: &T,
    opts: &CallOptions,
) -> Result<()> {
    let type_name = def.type_name();
    let body = build_body(def, data, transport, opts, ExpandMode::Apply)
        .await
        .with_context(|| format!("Error creating {} resource while getting object", type_name))?;

    tracing::info!("Creating {} at {}", type_name, def.path);
    let result = if def.is_singleton() {
        transport.update(&def.path, None, &body, opts).await
    } else {
        transport.create(&def.path, &body, opts).await
    };
    let response = result.with_context(|| format!("Error creating {} resource", type_name))?;

    let id = mkey_from_response(&response)
        .with_context(|| format!("Error creating {} resource", type_name))?
        .unwrap_or_else(|| type_name.clone());
    data.set_id(id);

    read(def, data, transport, opts).await
}

/// Read the object into `data`'s state; clears the identifier when the
/// object no longer exists
pub async fn read<T: Transport>(
    def: &ResourceDef,
    data: &mut ResourceData,
    transport: &T,
    opts: &CallOptions,
) -> Result<()> {
    let type_name = def.type_name();
    let Some(id) = data.id().map(str::to_string) else {
        anyhow::bail!("Error reading {} resource: no identifier", type_name);
    };
    let mkey = object_mkey(def, &id).with_context(|| format!("Error reading {} resource", type_name))?;

    let response = transport
        .read(&def.path, mkey, opts)
        .await
        .with_context(|| format!("Error reading {} resource", type_name))?;

    let Some(response) = response.filter(|r| !is_empty_object(&r.object)) else {
        tracing::warn!("{} ({}) not found, removing from state", type_name, id);
        data.clear_id();
        return Ok(());
    };

    let version = match response.version.as_deref().and_then(parse_fos_version) {
        Some(version) => Some(version),
        None => api_version(def, transport, opts)
            .await
            .with_context(|| format!("Error reading {} resource", type_name))?,
    };
    let ctx = FlattenContext {
        prior: Some(data.config()),
        version: version.as_ref(),
    };
    let fetched = flatten(&response.object, &def.fields, &ctx);
    tracing::debug!("Read {} ({}): {} fields", type_name, id, fetched.len());
    data.merge_state(fetched, &def.fields);
    Ok(())
}

/// Send the changed configuration and read the object back
pub async fn update<T: Transport>(
    def: &ResourceDef,
    data: &mut ResourceData,
    transport: &T,
    opts: &CallOptions,
) -> Result<()> {
    let type_name = def.type_name();
    let id = data.id().map(str::to_string).unwrap_or_else(|| type_name.clone());
    let mkey = object_mkey(def, &id).with_context(|| format!("Error updating {} resource", type_name))?;

    let body = build_body(def, data, transport, opts, ExpandMode::Apply)
        .await
        .with_context(|| format!("Error updating {} resource while getting object", type_name))?;

    tracing::info!("Updating {} ({})", type_name, id);
    let response = transport
        .update(&def.path, mkey, &body, opts)
        .await
        .with_context(|| format!("Error updating {} resource", type_name))?;

    // The device may renumber the object
    let new_id = mkey_from_response(&response)
        .with_context(|| format!("Error updating {} resource", type_name))?
        .unwrap_or(id);
    data.set_id(new_id);

    read(def, data, transport, opts).await
}

/// Remove the object. Singletons cannot be removed; they are reset by
/// sending every field cleared.
pub async fn delete<T: Transport>(
    def: &ResourceDef,
    data: &mut ResourceData,
    transport: &T,
    opts: &CallOptions,
) -> Result<()> {
    let type_name = def.type_name();

    if def.is_singleton() {
        let body = build_body(def, data, transport, opts, ExpandMode::Clear)
            .await
            .with_context(|| format!("Error deleting {} resource while getting object", type_name))?;
        tracing::info!("Resetting {}", type_name);
        transport
            .update(&def.path, None, &body, opts)
            .await
            .with_context(|| format!("Error deleting {} resource", type_name))?;
    } else {
        let Some(id) = data.id().map(str::to_string) else {
            anyhow::bail!("Error deleting {} resource: no identifier", type_name);
        };
        def.check_id(&id)
            .with_context(|| format!("Error deleting {} resource", type_name))?;
        tracing::info!("Deleting {} ({})", type_name, id);
        transport
            .delete(&def.path, &id, opts)
            .await
            .with_context(|| format!("Error deleting {} resource", type_name))?;
    }

    data.clear_id();
    Ok(())
}

/// Adopt an existing object by identifier
pub async fn import_state<T: Transport>(
    def: &ResourceDef,
    id: &str,
    transport: &T,
    opts: &CallOptions,
) -> Result<ResourceData> {
    let mut data = ResourceData::default().with_id(id);
    read(def, &mut data, transport, opts).await?;
    if data.id().is_none() {
        anyhow::bail!("Cannot import non-existent remote object {} ({})", def.type_name(), id);
    }
    Ok(data)
}

/// Validate (for Apply) and expand `data` into a request body
async fn build_body<T: Transport>(
    def: &ResourceDef,
    data: &ResourceData,
    transport: &T,
    opts: &CallOptions,
    mode: ExpandMode,
) -> Result<Value> {
    if mode == ExpandMode::Apply {
        let errors = validate(data.config(), &def.fields);
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("invalid configuration: {}", joined);
        }
    }

    let version = api_version(def, transport, opts).await?;
    let ctx = ExpandContext {
        mode,
        version: version.as_ref(),
    };
    let body = expand(data, &def.fields, &ctx)?;
    Ok(Value::Object(body))
}

async fn api_version<T: Transport>(
    def: &ResourceDef,
    transport: &T,
    opts: &CallOptions,
) -> Result<Option<Version>> {
    if !def.needs_version() {
        return Ok(None);
    }
    let raw = transport.api_version(opts).await.context("Failed to get API version")?;
    Ok(raw.as_deref().and_then(parse_fos_version))
}

fn object_mkey<'a>(def: &ResourceDef, id: &'a str) -> Result<Option<&'a str>, MapError> {
    if def.is_singleton() {
        return Ok(None);
    }
    def.check_id(id)?;
    Ok(Some(id))
}

/// Identifier from a write response (`mkey`), `None` when absent or empty
pub fn mkey_from_response(response: &Value) -> Result<Option<String>, MapError> {
    match response.get("mkey") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(MapError::IdType {
            found: json_kind(other).to_string(),
        }),
    }
}

fn is_empty_object(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
