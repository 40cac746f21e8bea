//! Resource abstraction layer
//!
//! This module provides a data-driven approach to managing FortiOS
//! configuration objects. Resource definitions are loaded from JSON files at
//! compile time, so new resource types need no code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`transport`] - The seam between orchestrators and the device
//! - [`crud`] - Create/Read/Update/Delete orchestrators
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `firewall.json` - addresses, address groups, policies
//! - `system.json` - interfaces, global settings, SD-WAN
//! - `router.json` - static routes
//! - `user.json` - local users
//! - `wireless.json` - FortiAP profiles
//!
//! # Example
//!
//! ```ignore
//! use fosmap::resource::{crud, get_resource, CallOptions};
//! use fosmap::schema::ResourceData;
//!
//! async fn adopt(client: &FosClient) -> anyhow::Result<ResourceData> {
//!     let def = get_resource("firewall_policy").unwrap();
//!     crud::import_state(def, "7", client, &CallOptions::new().with_vdom("root")).await
//! }
//! ```

pub mod crud;
pub mod registry;
pub mod transport;

pub use registry::*;
pub use transport::{CallOptions, ReadResponse, Transport};
