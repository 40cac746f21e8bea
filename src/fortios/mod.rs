//! FortiOS API interaction module
//!
//! This module provides the HTTP transport to a FortiGate's REST API.
//!
//! # Module Structure
//!
//! - [`client`] - Main FortiOS client, implements [`crate::resource::Transport`]
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use fosmap::fortios::client::FosClient;
//! use fosmap::fortios::http::TlsOptions;
//!
//! let client = FosClient::new("192.168.1.99", "api-token", &TlsOptions::default())?;
//! let url = client.cmdb_url("firewall/policy", Some("7"), Some("root"))?;
//! ```

pub mod client;
pub mod http;
