//! Transport seam between the CRUD orchestrators and the device
//!
//! [`crate::fortios::client::FosClient`] is the HTTP implementation; tests
//! substitute an in-memory one.

use anyhow::Result;
use serde_json::Value;

/// Per-call settings passed explicitly to every transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Virtual domain scope, sent as `?vdom=`
    pub vdom: Option<String>,
    /// Number of times a failed send is attempted
    pub attempts: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            vdom: None,
            attempts: 1,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vdom(mut self, vdom: impl Into<String>) -> Self {
        self.vdom = Some(vdom.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

/// Object returned by a read, with the API version the device reported
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub object: Value,
    pub version: Option<String>,
}

/// Device operations on one cmdb `path` (`firewall/policy`).
///
/// `mkey` is `None` for singleton objects such as `system/settings`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn create(&self, path: &str, body: &Value, opts: &CallOptions) -> Result<Value>;

    /// `Ok(None)` when the object does not exist
    async fn read(
        &self,
        path: &str,
        mkey: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Option<ReadResponse>>;

    async fn update(
        &self,
        path: &str,
        mkey: Option<&str>,
        body: &Value,
        opts: &CallOptions,
    ) -> Result<Value>;

    async fn delete(&self, path: &str, mkey: &str, opts: &CallOptions) -> Result<()>;

    /// API version reported by the device, e.g. `v7.2.0`
    async fn api_version(&self, opts: &CallOptions) -> Result<Option<String>>;
}
