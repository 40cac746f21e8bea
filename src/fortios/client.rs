//! FortiOS Client
//!
//! Main client for the FortiOS REST API, combining the device address,
//! the API token and the HTTP layer. Implements [`Transport`] over the
//! `/api/v2/cmdb` endpoints.

use super::http::{FosHttpClient, TlsOptions};
use crate::config::Config;
use crate::resource::transport::{CallOptions, ReadResponse, Transport};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Mutex;
use url::Url;

/// Main FortiOS client
pub struct FosClient {
    pub http: FosHttpClient,
    pub base_url: Url,
    token: String,
    /// Last API version seen in a response
    version: Mutex<Option<String>>,
}

impl FosClient {
    /// Create a new client for `hostname` (`fgt.example.com`, `10.0.0.1:8443`
    /// or a full `https://` URL)
    pub fn new(hostname: &str, token: &str, tls: &TlsOptions) -> Result<Self> {
        let base_url = base_url(hostname)?;
        let http = FosHttpClient::new(tls)?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
            version: Mutex::new(None),
        })
    }

    /// Create a client from the effective configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let hostname = config
            .hostname
            .as_deref()
            .filter(|h| !h.is_empty())
            .context("No FortiOS hostname configured. Set FORTIOS_ACCESS_HOSTNAME or use --hostname")?;
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("No FortiOS API token configured. Set FORTIOS_ACCESS_TOKEN")?;
        let tls = TlsOptions {
            insecure: config.insecure,
            ca_bundle: config.cabundlefile.clone(),
        };
        Self::new(hostname, token, &tls)
    }

    /// Build a cmdb URL: `/api/v2/cmdb/{path}[/{mkey}][?vdom=..]`
    pub fn cmdb_url(&self, path: &str, mkey: Option<&str>, vdom: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Invalid base URL: {}", self.base_url))?;
            segments.pop_if_empty().extend(["api", "v2", "cmdb"]);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(mkey) = mkey {
                segments.push(mkey);
            }
        }
        if let Some(vdom) = vdom {
            url.query_pairs_mut().append_pair("vdom", vdom);
        }
        Ok(url)
    }

    /// Build a monitor URL: `/api/v2/monitor/{path}`
    pub fn monitor_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/v2/monitor/{}", path))
            .context("Invalid monitor path")
    }

    fn remember_version(&self, response: &Value) {
        if let Some(version) = response.get("version").and_then(|v| v.as_str()) {
            if let Ok(mut cached) = self.version.lock() {
                *cached = Some(version.to_string());
            }
        }
    }

    fn cached_version(&self) -> Option<String> {
        self.version.lock().ok().and_then(|v| v.clone())
    }
}

impl Transport for FosClient {
    async fn create(&self, path: &str, body: &Value, opts: &CallOptions) -> Result<Value> {
        let url = self.cmdb_url(path, None, opts.vdom.as_deref())?;
        let response = self.http.post(&url, &self.token, body, opts.attempts).await?;
        self.remember_version(&response);
        Ok(response)
    }

    async fn read(
        &self,
        path: &str,
        mkey: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Option<ReadResponse>> {
        let url = self.cmdb_url(path, mkey, opts.vdom.as_deref())?;
        let Some(response) = self.http.get(&url, &self.token, opts.attempts).await? else {
            return Ok(None);
        };
        self.remember_version(&response);

        let version = response
            .get("version")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // Table objects come back as a one-element list, singletons as an object
        let object = match response.get("results") {
            Some(Value::Array(items)) => match items.first() {
                Some(item) => item.clone(),
                None => return Ok(None),
            },
            Some(Value::Object(obj)) => Value::Object(obj.clone()),
            _ => return Ok(None),
        };

        Ok(Some(ReadResponse { object, version }))
    }

    async fn update(
        &self,
        path: &str,
        mkey: Option<&str>,
        body: &Value,
        opts: &CallOptions,
    ) -> Result<Value> {
        let url = self.cmdb_url(path, mkey, opts.vdom.as_deref())?;
        let response = self.http.put(&url, &self.token, body, opts.attempts).await?;
        self.remember_version(&response);
        Ok(response)
    }

    async fn delete(&self, path: &str, mkey: &str, opts: &CallOptions) -> Result<()> {
        let url = self.cmdb_url(path, Some(mkey), opts.vdom.as_deref())?;
        self.http.delete(&url, &self.token, opts.attempts).await?;
        Ok(())
    }

    async fn api_version(&self, opts: &CallOptions) -> Result<Option<String>> {
        if let Some(version) = self.cached_version() {
            return Ok(Some(version));
        }
        let url = self.monitor_url("system/status")?;
        let Some(response) = self.http.get(&url, &self.token, opts.attempts).await? else {
            return Ok(None);
        };
        self.remember_version(&response);
        Ok(self.cached_version())
    }
}

/// Normalize a hostname into a base URL; bare hosts get `https://`
pub fn base_url(hostname: &str) -> Result<Url> {
    let trimmed = hostname.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let mut url = Url::parse(&with_scheme).with_context(|| format!("Invalid hostname: {}", hostname))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
