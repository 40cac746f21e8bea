//! HTTP utilities for FortiOS REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::path::Path;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// TLS settings for the device connection
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Accept self-signed device certificates
    pub insecure: bool,
    /// PEM bundle of extra trusted roots
    pub ca_bundle: Option<std::path::PathBuf>,
}

/// HTTP client wrapper for FortiOS API calls
#[derive(Clone)]
pub struct FosHttpClient {
    client: Client,
}

impl FosHttpClient {
    /// Create a new HTTP client
    pub fn new(tls: &TlsOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("fosmap/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(tls.insecure);

        if let Some(path) = &tls.ca_bundle {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }

        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// GET; `None` when the device answers 404
    pub async fn get(&self, url: &Url, token: &str, attempts: u32) -> Result<Option<Value>> {
        let (status, body) = self.send(Method::GET, url, token, None, attempts).await?;
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("GET {} returned 404", url);
            return Ok(None);
        }
        parse_envelope(status, &body).map(Some)
    }

    pub async fn post(&self, url: &Url, token: &str, body: &Value, attempts: u32) -> Result<Value> {
        let (status, body) = self.send(Method::POST, url, token, Some(body), attempts).await?;
        parse_envelope(status, &body)
    }

    pub async fn put(&self, url: &Url, token: &str, body: &Value, attempts: u32) -> Result<Value> {
        let (status, body) = self.send(Method::PUT, url, token, Some(body), attempts).await?;
        parse_envelope(status, &body)
    }

    pub async fn delete(&self, url: &Url, token: &str, attempts: u32) -> Result<Value> {
        let (status, body) = self.send(Method::DELETE, url, token, None, attempts).await?;
        parse_envelope(status, &body)
    }

    /// Send a request, re-attempting failed sends up to `attempts` times.
    /// HTTP error statuses are returned, not retried.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<&Value>,
        attempts: u32,
    ) -> Result<(StatusCode, String)> {
        let attempts = attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            tracing::debug!("{} {} (attempt {}/{})", method, url, attempt, attempts);

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .context("Failed to read response body")?;
                    return Ok((status, text));
                }
                Err(e) => {
                    tracing::warn!("{} {} failed on attempt {}: {}", method, url, attempt, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(anyhow::Error::new(e).context("Failed to send request")),
            None => Err(anyhow::anyhow!("Failed to send request")),
        }
    }
}

fn load_certificate(path: &Path) -> Result<reqwest::Certificate> {
    let pem = std::fs::read(path)
        .with_context(|| format!("Failed to read CA bundle {}", path.display()))?;
    reqwest::Certificate::from_pem(&pem).context("Failed to parse CA bundle")
}

/// Check the status code and the FortiOS response envelope
/// (`{"status": "success" | "error", "http_status": ..., ...}`)
fn parse_envelope(status: StatusCode, body: &str) -> Result<Value> {
    let parsed: Option<Value> = if body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    let envelope_error = parsed
        .as_ref()
        .and_then(|v| v.get("status"))
        .and_then(|s| s.as_str())
        .is_some_and(|s| s == "error");

    if !status.is_success() || envelope_error {
        // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
        tracing::error!("API error: {} - {}", status, sanitize_for_log(body));
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("http_status"))
            .and_then(|v| v.as_u64())
            .unwrap_or(u64::from(status.as_u16()));
        let detail = parsed.as_ref().and_then(error_detail);
        return Err(match detail {
            Some(detail) => anyhow::anyhow!("API request failed: {} ({})", code, detail),
            None => anyhow::anyhow!("API request failed: {}", code),
        });
    }

    match parsed {
        Some(value) => Ok(value),
        None if body.trim().is_empty() => Ok(Value::Null),
        None => Err(anyhow::anyhow!("Failed to parse response JSON")),
    }
}

/// `cli_error` text, or the numeric internal error code
fn error_detail(envelope: &Value) -> Option<String> {
    if let Some(cli) = envelope.get("cli_error").and_then(|v| v.as_str()) {
        let cli = cli.trim();
        if !cli.is_empty() {
            return Some(cli.to_string());
        }
    }
    envelope
        .get("error")
        .and_then(|v| v.as_i64())
        .map(|code| format!("error {}", code))
}

/// Format a FortiOS API error for display
/// Security: Sanitizes error messages to avoid leaking API details
pub fn format_fos_error(error: &anyhow::Error) -> String {
    let error_str = format!("{:#}", error);

    if error_str.contains("API request failed: 401") {
        return "Authentication failed. Check the API token.".to_string();
    }
    if error_str.contains("API request failed: 403") {
        return "Permission denied. Check the API user's admin profile and trusted hosts.".to_string();
    }
    if error_str.contains("API request failed: 404") {
        return "Object not found.".to_string();
    }
    if error_str.contains("API request failed: 405") {
        return "Method not allowed for this object.".to_string();
    }
    if error_str.contains("API request failed: 424") {
        return "Failed dependency. The object is referenced by, or references, another object.".to_string();
    }
    if error_str.contains("API request failed: 429") {
        return "Too many requests. Please try again later.".to_string();
    }
    if error_str.contains("API request failed: 500") {
        return "Internal error on the device. The request was rejected.".to_string();
    }
    if error_str.contains("Failed to send request") {
        return "Could not reach the device. Check the hostname and network.".to_string();
    }

    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(200)));
        assert!(out.ends_with("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_parse_envelope_success_and_empty() {
        let v = parse_envelope(StatusCode::OK, r#"{"status":"success","mkey":"a"}"#).unwrap();
        assert_eq!(v["mkey"], "a");
        assert_eq!(parse_envelope(StatusCode::OK, "").unwrap(), Value::Null);
        assert!(parse_envelope(StatusCode::OK, "<html>").is_err());
    }

    #[test]
    fn test_parse_envelope_error_detail() {
        let err = parse_envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status":"error","http_status":500,"error":-5,"cli_error":"entry not found"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "API request failed: 500 (entry not found)");

        let err = parse_envelope(StatusCode::OK, r#"{"status":"error","http_status":424,"error":-23}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "API request failed: 424 (error -23)");
    }

    #[test]
    fn test_format_fos_error() {
        let err = anyhow::anyhow!("API request failed: 401");
        assert_eq!(format_fos_error(&err), "Authentication failed. Check the API token.");

        let err = anyhow::anyhow!("API request failed: 424 (error -23)").context("Error deleting FirewallAddress resource");
        assert!(format_fos_error(&err).starts_with("Failed dependency"));

        let err = anyhow::anyhow!("something odd");
        assert_eq!(format_fos_error(&err), "something odd");
    }
}
