//! Restaurant site API client.
//!
//! Provides HTTP communication with the ordering site, used for menu
//! loading, order submission, and the admin dashboard (orders, stats,
//! status updates). Admin endpoints authenticate with the stored session
//! cookie; a 401 maps to a distinguishable auth-failure message so callers
//! can trigger the login redirect instead of a generic error.

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::info;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight connectivity test.
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Name of the session cookie issued by the site.
const SESSION_COOKIE: &str = "session";

/// Marker message for admin 401 responses; `is_admin_auth_failure` matches
/// against it.
const ADMIN_AUTH_FAILURE_MSG: &str = "Admin session is invalid or expired";

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the site base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_site_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the ordering site at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid site URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => ADMIN_AUTH_FAILURE_MSG.to_string(),
        403 => "Not authorized for this resource".to_string(),
        404 => "Site endpoint not found".to_string(),
        s if s >= 500 => format!("Ordering site server error (HTTP {s})"),
        s => format!("Unexpected response from the ordering site (HTTP {s})"),
    }
}

/// True when the error string came from a 401 on an admin endpoint.
pub fn is_admin_auth_failure(error: &str) -> bool {
    error.contains(ADMIN_AUTH_FAILURE_MSG)
}

/// True when the error looks like a connectivity problem rather than a
/// server-side rejection.
pub fn is_connectivity_error(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("cannot reach the ordering site")
        || lower.contains("network error")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("failed to lookup address")
        || lower.contains("dns")
}

// ---------------------------------------------------------------------------
// Connectivity test
// ---------------------------------------------------------------------------

/// Result of a connectivity test.
#[derive(serde::Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Test connectivity to the site with a lightweight menu request.
pub async fn test_connectivity(site_url: &str) -> ConnectivityResult {
    let url = normalize_site_url(site_url);
    let menu_url = format!("{url}/api/menu");

    let client = match Client::builder().timeout(CONNECTIVITY_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(format!("Failed to create HTTP client: {e}")),
            };
        }
    };

    let start = Instant::now();

    let resp = match client.head(&menu_url).send().await {
        Ok(r) => r,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(friendly_error(&url, &e)),
            };
        }
    };

    let latency = start.elapsed().as_millis() as u64;
    let status = resp.status();

    if status.is_success() {
        info!(latency_ms = latency, "connectivity test passed");
        ConnectivityResult {
            success: true,
            latency_ms: Some(latency),
            error: None,
        }
    } else {
        ConnectivityResult {
            success: false,
            latency_ms: Some(latency),
            error: Some(status_error(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic fetch
// ---------------------------------------------------------------------------

/// Perform an HTTP request against the site.
///
/// `path` should include the leading slash, e.g. `/api/menu`.
/// `method` is an HTTP verb string: "GET", "POST", "PATCH", "DELETE".
/// `session` is an optional admin session cookie value.
pub async fn fetch_site(
    site_url: &str,
    path: &str,
    method: &str,
    body: Option<Value>,
    session: Option<&str>,
) -> Result<Value, String> {
    let base = normalize_site_url(site_url);
    let full_url = format!("{base}{path}");

    let http_method: Method = method
        .to_uppercase()
        .parse()
        .map_err(|_| format!("Invalid HTTP method: {method}"))?;

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

    let mut req = client
        .request(http_method, &full_url)
        .header("Content-Type", "application/json");

    if let Some(token) = session.map(str::trim).filter(|t| !t.is_empty()) {
        req = req.header("Cookie", format!("{SESSION_COOKIE}={token}"));
    }

    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = req.send().await.map_err(|e| friendly_error(&base, &e))?;
    let status = resp.status();

    if !status.is_success() {
        // Preserve server-supplied detail for toast messages.
        let body_text = resp.text().await.unwrap_or_default();
        let detail = if let Ok(json) = serde_json::from_str::<Value>(&body_text) {
            let message = json
                .get("error")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_error(status));
            format!("{message} (HTTP {})", status.as_u16())
        } else if !body_text.trim().is_empty() {
            format!(
                "{} (HTTP {}): {}",
                status_error(status),
                status.as_u16(),
                body_text.trim()
            )
        } else {
            format!("{} (HTTP {})", status_error(status), status.as_u16())
        };
        return Err(detail);
    }

    // Return the JSON body, or null for empty 204 responses.
    let body_text = resp.text().await.unwrap_or_default();
    if body_text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body_text).map_err(|e| format!("Invalid JSON from the site: {e}"))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https_scheme() {
        assert_eq!(normalize_site_url("zaika.app"), "https://zaika.app");
    }

    #[test]
    fn normalize_uses_http_for_localhost() {
        assert_eq!(
            normalize_site_url("localhost:5000"),
            "http://localhost:5000"
        );
        assert_eq!(
            normalize_site_url("127.0.0.1:5000"),
            "http://127.0.0.1:5000"
        );
    }

    #[test]
    fn normalize_strips_trailing_slashes_and_api() {
        assert_eq!(
            normalize_site_url("https://zaika.app/api/"),
            "https://zaika.app"
        );
        assert_eq!(
            normalize_site_url("https://zaika.app///"),
            "https://zaika.app"
        );
    }

    #[test]
    fn auth_failure_classification() {
        let err = format!("{} (HTTP 401)", super::ADMIN_AUTH_FAILURE_MSG);
        assert!(is_admin_auth_failure(&err));
        assert!(!is_admin_auth_failure("Site endpoint not found (HTTP 404)"));
    }

    #[test]
    fn connectivity_classification() {
        assert!(is_connectivity_error(
            "Cannot reach the ordering site at https://zaika.app"
        ));
        assert!(is_connectivity_error(
            "Connection to https://zaika.app timed out"
        ));
        assert!(!is_connectivity_error("Order not found (HTTP 404)"));
    }

    #[test]
    fn status_error_maps_common_codes() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            ADMIN_AUTH_FAILURE_MSG
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            "Ordering site server error (HTTP 500)"
        );
    }
}
