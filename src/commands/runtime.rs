use reqwest::Url;
use tracing::info;

use crate::db::DbState;
use crate::diagnostics;
use crate::storage;

const EXTERNAL_URL_MAX_LEN: usize = 2048;

fn parse_external_url_payload(arg0: Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(url)) => Ok(url),
        Some(v) => v
            .get("url")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| "Missing url".to_string()),
        None => Err("Missing url".into()),
    }
}

/// Only the configured site (and localhost during development) may be
/// opened in the system browser.
fn validate_external_url(url_raw: &str) -> Result<Url, String> {
    let trimmed = url_raw.trim();
    if trimmed.is_empty() {
        return Err("External URL cannot be empty".into());
    }
    if trimmed.len() > EXTERNAL_URL_MAX_LEN {
        return Err("External URL is too long".into());
    }

    let parsed = Url::parse(trimmed).map_err(|e| format!("Invalid external URL: {e}"))?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "https" && scheme != "http" {
        return Err("Only http/https URLs are allowed".into());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("Credentialed URLs are not allowed".into());
    }

    let host = parsed
        .host_str()
        .ok_or("External URL is missing a host")?
        .to_ascii_lowercase();
    if matches!(host.as_str(), "localhost" | "127.0.0.1") {
        return Ok(parsed);
    }

    let site_host = storage::get_site_url()
        .and_then(|u| Url::parse(&u).ok())
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
    match site_host {
        Some(site_host) if host == site_host || host.ends_with(&format!(".{site_host}")) => {
            Ok(parsed)
        }
        _ => Err(format!("External host is not allowlisted: {host}")),
    }
}

#[tauri::command]
pub async fn app_get_version() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[tauri::command]
pub async fn system_get_info(
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let db_size = std::fs::metadata(&db.db_path).map(|m| m.len()).unwrap_or(0);

    Ok(serde_json::json!({
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
        "db_path": db.db_path.to_string_lossy(),
        "db_size_bytes": db_size,
        "is_configured": storage::is_configured(),
    }))
}

#[tauri::command]
pub async fn diagnostics_get_about() -> Result<serde_json::Value, String> {
    Ok(diagnostics::get_about_info())
}

#[tauri::command]
pub async fn system_open_external_url(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let url_raw = parse_external_url_payload(arg0)?;
    let parsed = validate_external_url(&url_raw)?;
    let host = parsed.host_str().unwrap_or("unknown").to_string();
    let scheme = parsed.scheme().to_string();
    webbrowser::open(parsed.as_str()).map_err(|e| format!("Failed to open external URL: {e}"))?;
    info!(scheme = %scheme, host = %host, "Opened external URL");
    Ok(serde_json::json!({
        "success": true,
        "host": host,
        "scheme": scheme
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_urls_pass_without_configuration() {
        assert!(validate_external_url("http://localhost:5000/menu").is_ok());
        assert!(validate_external_url("http://127.0.0.1:5000/").is_ok());
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(validate_external_url("file:///etc/passwd").is_err());
        assert!(validate_external_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn credentialed_urls_are_rejected() {
        assert!(validate_external_url("https://user:pw@zaika.app/").is_err());
    }

    #[test]
    fn empty_and_oversized_urls_are_rejected() {
        assert!(validate_external_url("  ").is_err());
        let huge = format!("https://zaika.app/{}", "a".repeat(EXTERNAL_URL_MAX_LEN));
        assert!(validate_external_url(&huge).is_err());
    }
}
