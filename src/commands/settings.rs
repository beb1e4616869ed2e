use serde::Deserialize;
use tracing::info;

use crate::api;
use crate::db::{self, DbState};
use crate::storage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteUrlPayload {
    #[serde(alias = "site_url", alias = "siteUrl")]
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminSessionPayload {
    #[serde(alias = "session", alias = "cookie")]
    token: String,
}

fn parse_site_url_payload(arg0: Option<serde_json::Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(serde_json::Value::String(url)) => serde_json::json!({ "url": url }),
        Some(v) => v,
        None => return Err("Missing site URL".into()),
    };
    let parsed: SiteUrlPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid site URL payload: {e}"))?;
    let normalized = api::normalize_site_url(&parsed.url);
    if normalized.trim().is_empty() {
        return Err("Missing site URL".into());
    }
    Ok(normalized)
}

#[tauri::command]
pub async fn settings_is_configured() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "configured": storage::is_configured() }))
}

#[tauri::command]
pub async fn settings_get_full_config() -> Result<serde_json::Value, String> {
    Ok(storage::get_full_config())
}

#[tauri::command]
pub async fn settings_get_site_url(
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let url = storage::get_site_url().or_else(|| crate::read_local_setting(&db, "connection", "site_url"));
    Ok(serde_json::json!({ "site_url": url }))
}

/// Store the site base URL in the keyring, mirrored into `local_settings`
/// as a fallback for platforms without a usable secret service.
#[tauri::command]
pub async fn settings_set_site_url(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let normalized = parse_site_url_payload(arg0)?;

    storage::set_site_url(&normalized)?;
    if let Ok(conn) = db.conn.lock() {
        let _ = db::set_setting(&conn, "connection", "site_url", &normalized);
    }

    info!(site_url = %normalized, "settings_set_site_url");
    Ok(serde_json::json!({ "success": true, "site_url": normalized }))
}

/// Store the admin session cookie captured after a dashboard login.
#[tauri::command]
pub async fn settings_set_admin_session(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing session payload")?;
    let parsed: AdminSessionPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid session payload: {e}"))?;
    if parsed.token.trim().is_empty() {
        return Err("Missing session token".into());
    }

    storage::set_admin_session(&parsed.token)?;
    info!("settings_set_admin_session: admin session stored");
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn settings_clear_admin_session() -> Result<serde_json::Value, String> {
    storage::clear_admin_session()?;
    Ok(serde_json::json!({ "success": true }))
}

/// Disconnect from the site entirely: credentials and the local mirror.
#[tauri::command]
pub async fn settings_clear_connection(
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let result = storage::clear_connection()?;
    if let Ok(conn) = db.conn.lock() {
        let _ = db::delete_all_settings(&conn, "connection");
    }
    Ok(result)
}

/// Lightweight connectivity probe against the stored (or provided) URL.
#[tauri::command]
pub async fn settings_test_connection(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let url = match parse_site_url_payload(arg0) {
        Ok(url) => url,
        Err(_) => crate::site_base_url(&db)?,
    };
    let result = api::test_connectivity(&url).await;
    serde_json::to_value(result).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_url_payload_normalizes_bare_strings() {
        assert_eq!(
            parse_site_url_payload(Some(serde_json::json!("zaika.app/"))).unwrap(),
            "https://zaika.app"
        );
    }

    #[test]
    fn site_url_payload_accepts_object_shapes() {
        assert_eq!(
            parse_site_url_payload(Some(serde_json::json!({ "siteUrl": "localhost:5000" })))
                .unwrap(),
            "http://localhost:5000"
        );
    }

    #[test]
    fn missing_site_url_is_rejected() {
        assert!(parse_site_url_payload(None).is_err());
    }
}
