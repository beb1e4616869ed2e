use serde::Deserialize;
use std::sync::Arc;
use tauri::Emitter;
use tracing::{info, warn};

use crate::admin::{self, AdminUiState};
use crate::api;
use crate::db::DbState;
use crate::notify::{self, ToastKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenModalPayload {
    #[serde(alias = "internal_id", alias = "internalId")]
    id: i64,
    #[serde(alias = "order_id", alias = "displayId")]
    order_id: String,
    #[serde(default, alias = "currentStatus", alias = "current_status")]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdatePayload {
    status: String,
    #[serde(default, alias = "tracking_status")]
    tracking_status: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default, alias = "term")]
    query: String,
}

fn parse_open_modal_payload(arg0: Option<serde_json::Value>) -> Result<OpenModalPayload, String> {
    let payload = arg0.ok_or("Missing modal payload")?;
    let parsed: OpenModalPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid modal payload: {e}"))?;
    if parsed.order_id.trim().is_empty() {
        return Err("Missing order id".into());
    }
    Ok(parsed)
}

fn parse_status_update_payload(
    arg0: Option<serde_json::Value>,
) -> Result<StatusUpdatePayload, String> {
    let payload = arg0.ok_or("Missing status payload")?;
    let mut parsed: StatusUpdatePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid status payload: {e}"))?;
    parsed.status = parsed.status.trim().to_string();
    if parsed.status.is_empty() {
        return Err("Missing status".into());
    }
    Ok(parsed)
}

fn parse_search_payload(arg0: Option<serde_json::Value>) -> String {
    match arg0 {
        Some(serde_json::Value::String(term)) => term,
        Some(v) => serde_json::from_value::<SearchPayload>(v)
            .map(|p| p.query)
            .unwrap_or_default(),
        None => String::new(),
    }
}

fn emit_session_expired(app: &tauri::AppHandle) {
    let _ = app.emit(
        "admin_session_expired",
        serde_json::json!({ "redirect": admin::LOGIN_REDIRECT }),
    );
}

/// Fetch and render the order table. On session expiry the login redirect
/// event fires and no table render is attempted.
#[tauri::command]
pub async fn admin_load_orders(
    db: tauri::State<'_, DbState>,
    state: tauri::State<'_, Arc<AdminUiState>>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    match admin::load_orders(&db).await {
        Ok(records) => {
            let table = admin::render_orders_table(&records);
            if let Ok(mut last) = state.last_orders.lock() {
                *last = records;
            }
            info!(rows = table.rows.len(), "admin_load_orders");
            serde_json::to_value(table).map_err(|e| e.to_string())
        }
        Err(e) if api::is_admin_auth_failure(&e) => {
            emit_session_expired(&app);
            Err(e)
        }
        Err(e) => {
            warn!("admin_load_orders failed, table left stale: {e}");
            Err(e)
        }
    }
}

#[tauri::command]
pub async fn admin_load_stats(
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    match admin::load_stats(&db).await {
        Ok(stats) => {
            let view = admin::stats_view(&stats);
            serde_json::to_value(view).map_err(|e| e.to_string())
        }
        Err(e) if api::is_admin_auth_failure(&e) => {
            emit_session_expired(&app);
            Err(e)
        }
        Err(e) => {
            warn!("admin_load_stats failed, stats left stale: {e}");
            Err(e)
        }
    }
}

/// Manual refresh. Deliberately not mutually exclusive with the timer
/// tick; whichever response resolves last wins the rendered state.
#[tauri::command]
pub async fn admin_refresh(
    db: tauri::State<'_, DbState>,
    state: tauri::State<'_, Arc<AdminUiState>>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    admin::refresh_admin_data(&app, &db, &state).await
}

/// Display-only search over the last rendered rows. No re-fetch.
#[tauri::command]
pub async fn admin_search_orders(
    arg0: Option<serde_json::Value>,
    state: tauri::State<'_, Arc<AdminUiState>>,
) -> Result<serde_json::Value, String> {
    let term = parse_search_payload(arg0);
    let snapshot = state
        .last_orders
        .lock()
        .map_err(|e| e.to_string())?
        .clone();
    let rows = admin::filter_rows(&admin::render_orders_table(&snapshot).rows, &term);
    serde_json::to_value(rows).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_open_status_modal(
    arg0: Option<serde_json::Value>,
    state: tauri::State<'_, Arc<AdminUiState>>,
) -> Result<serde_json::Value, String> {
    let payload = parse_open_modal_payload(arg0)?;
    let seed = admin::open_status_modal(&state, payload.id, &payload.order_id, &payload.status);
    info!(internal_id = payload.id, "admin_open_status_modal");
    Ok(seed)
}

#[tauri::command]
pub async fn admin_close_status_modal(
    state: tauri::State<'_, Arc<AdminUiState>>,
) -> Result<(), String> {
    admin::close_status_modal(&state);
    Ok(())
}

/// PATCH the selected order's status, then force an immediate
/// orders+stats refresh (superseding the timer tick).
#[tauri::command]
pub async fn admin_update_order_status(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
    state: tauri::State<'_, Arc<AdminUiState>>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = parse_status_update_payload(arg0)?;
    let internal_id = admin::selected_order(&state).ok_or("No order selected")?;

    match admin::update_order_status(&db, internal_id, &payload.status, &payload.tracking_status)
        .await
    {
        Ok(resp) => {
            admin::close_status_modal(&state);
            let _ = admin::refresh_admin_data(&app, &db, &state).await;

            let order_id = resp
                .get("order_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            notify::show_toast(&app, &format!("Order {order_id} updated!"), ToastKind::Success);
            info!(internal_id, status = %payload.status, "admin_update_order_status");
            Ok(resp)
        }
        Err(e) => {
            if api::is_admin_auth_failure(&e) {
                emit_session_expired(&app);
            }
            // Modal stays open (selected order kept) for correction.
            notify::show_toast(&app, &format!("Error: {e}"), ToastKind::Error);
            warn!(internal_id, "admin_update_order_status failed: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_modal_payload_accepts_both_id_spellings() {
        let parsed = parse_open_modal_payload(Some(serde_json::json!({
            "id": 7, "orderId": "A1B2C3D4", "status": "pending"
        })))
        .unwrap();
        assert_eq!(parsed.id, 7);

        let parsed = parse_open_modal_payload(Some(serde_json::json!({
            "internalId": 9, "order_id": "FFFF0000", "currentStatus": "approved"
        })))
        .unwrap();
        assert_eq!(parsed.id, 9);
        assert_eq!(parsed.status, "approved");
    }

    #[test]
    fn status_update_payload_requires_a_status() {
        let err = parse_status_update_payload(Some(serde_json::json!({
            "status": " ", "tracking_status": "Out for delivery"
        })))
        .unwrap_err();
        assert_eq!(err, "Missing status");

        let parsed = parse_status_update_payload(Some(serde_json::json!({
            "status": "approved", "trackingStatus": "Being prepared"
        })))
        .unwrap();
        assert_eq!(parsed.tracking_status, "Being prepared");
    }

    #[test]
    fn search_payload_accepts_bare_strings_and_objects() {
        assert_eq!(
            parse_search_payload(Some(serde_json::json!("biryani"))),
            "biryani"
        );
        assert_eq!(
            parse_search_payload(Some(serde_json::json!({ "query": "lahore" }))),
            "lahore"
        );
        assert_eq!(parse_search_payload(None), "");
    }
}
