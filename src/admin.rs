//! Admin dashboard sync: orders table, aggregate stats, status edits.
//!
//! Orders and stats are wholesale snapshots fetched together — once at
//! startup, every tick of a fixed 30 s timer, and immediately after every
//! successful status update. There is no request de-duplication: a manual
//! refresh can overlap a timer tick, and whichever response resolves last
//! wins the rendered state. A 401 from the site is surfaced as an
//! `admin_session_expired` event carrying the login redirect, never as a
//! generic error.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, Emitter};
use tracing::{info, warn};

use crate::api;
use crate::cart::{format_amount, price_label};
use crate::db::DbState;
use crate::storage;

/// Login route the webview navigates to on session expiry.
pub const LOGIN_REDIRECT: &str = "/admin/login";

/// Placeholder row when the order list is empty.
pub const NO_ORDERS_PLACEHOLDER: &str = "No orders yet";

/// Floor for the refresh cadence so a misconfigured interval cannot spin.
const ADMIN_REFRESH_MIN_INTERVAL_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Managed state
// ---------------------------------------------------------------------------

/// Tauri-managed dashboard state.
///
/// `selected_order` tracks which order the status modal currently targets
/// (None when closed). `last_orders` is the snapshot backing the
/// display-only search filter.
pub struct AdminUiState {
    pub selected_order: Mutex<Option<i64>>,
    pub last_orders: Mutex<Vec<AdminOrderRecord>>,
    pub last_refresh: Mutex<Option<String>>,
    pub is_running: Arc<AtomicBool>,
}

impl AdminUiState {
    pub fn new() -> Self {
        Self {
            selected_order: Mutex::new(None),
            last_orders: Mutex::new(Vec::new()),
            last_refresh: Mutex::new(None),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for AdminUiState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server payloads
// ---------------------------------------------------------------------------

/// One order as served by `GET /api/admin/orders`. Server-owned snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderRecord {
    /// Internal numeric id used by the PATCH endpoint.
    pub id: i64,
    /// Public display id.
    pub order_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub items: Value,
    pub total_price: f64,
    pub order_status: String,
    #[serde(default)]
    pub tracking_status: String,
    #[serde(default)]
    pub created_at: String,
}

/// Aggregate counts from `GET /api/admin/stats`. The server also returns
/// `total_users`/`total_products`; the dashboard ignores them.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AdminStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub rejected_orders: i64,
    pub total_revenue: f64,
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

/// Badge class for an order status.
pub fn status_badge_class(status: &str) -> &'static str {
    match status {
        "approved" => "status-approved",
        "rejected" => "status-rejected",
        _ => "status-pending",
    }
}

/// Display form of the server timestamp. Falls back to the raw string when
/// the timestamp does not parse.
fn format_created_at(raw: &str) -> String {
    // Python isoformat: "2026-08-07T12:30:00" or with fractional seconds.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One rendered orders-table row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRowView {
    pub internal_id: i64,
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items_label: String,
    pub total_label: String,
    pub status: String,
    pub status_label: String,
    pub status_class: String,
    pub tracking_status: String,
    pub created_label: String,
    /// Lowercased concatenation of all visible cell text, for the
    /// display-only search filter.
    pub search_text: String,
}

/// Full-replace view of the orders table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersTableView {
    pub rows: Vec<OrderRowView>,
    pub empty: bool,
    pub placeholder: Option<String>,
}

fn row_from_record(order: &AdminOrderRecord) -> OrderRowView {
    let items_count = order.items.as_array().map(|a| a.len()).unwrap_or(0);
    let items_label = format!("{items_count} item(s)");
    let total_label = price_label(order.total_price);
    let status_label = order.order_status.to_uppercase();
    let created_label = format_created_at(&order.created_at);

    let search_text = format!(
        "{} {} {} {} {} {} {} {}",
        order.order_id,
        order.customer_name,
        order.customer_phone,
        items_label,
        total_label,
        status_label,
        order.tracking_status,
        created_label
    )
    .to_lowercase();

    OrderRowView {
        internal_id: order.id,
        order_id: order.order_id.clone(),
        customer_name: order.customer_name.clone(),
        customer_phone: order.customer_phone.clone(),
        items_label,
        total_label,
        status: order.order_status.clone(),
        status_label,
        status_class: status_badge_class(&order.order_status).to_string(),
        tracking_status: order.tracking_status.clone(),
        created_label,
        search_text,
    }
}

/// Render the orders table. Full replace each tick, not diffed.
pub fn render_orders_table(orders: &[AdminOrderRecord]) -> OrdersTableView {
    let rows: Vec<OrderRowView> = orders.iter().map(row_from_record).collect();
    OrdersTableView {
        empty: rows.is_empty(),
        placeholder: rows
            .is_empty()
            .then(|| NO_ORDERS_PLACEHOLDER.to_string()),
        rows,
    }
}

/// Display-only search over already-rendered rows: case-insensitive
/// substring match across all visible cell text. No re-fetch.
pub fn filter_rows(rows: &[OrderRowView], term: &str) -> Vec<OrderRowView> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| row.search_text.contains(&needle))
        .cloned()
        .collect()
}

/// The five stat display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub revenue_label: String,
}

pub fn stats_view(stats: &AdminStats) -> StatsView {
    StatsView {
        total: stats.total_orders,
        pending: stats.pending_orders,
        approved: stats.approved_orders,
        rejected: stats.rejected_orders,
        revenue_label: format!("Rs. {}", format_amount(stats.total_revenue)),
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Fetch the full order list with the stored admin session.
pub async fn load_orders(db: &DbState) -> Result<Vec<AdminOrderRecord>, String> {
    let site_url = crate::site_base_url(db)?;
    let session = storage::get_admin_session();
    let resp = api::fetch_site(
        &site_url,
        "/api/admin/orders",
        "GET",
        None,
        session.as_deref(),
    )
    .await?;
    serde_json::from_value(resp).map_err(|e| format!("Invalid orders payload from the site: {e}"))
}

/// Fetch the aggregate stats with the stored admin session.
pub async fn load_stats(db: &DbState) -> Result<AdminStats, String> {
    let site_url = crate::site_base_url(db)?;
    let session = storage::get_admin_session();
    let resp = api::fetch_site(
        &site_url,
        "/api/admin/stats",
        "GET",
        None,
        session.as_deref(),
    )
    .await?;
    serde_json::from_value(resp).map_err(|e| format!("Invalid stats payload from the site: {e}"))
}

/// PATCH an order's status and tracking status.
pub async fn update_order_status(
    db: &DbState,
    internal_id: i64,
    status: &str,
    tracking_status: &str,
) -> Result<Value, String> {
    let site_url = crate::site_base_url(db)?;
    let session = storage::get_admin_session();
    let path = format!("/api/admin/orders/{internal_id}");
    let body = serde_json::json!({
        "status": status,
        "tracking_status": tracking_status,
    });

    let resp = api::fetch_site(&site_url, &path, "PATCH", Some(body), session.as_deref()).await?;

    let success = resp.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        let message = resp
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Failed to update order status");
        return Err(message.to_string());
    }
    Ok(resp)
}

// ---------------------------------------------------------------------------
// Refresh cycle
// ---------------------------------------------------------------------------

fn emit_session_expired(app: &AppHandle, source: &str) {
    warn!(source = %source, "admin session expired, emitting login redirect");
    let _ = app.emit(
        "admin_session_expired",
        serde_json::json!({ "redirect": LOGIN_REDIRECT }),
    );
}

/// One sync tick: fetch orders and stats, emit rendered views.
///
/// Each fetch fails independently — a stats failure never blanks the order
/// table. On auth failure no table render is attempted; the session-expired
/// event fires once per tick.
pub async fn refresh_admin_data(
    app: &AppHandle,
    db: &DbState,
    state: &AdminUiState,
) -> Result<Value, String> {
    let (orders, stats) = tokio::join!(load_orders(db), load_stats(db));
    let mut auth_expired = false;

    let orders_loaded = match orders {
        Ok(records) => {
            let table = render_orders_table(&records);
            if let Ok(mut last) = state.last_orders.lock() {
                *last = records;
            }
            let _ = app.emit("admin_orders", &table);
            true
        }
        Err(e) if api::is_admin_auth_failure(&e) => {
            auth_expired = true;
            false
        }
        Err(e) if api::is_connectivity_error(&e) => {
            info!("admin orders refresh offline, table left stale: {e}");
            false
        }
        Err(e) => {
            warn!("admin orders refresh failed: {e}");
            false
        }
    };

    let stats_loaded = match stats {
        Ok(stats) => {
            let _ = app.emit("admin_stats", &stats_view(&stats));
            true
        }
        Err(e) if api::is_admin_auth_failure(&e) => {
            auth_expired = true;
            false
        }
        Err(e) if api::is_connectivity_error(&e) => {
            info!("admin stats refresh offline, stats left stale: {e}");
            false
        }
        Err(e) => {
            warn!("admin stats refresh failed: {e}");
            false
        }
    };

    if auth_expired {
        emit_session_expired(app, "admin_refresh");
    }

    if orders_loaded || stats_loaded {
        if let Ok(mut guard) = state.last_refresh.lock() {
            *guard = Some(chrono::Utc::now().to_rfc3339());
        }
    }

    Ok(serde_json::json!({
        "orders_loaded": orders_loaded,
        "stats_loaded": stats_loaded,
        "session_expired": auth_expired,
    }))
}

/// Start the background refresh loop. Spawns a tokio task that refreshes
/// orders + stats every `interval_secs` seconds while an admin session is
/// stored. Ticks are independent of in-flight requests; a hung request
/// never delays the next tick's schedule.
pub fn start_admin_refresh_loop(
    app: AppHandle,
    db: Arc<DbState>,
    state: Arc<AdminUiState>,
    interval_secs: u64,
) {
    let cadence = Duration::from_secs(interval_secs.max(ADMIN_REFRESH_MIN_INTERVAL_SECS));
    let is_running = state.is_running.clone();
    is_running.store(true, Ordering::SeqCst);

    tauri::async_runtime::spawn(async move {
        info!("Admin refresh loop started (interval: {}s)", cadence.as_secs());

        loop {
            if !is_running.load(Ordering::SeqCst) {
                info!("Admin refresh loop stopped");
                break;
            }

            if storage::is_configured() && storage::get_admin_session().is_some() {
                if let Err(e) = refresh_admin_data(&app, &db, &state).await {
                    warn!("Admin refresh tick failed: {e}");
                }
            }

            tokio::time::sleep(cadence).await;
        }
    });
}

// ---------------------------------------------------------------------------
// Status modal
// ---------------------------------------------------------------------------

/// Capture the modal target and seed the form with the current status.
pub fn open_status_modal(
    state: &AdminUiState,
    internal_id: i64,
    display_id: &str,
    current_status: &str,
) -> Value {
    if let Ok(mut selected) = state.selected_order.lock() {
        *selected = Some(internal_id);
    }
    serde_json::json!({
        "order_label": format!("Order ID: {display_id}"),
        "status": current_status,
    })
}

/// Close the modal and forget the target.
pub fn close_status_modal(state: &AdminUiState) {
    if let Ok(mut selected) = state.selected_order.lock() {
        *selected = None;
    }
}

/// Internal id of the order the modal currently targets.
pub fn selected_order(state: &AdminUiState) -> Option<i64> {
    state.selected_order.lock().ok().and_then(|guard| *guard)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, order_id: &str, status: &str) -> AdminOrderRecord {
        AdminOrderRecord {
            id,
            order_id: order_id.into(),
            customer_name: "Ayesha Khan".into(),
            customer_phone: "0300-1234567".into(),
            items: serde_json::json!([
                { "id": 1, "name": "Burger", "price": 250.0, "quantity": 2 },
                { "id": 4, "name": "Samosas", "price": 120.0, "quantity": 1 },
            ]),
            total_price: 620.0,
            order_status: status.into(),
            tracking_status: "Order Confirmed".into(),
            created_at: "2026-08-07T12:30:00".into(),
        }
    }

    #[test]
    fn status_badge_classes_map_all_states() {
        assert_eq!(status_badge_class("pending"), "status-pending");
        assert_eq!(status_badge_class("approved"), "status-approved");
        assert_eq!(status_badge_class("rejected"), "status-rejected");
        // Unknown statuses render as pending rather than breaking the badge.
        assert_eq!(status_badge_class("weird"), "status-pending");
    }

    #[test]
    fn rows_render_labels_and_formatted_date() {
        let table = render_orders_table(&[record(7, "A1B2C3D4", "approved")]);
        assert!(!table.empty);
        let row = &table.rows[0];

        assert_eq!(row.internal_id, 7);
        assert_eq!(row.items_label, "2 item(s)");
        assert_eq!(row.total_label, "Rs. 620.00");
        assert_eq!(row.status_label, "APPROVED");
        assert_eq!(row.status_class, "status-approved");
        assert_eq!(row.created_label, "07/08/2026 12:30");
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_raw() {
        let mut order = record(1, "X", "pending");
        order.created_at = "soon".into();
        let table = render_orders_table(&[order]);
        assert_eq!(table.rows[0].created_label, "soon");
    }

    #[test]
    fn empty_table_renders_placeholder_row() {
        let table = render_orders_table(&[]);
        assert!(table.empty);
        assert_eq!(table.placeholder.as_deref(), Some(NO_ORDERS_PLACEHOLDER));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn search_filters_across_all_visible_cells() {
        let table = render_orders_table(&[
            record(1, "A1B2C3D4", "pending"),
            record(2, "FFFF0000", "approved"),
        ]);

        // By order id, case-insensitive
        assert_eq!(filter_rows(&table.rows, "a1b2").len(), 1);
        // By status label
        assert_eq!(filter_rows(&table.rows, "APPROVED").len(), 1);
        // By customer name (hits both)
        assert_eq!(filter_rows(&table.rows, "ayesha").len(), 2);
        // By formatted total
        assert_eq!(filter_rows(&table.rows, "620.00").len(), 2);
        // Empty term shows everything
        assert_eq!(filter_rows(&table.rows, "  ").len(), 2);
        // No match hides everything (display filter only)
        assert!(filter_rows(&table.rows, "zzz").is_empty());
    }

    #[test]
    fn stats_view_formats_revenue() {
        let stats = AdminStats {
            total_orders: 12,
            pending_orders: 3,
            approved_orders: 8,
            rejected_orders: 1,
            total_revenue: 10424.5,
        };
        let view = stats_view(&stats);
        assert_eq!(view.total, 12);
        assert_eq!(view.revenue_label, "Rs. 10424.50");
    }

    #[test]
    fn admin_order_record_tolerates_missing_optional_fields() {
        let raw = serde_json::json!({
            "id": 3,
            "order_id": "ABCD1234",
            "customer_name": "Bilal",
            "items": [],
            "total_price": 0.0,
            "order_status": "pending",
        });
        let order: AdminOrderRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(order.tracking_status, "");
        assert_eq!(order.created_at, "");
    }

    #[test]
    fn status_modal_tracks_and_resets_the_target() {
        let state = AdminUiState::new();
        assert_eq!(selected_order(&state), None);

        let seed = open_status_modal(&state, 42, "A1B2C3D4", "pending");
        assert_eq!(selected_order(&state), Some(42));
        assert_eq!(seed["order_label"], "Order ID: A1B2C3D4");
        assert_eq!(seed["status"], "pending");

        close_status_modal(&state);
        assert_eq!(selected_order(&state), None);
    }
}
