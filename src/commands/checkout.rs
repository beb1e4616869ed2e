use tauri::Emitter;
use tracing::{info, warn};

use crate::cart::CartState;
use crate::checkout::{self, CustomerDetails};
use crate::db::DbState;
use crate::notify::{self, ToastKind};

/// Alert shown on transport failure, matching the site's copy.
const SUBMIT_FAILURE_ALERT: &str = "Error placing order. Please try again.";

fn parse_customer_details(arg0: Option<serde_json::Value>) -> Result<CustomerDetails, String> {
    let payload = arg0.ok_or("Missing checkout payload")?;

    // Accept either the full order shape ({ customerDetails: {...} }) or
    // the bare customer fields.
    let details = payload
        .get("customerDetails")
        .or_else(|| payload.get("customer_details"))
        .cloned()
        .unwrap_or(payload);

    serde_json::from_value(details).map_err(|e| format!("Invalid customer details: {e}"))
}

/// Gate on the checkout route: an empty cart blocks navigation with a
/// synchronous alert, a non-empty one hands back the redirect target.
#[tauri::command]
pub async fn checkout_begin(
    cart: tauri::State<'_, CartState>,
) -> Result<serde_json::Value, String> {
    if cart.snapshot().is_empty() {
        return Err(checkout::EMPTY_CART_ALERT.to_string());
    }
    Ok(serde_json::json!({ "redirect": "/checkout" }))
}

#[tauri::command]
pub async fn checkout_get_summary(
    cart: tauri::State<'_, CartState>,
) -> Result<serde_json::Value, String> {
    let summary = crate::cart::render_order_summary(&cart.snapshot());
    serde_json::to_value(summary).map_err(|e| e.to_string())
}

/// Submit the current cart as an order.
///
/// Empty cart and transport failures come back as `Err` for a synchronous
/// alert; a server-side rejection comes back as `{success: false}` with an
/// error toast already fired. The cart survives every failure path.
#[tauri::command]
pub async fn checkout_submit_order(
    arg0: Option<serde_json::Value>,
    cart: tauri::State<'_, CartState>,
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let details = parse_customer_details(arg0)?;

    match checkout::submit_order(&cart, &db, details).await {
        Ok(outcome) => {
            let success = outcome
                .get("success")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);

            if success {
                let _ = app.emit("cart_updated", serde_json::json!({ "count": 0, "total": 0.0 }));
                let _ = app.emit("order_placed", &outcome);
                info!(
                    order_id = outcome.get("order_id").and_then(|v| v.as_str()).unwrap_or(""),
                    "checkout_submit_order: order placed"
                );
            } else {
                let message = outcome
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("Unknown error");
                notify::show_toast(
                    &app,
                    &format!("Error placing order: {message}"),
                    ToastKind::Error,
                );
            }
            Ok(outcome)
        }
        Err(e) if e == checkout::EMPTY_CART_ALERT => {
            // Blocked client-side; no request was sent.
            Err(e)
        }
        Err(e) => {
            warn!("checkout_submit_order failed: {e}");
            notify::show_toast(&app, SUBMIT_FAILURE_ALERT, ToastKind::Error);
            Err(e)
        }
    }
}

#[tauri::command]
pub async fn order_get_by_id(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let order_id = match arg0 {
        Some(serde_json::Value::String(id)) => id,
        Some(v) => v
            .get("orderId")
            .or_else(|| v.get("order_id"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| "Missing orderId".to_string())?,
        None => return Err("Missing orderId".into()),
    };
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err("Missing orderId".into());
    }
    checkout::fetch_order(&db, order_id).await
}

#[tauri::command]
pub async fn order_get_recent(
    db: tauri::State<'_, DbState>,
) -> Result<Vec<serde_json::Value>, String> {
    Ok(checkout::recent_orders(&db, 20))
}
