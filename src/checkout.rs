//! Checkout flow: order construction, submission, and the local
//! placed-order log.
//!
//! The order total is recomputed from the live cart at submission time,
//! never trusted from a cached value. An empty cart is blocked before any
//! request leaves the client. The persisted cart is cleared only after the
//! server confirms the order; a business or transport failure leaves it
//! intact so a retry can resubmit without data loss.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::api;
use crate::cart::{self, CartLineItem, CartState};
use crate::db::DbState;

/// Alert shown when checkout is attempted with an empty cart.
pub const EMPTY_CART_ALERT: &str = "Your cart is empty!";

/// Fallback message when the server rejects an order without detail.
const GENERIC_ORDER_FAILURE: &str = "Unknown error";

/// Customer contact fields collected from the checkout form. Presence is
/// implied by the form's required attributes; no format validation here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub notes: String,
}

/// Wire payload for `POST /api/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer_details: CustomerDetails,
    pub items: Vec<CartLineItem>,
    pub total_price: f64,
}

/// Build the order payload from a cart snapshot, guarding the empty cart.
pub fn build_order(
    details: CustomerDetails,
    items: Vec<CartLineItem>,
) -> Result<OrderRequest, String> {
    if items.is_empty() {
        return Err(EMPTY_CART_ALERT.to_string());
    }
    let total_price = cart::cart_total(&items);
    Ok(OrderRequest {
        customer_details: details,
        items,
        total_price,
    })
}

/// Confirmation route carrying the server-assigned order id.
pub fn success_redirect(order_id: &str) -> String {
    format!(
        "/success?order_id={}",
        utf8_percent_encode(order_id, NON_ALPHANUMERIC)
    )
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Apply the server's order response: on `{success: true}` clear the cart,
/// log the placed order, and hand back the confirmation redirect; on
/// `{success: false}` surface the server message and leave the cart alone.
pub fn apply_order_response(cart: &CartState, db: &DbState, resp: &Value) -> Value {
    let success = resp.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        let message = resp
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(GENERIC_ORDER_FAILURE);
        return serde_json::json!({
            "success": false,
            "message": message,
        });
    }

    let order_id = resp
        .get("order_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let items = cart.snapshot();
    record_placed_order(
        db,
        &order_id,
        cart::cart_total(&items),
        cart::item_count(&items),
    );
    cart::clear(cart, db);

    info!(order_id = %order_id, "order placed, cart cleared");
    serde_json::json!({
        "success": true,
        "order_id": order_id,
        "redirect": success_redirect(&order_id),
    })
}

/// Submit the current cart as an order.
///
/// Empty cart: blocked synchronously, no request is sent and the store is
/// untouched. Transport failure: `Err`, cart intact. `{success: false}`:
/// `Ok` with the server message, cart intact.
pub async fn submit_order(
    cart: &CartState,
    db: &DbState,
    details: CustomerDetails,
) -> Result<Value, String> {
    let order = build_order(details, cart.snapshot())?;

    let site_url = crate::site_base_url(db)?;
    let payload =
        serde_json::to_value(&order).map_err(|e| format!("serialize order payload: {e}"))?;

    let resp = api::fetch_site(&site_url, "/api/orders", "POST", Some(payload), None).await?;
    Ok(apply_order_response(cart, db, &resp))
}

/// Fetch a single order from the site (confirmation view).
pub async fn fetch_order(db: &DbState, order_id: &str) -> Result<Value, String> {
    let site_url = crate::site_base_url(db)?;
    let path = format!(
        "/api/orders/{}",
        utf8_percent_encode(order_id, NON_ALPHANUMERIC)
    );
    api::fetch_site(&site_url, &path, "GET", None, None).await
}

// ---------------------------------------------------------------------------
// Placed-order log
// ---------------------------------------------------------------------------

fn record_placed_order(db: &DbState, order_id: &str, total_price: f64, item_count: i64) {
    if order_id.is_empty() {
        return;
    }
    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            warn!("placed_orders lock failed: {e}");
            return;
        }
    };
    if let Err(e) = conn.execute(
        "INSERT OR IGNORE INTO placed_orders (order_id, total_price, item_count)
         VALUES (?1, ?2, ?3)",
        params![order_id, total_price, item_count],
    ) {
        warn!("placed_orders insert failed: {e}");
    }
}

/// Most recent locally placed orders, newest first.
pub fn recent_orders(db: &DbState, limit: i64) -> Vec<Value> {
    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            warn!("placed_orders lock failed: {e}");
            return vec![];
        }
    };

    let mut stmt = match conn.prepare(
        "SELECT order_id, total_price, item_count, created_at
         FROM placed_orders ORDER BY id DESC LIMIT ?1",
    ) {
        Ok(s) => s,
        Err(e) => {
            warn!("placed_orders prepare failed: {e}");
            return vec![];
        }
    };

    let rows = stmt.query_map(params![limit], |row| {
        Ok(serde_json::json!({
            "order_id": row.get::<_, String>(0)?,
            "total_price": row.get::<_, f64>(1)?,
            "item_count": row.get::<_, i64>(2)?,
            "created_at": row.get::<_, String>(3)?,
        }))
    });

    match rows {
        Ok(rows) => rows.flatten().collect(),
        Err(e) => {
            warn!("placed_orders query failed: {e}");
            vec![]
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn details() -> CustomerDetails {
        CustomerDetails {
            name: "Ayesha Khan".into(),
            email: "ayesha@example.com".into(),
            phone: "0300-1234567".into(),
            address: "12 Mall Road".into(),
            city: "Lahore".into(),
            notes: String::new(),
        }
    }

    fn burger(quantity: i64) -> CartLineItem {
        CartLineItem {
            id: 1,
            name: "Burger".into(),
            price: 250.0,
            quantity,
        }
    }

    #[test]
    fn empty_cart_is_blocked_before_any_request() {
        let err = build_order(details(), vec![]).unwrap_err();
        assert_eq!(err, EMPTY_CART_ALERT);
    }

    #[test]
    fn total_is_recomputed_from_the_items() {
        let order = build_order(details(), vec![burger(2)]).unwrap();
        assert_eq!(order.total_price, 500.0);
    }

    #[test]
    fn wire_payload_uses_the_site_field_names() {
        let order = build_order(details(), vec![burger(2)]).unwrap();
        let wire = serde_json::to_value(&order).unwrap();

        assert!(wire.get("customerDetails").is_some());
        assert!(wire.get("totalPrice").is_some());
        assert_eq!(wire["items"][0]["quantity"], 2);
        assert_eq!(wire["customerDetails"]["city"], "Lahore");
    }

    #[test]
    fn success_response_clears_cart_and_builds_redirect() {
        let db = db::test_state();
        let cart = CartState::hydrate(&db);
        cart::add_item(&cart, &db, 1, "Burger", 250.0);

        let resp = serde_json::json!({ "success": true, "order_id": "A1B2C3D4" });
        let outcome = apply_order_response(&cart, &db, &resp);

        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["redirect"], "/success?order_id=A1B2C3D4");
        assert!(cart.snapshot().is_empty());
        // Persisted slot cleared too: a fresh load sees an empty cart.
        assert!(cart::load_cart(&db).is_empty());
        // And the placed order was logged.
        let placed = recent_orders(&db, 10);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0]["order_id"], "A1B2C3D4");
        assert_eq!(placed[0]["total_price"], 250.0);
    }

    #[test]
    fn failure_response_keeps_the_cart_for_retry() {
        let db = db::test_state();
        let cart = CartState::hydrate(&db);
        cart::add_item(&cart, &db, 1, "Burger", 250.0);

        let resp = serde_json::json!({ "success": false, "message": "Kitchen closed" });
        let outcome = apply_order_response(&cart, &db, &resp);

        assert_eq!(outcome["success"], false);
        assert_eq!(outcome["message"], "Kitchen closed");
        assert_eq!(cart.snapshot().len(), 1);
        assert_eq!(cart::load_cart(&db).len(), 1);
    }

    #[test]
    fn failure_without_message_gets_the_generic_fallback() {
        let db = db::test_state();
        let cart = CartState::hydrate(&db);

        let resp = serde_json::json!({ "success": false });
        let outcome = apply_order_response(&cart, &db, &resp);
        assert_eq!(outcome["message"], GENERIC_ORDER_FAILURE);
    }

    #[test]
    fn recent_orders_lists_newest_first() {
        let db = db::test_state();
        record_placed_order(&db, "FIRST", 100.0, 1);
        record_placed_order(&db, "SECOND", 200.0, 2);

        let placed = recent_orders(&db, 10);
        assert_eq!(placed[0]["order_id"], "SECOND");
        assert_eq!(placed[1]["order_id"], "FIRST");
    }
}
