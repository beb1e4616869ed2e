//! Client-side cart store and mutation API.
//!
//! The cart is a flat ordered list of line items, unique by menu item id.
//! It lives in two places that are written together on every mutation: an
//! in-memory mirror (`CartState`, Tauri-managed) and one persisted slot in
//! `local_settings` (category 'cart', key 'items'). Loading fails soft —
//! an absent or malformed slot is an empty cart, never an error — and a
//! failed write leaves the previous persisted state untouched.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, warn};

use crate::db::{self, DbState};

/// Settings slot holding the serialized cart.
const CART_CATEGORY: &str = "cart";
const CART_KEY: &str = "items";

/// Placeholder copy for empty cart views.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";
pub const EMPTY_SUMMARY_MESSAGE: &str = "No items in cart";

/// One cart entry: a menu item id with its name/price snapshotted at the
/// time it was added, plus a quantity that stays >= 1 while present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

/// Tauri managed state holding the in-memory cart mirror.
///
/// Hydrated once from the persisted slot at startup; every mutation goes
/// through the functions below, which re-serialize the mirror back into
/// the slot. There is no cross-instance change listener: two app instances
/// can diverge silently (documented non-goal).
pub struct CartState {
    items: Mutex<Vec<CartLineItem>>,
}

impl CartState {
    /// Hydrate the mirror from the persisted slot.
    pub fn hydrate(db: &DbState) -> Self {
        Self {
            items: Mutex::new(load_cart(db)),
        }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Clone of the current line items, in insertion order.
    pub fn snapshot(&self) -> Vec<CartLineItem> {
        self.items.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Read the persisted cart. Absent or malformed data yields an empty cart.
pub fn load_cart(db: &DbState) -> Vec<CartLineItem> {
    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            error!("cart slot lock failed: {e}");
            return vec![];
        }
    };

    let raw = match db::get_setting(&conn, CART_CATEGORY, CART_KEY) {
        Some(raw) => raw,
        None => return vec![],
    };

    match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!("persisted cart is malformed, starting empty: {e}");
            vec![]
        }
    }
}

/// Serialize and write the cart slot. Failures are swallowed with a warning;
/// the previous persisted state stays in place.
fn persist_cart(db: &DbState, items: &[CartLineItem]) {
    let json = match serde_json::to_string(items) {
        Ok(json) => json,
        Err(e) => {
            warn!("cart serialization failed, keeping previous persisted state: {e}");
            return;
        }
    };

    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            warn!("cart slot lock failed, keeping previous persisted state: {e}");
            return;
        }
    };

    if let Err(e) = db::set_setting(&conn, CART_CATEGORY, CART_KEY, &json) {
        warn!("cart write failed, keeping previous persisted state: {e}");
    }
}

/// Remove the persisted slot entirely (successful checkout).
fn clear_persisted(db: &DbState) {
    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            warn!("cart slot lock failed during clear: {e}");
            return;
        }
    };
    if let Err(e) = db::delete_setting(&conn, CART_CATEGORY, CART_KEY) {
        warn!("cart clear failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Badge payload returned by every mutation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartSummary {
    pub count: i64,
    pub total: f64,
}

fn summary_of(items: &[CartLineItem]) -> CartSummary {
    CartSummary {
        count: item_count(items),
        total: cart_total(items),
    }
}

/// Add one unit of a menu item. An existing line item increments its
/// quantity; otherwise a new line item is appended with quantity 1.
pub fn add_item(cart: &CartState, db: &DbState, id: i64, name: &str, price: f64) -> CartSummary {
    let mut items = cart.items.lock().unwrap();

    match items.iter_mut().find(|item| item.id == id) {
        Some(existing) => existing.quantity += 1,
        None => items.push(CartLineItem {
            id,
            name: name.to_string(),
            price,
            quantity: 1,
        }),
    }

    persist_cart(db, &items);
    summary_of(&items)
}

/// Apply a quantity delta to a line item. A resulting quantity <= 0 removes
/// the item entirely; an unknown id is a no-op.
pub fn update_quantity(cart: &CartState, db: &DbState, id: i64, delta: i64) -> CartSummary {
    let mut items = cart.items.lock().unwrap();

    let Some(item) = items.iter_mut().find(|item| item.id == id) else {
        return summary_of(&items);
    };

    item.quantity += delta;
    if item.quantity <= 0 {
        items.retain(|item| item.id != id);
    }

    persist_cart(db, &items);
    summary_of(&items)
}

/// Remove a line item by id. An unknown id is a no-op.
pub fn remove_item(cart: &CartState, db: &DbState, id: i64) -> CartSummary {
    let mut items = cart.items.lock().unwrap();

    let before = items.len();
    items.retain(|item| item.id != id);
    if items.len() == before {
        return summary_of(&items);
    }

    persist_cart(db, &items);
    summary_of(&items)
}

/// Empty the mirror and delete the persisted slot.
pub fn clear(cart: &CartState, db: &DbState) -> CartSummary {
    let mut items = cart.items.lock().unwrap();
    items.clear();
    clear_persisted(db);
    summary_of(&items)
}

// ---------------------------------------------------------------------------
// Totals and formatting
// ---------------------------------------------------------------------------

/// Total unit count across all line items (the cart badge).
pub fn item_count(items: &[CartLineItem]) -> i64 {
    items.iter().map(|item| item.quantity).sum()
}

/// Sum of price * quantity over the cart.
pub fn cart_total(items: &[CartLineItem]) -> f64 {
    items
        .iter()
        .map(|item| item.price * item.quantity as f64)
        .sum()
}

/// Two-decimal amount string, e.g. "500.00".
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Amount with the site's currency prefix, e.g. "Rs. 500.00".
pub fn price_label(amount: f64) -> String {
    format!("Rs. {amount:.2}")
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

/// One rendered cart row (popup cart context).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price_label: String,
    pub line_total_label: String,
}

/// Full-replace view of the popup cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub empty: bool,
    pub empty_message: Option<String>,
    pub count: i64,
    pub total: String,
}

/// Recompute the popup cart view from the live cart. Full replace each
/// time; cart sizes are small.
pub fn render_cart_view(items: &[CartLineItem]) -> CartView {
    let lines: Vec<CartLineView> = items
        .iter()
        .map(|item| CartLineView {
            id: item.id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price_label: price_label(item.price),
            line_total_label: price_label(item.price * item.quantity as f64),
        })
        .collect();

    CartView {
        empty: lines.is_empty(),
        empty_message: lines.is_empty().then(|| EMPTY_CART_MESSAGE.to_string()),
        count: item_count(items),
        total: format_amount(cart_total(items)),
        lines,
    }
}

/// One rendered summary row (checkout context), e.g. "Burger x 2".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLineView {
    pub label: String,
    pub amount_label: String,
}

/// Full-replace view of the checkout order summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryView {
    pub lines: Vec<SummaryLineView>,
    pub empty: bool,
    pub empty_message: Option<String>,
    pub total: String,
}

/// Recompute the checkout summary from the live cart.
pub fn render_order_summary(items: &[CartLineItem]) -> OrderSummaryView {
    let lines: Vec<SummaryLineView> = items
        .iter()
        .map(|item| SummaryLineView {
            label: format!("{} x {}", item.name, item.quantity),
            amount_label: price_label(item.price * item.quantity as f64),
        })
        .collect();

    OrderSummaryView {
        empty: lines.is_empty(),
        empty_message: lines.is_empty().then(|| EMPTY_SUMMARY_MESSAGE.to_string()),
        total: format_amount(cart_total(items)),
        lines,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
