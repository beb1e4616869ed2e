use serde::Deserialize;
use tauri::Emitter;
use tracing::info;

use crate::cart::{self, CartState};
use crate::db::DbState;
use crate::notify::{self, ToastKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartAddPayload {
    #[serde(alias = "item_id", alias = "itemId")]
    id: i64,
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartQuantityPayload {
    #[serde(alias = "item_id", alias = "itemId")]
    id: i64,
    #[serde(alias = "change")]
    delta: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemIdPayload {
    #[serde(alias = "item_id", alias = "itemId")]
    id: i64,
}

fn parse_add_payload(arg0: Option<serde_json::Value>) -> Result<CartAddPayload, String> {
    let payload = arg0.ok_or("Missing cart item payload")?;
    let parsed: CartAddPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid cart item payload: {e}"))?;
    if parsed.name.trim().is_empty() {
        return Err("Missing item name".into());
    }
    Ok(parsed)
}

fn parse_quantity_payload(arg0: Option<serde_json::Value>) -> Result<CartQuantityPayload, String> {
    let payload = arg0.ok_or("Missing quantity payload")?;
    serde_json::from_value(payload).map_err(|e| format!("Invalid quantity payload: {e}"))
}

fn parse_item_id_payload(arg0: Option<serde_json::Value>) -> Result<i64, String> {
    let payload = match arg0 {
        Some(serde_json::Value::Number(n)) => serde_json::json!({ "id": n }),
        Some(v) => v,
        None => return Err("Missing item id".into()),
    };
    let parsed: CartItemIdPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid item id payload: {e}"))?;
    Ok(parsed.id)
}

fn emit_cart_updated(app: &tauri::AppHandle, summary: cart::CartSummary) {
    let _ = app.emit("cart_updated", &summary);
}

#[tauri::command]
pub async fn cart_get_items(
    cart: tauri::State<'_, CartState>,
) -> Result<Vec<cart::CartLineItem>, String> {
    Ok(cart.snapshot())
}

#[tauri::command]
pub async fn cart_get_view(
    cart: tauri::State<'_, CartState>,
) -> Result<serde_json::Value, String> {
    let view = cart::render_cart_view(&cart.snapshot());
    serde_json::to_value(view).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cart_get_count(
    cart: tauri::State<'_, CartState>,
) -> Result<serde_json::Value, String> {
    let count = cart::item_count(&cart.snapshot());
    Ok(serde_json::json!({ "count": count }))
}

#[tauri::command]
pub async fn cart_add_item(
    arg0: Option<serde_json::Value>,
    cart: tauri::State<'_, CartState>,
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = parse_add_payload(arg0)?;
    let summary = cart::add_item(&cart, &db, payload.id, &payload.name, payload.price);

    emit_cart_updated(&app, summary);
    notify::show_toast(
        &app,
        &format!("{} added to cart!", payload.name),
        ToastKind::Success,
    );

    info!(id = payload.id, count = summary.count, "cart_add_item");
    serde_json::to_value(summary).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cart_update_quantity(
    arg0: Option<serde_json::Value>,
    cart: tauri::State<'_, CartState>,
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = parse_quantity_payload(arg0)?;
    let summary = cart::update_quantity(&cart, &db, payload.id, payload.delta);

    emit_cart_updated(&app, summary);

    // The popup cart re-renders in place after a quantity change.
    let view = cart::render_cart_view(&cart.snapshot());
    info!(
        id = payload.id,
        delta = payload.delta,
        count = summary.count,
        "cart_update_quantity"
    );
    serde_json::to_value(view).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cart_remove_item(
    arg0: Option<serde_json::Value>,
    cart: tauri::State<'_, CartState>,
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let id = parse_item_id_payload(arg0)?;
    let summary = cart::remove_item(&cart, &db, id);

    emit_cart_updated(&app, summary);

    let view = cart::render_cart_view(&cart.snapshot());
    info!(id, count = summary.count, "cart_remove_item");
    serde_json::to_value(view).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cart_clear(
    cart: tauri::State<'_, CartState>,
    db: tauri::State<'_, DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let summary = cart::clear(&cart, &db);
    emit_cart_updated(&app, summary);
    info!("cart_clear");
    serde_json::to_value(summary).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_payload_accepts_camel_and_snake_ids() {
        let parsed =
            parse_add_payload(Some(serde_json::json!({ "id": 1, "name": "Burger", "price": 250.0 })))
                .unwrap();
        assert_eq!(parsed.id, 1);

        let parsed = parse_add_payload(Some(
            serde_json::json!({ "itemId": 2, "name": "Samosas", "price": 120.0 }),
        ))
        .unwrap();
        assert_eq!(parsed.id, 2);
    }

    #[test]
    fn add_payload_rejects_blank_names() {
        let err = parse_add_payload(Some(
            serde_json::json!({ "id": 1, "name": "  ", "price": 1.0 }),
        ))
        .unwrap_err();
        assert_eq!(err, "Missing item name");
    }

    #[test]
    fn quantity_payload_accepts_change_alias() {
        let parsed =
            parse_quantity_payload(Some(serde_json::json!({ "id": 1, "change": -1 }))).unwrap();
        assert_eq!(parsed.delta, -1);
    }

    #[test]
    fn item_id_payload_accepts_a_bare_number() {
        assert_eq!(parse_item_id_payload(Some(serde_json::json!(7))).unwrap(), 7);
        assert_eq!(
            parse_item_id_payload(Some(serde_json::json!({ "id": 9 }))).unwrap(),
            9
        );
    }
}
