use serde::Deserialize;
use tracing::{info, warn};

use crate::db::DbState;
use crate::menu;

#[derive(Debug, Deserialize)]
struct MenuLoadPayload {
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    "all".to_string()
}

fn parse_menu_payload(arg0: Option<serde_json::Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(serde_json::Value::String(category)) => serde_json::json!({ "category": category }),
        Some(serde_json::Value::Object(obj)) => serde_json::Value::Object(obj),
        Some(v) => v,
        None => serde_json::json!({}),
    };

    let parsed: MenuLoadPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid menu payload: {e}"))?;
    let category = parsed.category.trim().to_string();
    if category.is_empty() {
        return Ok(default_category());
    }
    Ok(category)
}

/// Fetch the catalog and return rendered cards. On failure the error is
/// logged and returned; the webview leaves its current menu display alone.
#[tauri::command]
pub async fn menu_load(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let category = parse_menu_payload(arg0)?;

    match menu::load_menu(&db, &category).await {
        Ok(items) => {
            let cards = menu::render_menu_cards(&items);
            info!(category = %category, count = cards.len(), "menu_load");
            serde_json::to_value(cards).map_err(|e| e.to_string())
        }
        Err(e) => {
            warn!(category = %category, error = %e, "menu_load failed, keeping previous display");
            Err(e)
        }
    }
}

/// Render the last cached catalog for a category, for first paint before
/// the initial fetch resolves.
#[tauri::command]
pub async fn menu_get_cached(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, DbState>,
) -> Result<serde_json::Value, String> {
    let category = parse_menu_payload(arg0)?;
    let cards = menu::render_menu_cards(&menu::cached_menu(&db, &category));
    info!(category = %category, count = cards.len(), "menu_get_cached");
    serde_json::to_value(cards).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_to_all() {
        assert_eq!(parse_menu_payload(None).unwrap(), "all");
        assert_eq!(
            parse_menu_payload(Some(serde_json::json!({}))).unwrap(),
            "all"
        );
        assert_eq!(
            parse_menu_payload(Some(serde_json::json!({ "category": " " }))).unwrap(),
            "all"
        );
    }

    #[test]
    fn payload_accepts_a_bare_category_string() {
        assert_eq!(
            parse_menu_payload(Some(serde_json::json!("Desserts"))).unwrap(),
            "Desserts"
        );
    }
}
