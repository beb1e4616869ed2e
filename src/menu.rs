//! Menu loading and card view models.
//!
//! Fetches the public catalog from `/api/menu` (optionally filtered by
//! category), renders it into card view models for the webview, and keeps
//! the last successful payload per category in the local `menu_cache` table
//! so a restart can show the previous menu before the first fetch resolves.
//! A fetch failure is logged and returned as `Err`; the caller leaves the
//! current display alone (no retry, no error banner).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

use crate::api;
use crate::cart::price_label;
use crate::db::{self, DbState};

/// Placeholder image service used when an item has no usable image.
const PLACEHOLDER_IMAGE_BASE: &str = "https://via.placeholder.com/280x200?text=";

/// Characters kept verbatim by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One catalog entry as served by `GET /api/menu`. Server-owned, read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One rendered menu card. The add-to-cart action is bound to the
/// id/name/price captured here at render time; prices are not re-fetched
/// at click time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCardView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub price_label: String,
    pub image_url: String,
    pub fallback_image_url: String,
}

// ---------------------------------------------------------------------------
// Paths and placeholders
// ---------------------------------------------------------------------------

/// Placeholder image URL generated from the item name.
pub fn placeholder_image_url(name: &str) -> String {
    format!(
        "{PLACEHOLDER_IMAGE_BASE}{}",
        utf8_percent_encode(name, COMPONENT)
    )
}

/// Catalog request path for a category filter. `"all"` means unfiltered.
pub fn menu_path(category: &str) -> String {
    if category == "all" {
        "/api/menu".to_string()
    } else {
        format!(
            "/api/menu?category={}",
            utf8_percent_encode(category, COMPONENT)
        )
    }
}

/// Build card view models for a catalog page. Full replace of the menu
/// display each call.
pub fn render_menu_cards(items: &[MenuItem]) -> Vec<MenuCardView> {
    items
        .iter()
        .map(|item| {
            let fallback = placeholder_image_url(&item.name);
            MenuCardView {
                id: item.id,
                name: item.name.clone(),
                description: item.description.clone().unwrap_or_default(),
                price: item.price,
                price_label: price_label(item.price),
                image_url: item
                    .image_url
                    .clone()
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| fallback.clone()),
                fallback_image_url: fallback,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

fn cache_key(category: &str) -> String {
    format!("menu:{category}")
}

/// Read the cached catalog for a category. Returns an empty list on miss
/// or error.
pub fn cached_menu(db: &DbState, category: &str) -> Vec<MenuItem> {
    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            error!("menu cache lock failed: {e}");
            return vec![];
        }
    };

    let json_str: Option<String> = conn
        .query_row(
            "SELECT data FROM menu_cache WHERE cache_key = ?1",
            params![cache_key(category)],
            |row| row.get(0),
        )
        .ok();

    match json_str {
        Some(s) => match serde_json::from_str::<Vec<MenuItem>>(&s) {
            Ok(items) => items,
            Err(e) => {
                error!("menu_cache[{category}] JSON parse error: {e}");
                vec![]
            }
        },
        None => vec![],
    }
}

fn store_menu(db: &DbState, category: &str, items: &[MenuItem]) {
    let json = match serde_json::to_string(items) {
        Ok(json) => json,
        Err(e) => {
            warn!("menu cache serialization failed: {e}");
            return;
        }
    };

    let conn = match db.conn.lock() {
        Ok(c) => c,
        Err(e) => {
            warn!("menu cache lock failed: {e}");
            return;
        }
    };

    if let Err(e) = conn.execute(
        "INSERT INTO menu_cache (cache_key, data, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(cache_key) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at",
        params![cache_key(category), json],
    ) {
        warn!("menu cache upsert failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Fetch the catalog for a category from the site and refresh the local
/// cache. The returned items are in server order.
pub async fn load_menu(db: &DbState, category: &str) -> Result<Vec<MenuItem>, String> {
    let site_url = crate::site_base_url(db)?;
    let path = menu_path(category);
    trace!(category = %category, path = %path, "load_menu: requesting catalog");

    let resp = api::fetch_site(&site_url, &path, "GET", None, None).await?;

    let items: Vec<MenuItem> = serde_json::from_value(resp)
        .map_err(|e| format!("Invalid menu payload from the site: {e}"))?;

    store_menu(db, category, &items);
    trace!(category = %category, count = items.len(), "load_menu: catalog updated");
    Ok(items)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sample_items() -> Vec<MenuItem> {
        vec![
            MenuItem {
                id: 1,
                name: "Grilled Chicken Biryani".into(),
                category: Some("Main Courses".into()),
                description: Some("Fragrant basmati rice".into()),
                price: 450.0,
                image_url: Some("biryani.jpg".into()),
            },
            MenuItem {
                id: 2,
                name: "Gulab Jamun".into(),
                category: Some("Desserts".into()),
                description: None,
                price: 150.0,
                image_url: None,
            },
        ]
    }

    #[test]
    fn menu_path_encodes_category_filter() {
        assert_eq!(menu_path("all"), "/api/menu");
        assert_eq!(
            menu_path("Main Courses"),
            "/api/menu?category=Main%20Courses"
        );
        assert_eq!(menu_path("Desserts"), "/api/menu?category=Desserts");
    }

    #[test]
    fn placeholder_url_percent_encodes_the_name() {
        assert_eq!(
            placeholder_image_url("Butter Chicken"),
            "https://via.placeholder.com/280x200?text=Butter%20Chicken"
        );
        // encodeURIComponent keeps these verbatim
        assert_eq!(
            placeholder_image_url("Chai (hot!)"),
            "https://via.placeholder.com/280x200?text=Chai%20(hot!)"
        );
    }

    #[test]
    fn cards_fall_back_to_placeholder_images() {
        let cards = render_menu_cards(&sample_items());

        assert_eq!(cards[0].image_url, "biryani.jpg");
        assert_eq!(
            cards[0].fallback_image_url,
            placeholder_image_url("Grilled Chicken Biryani")
        );
        // No image_url: primary and fallback are the same placeholder
        assert_eq!(cards[1].image_url, cards[1].fallback_image_url);
        assert_eq!(cards[1].description, "");
        assert_eq!(cards[1].price_label, "Rs. 150.00");
    }

    #[test]
    fn cache_round_trips_per_category() {
        let db = db::test_state();
        let items = sample_items();

        store_menu(&db, "all", &items);
        store_menu(&db, "Desserts", &items[1..]);

        assert_eq!(cached_menu(&db, "all").len(), 2);
        assert_eq!(cached_menu(&db, "Desserts").len(), 1);
        assert!(cached_menu(&db, "Appetizers").is_empty());
    }

    #[test]
    fn corrupt_cache_reads_as_empty() {
        let db = db::test_state();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO menu_cache (cache_key, data) VALUES ('menu:all', 'garbage')",
                [],
            )
            .unwrap();
        }
        assert!(cached_menu(&db, "all").is_empty());
    }
}
