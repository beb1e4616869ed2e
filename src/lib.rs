#![recursion_limit = "256"]

//! Zaika Desk - Tauri v2 Backend
//!
//! This module registers the IPC command handlers the ordering UI calls via
//! `@tauri-apps/api/core::invoke()`. The backend owns the cart store, the
//! site API client, the admin dashboard sync loop, and all view-model
//! computation; the webview only applies rendered views and relays events.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod admin;
mod api;
mod cart;
mod checkout;
mod commands;
mod db;
mod diagnostics;
mod effects;
mod menu;
mod notify;
mod storage;

/// Cadence of the admin dashboard refresh (orders + stats), in seconds.
const ADMIN_REFRESH_INTERVAL_SECS: u64 = 30;

/// Read a single value from the `local_settings` table.
pub(crate) fn read_local_setting(db: &db::DbState, category: &str, key: &str) -> Option<String> {
    let conn = db.conn.lock().ok()?;
    db::get_setting(&conn, category, key).filter(|v| !v.trim().is_empty())
}

/// Resolve the site base URL: keyring first, then the `local_settings`
/// mirror for platforms without a usable secret service.
pub(crate) fn site_base_url(db: &db::DbState) -> Result<String, String> {
    storage::get_site_url()
        .or_else(|| read_local_setting(db, "connection", "site_url"))
        .map(|url| api::normalize_site_url(&url))
        .filter(|url| !url.is_empty())
        .ok_or_else(|| "Not connected: missing site URL".to_string())
}

/// Push the `local_settings` mirror of the site URL into the keyring when
/// the keyring entry is missing (fresh keyring after an OS reinstall).
fn hydrate_site_settings_from_local(db: &db::DbState) {
    if storage::get_site_url().is_some() {
        return;
    }
    if let Some(url) = read_local_setting(db, "connection", "site_url") {
        let _ = storage::set_site_url(url.trim());
        info!("hydrated site URL from local settings mirror");
    }
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zaika_desk_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    // Rolling file appender: creates daily log files in the logs directory
    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "zaika");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app — dropping it flushes
    // logs. We leak it intentionally since the app runs until process exit.
    std::mem::forget(_guard);

    info!("Starting Zaika Desk v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use std::sync::Arc;
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            // Main DB connection for Tauri commands
            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");
            hydrate_site_settings_from_local(&db_state);

            // Cart mirror, hydrated once per app run from the persisted slot
            let cart_state = cart::CartState::hydrate(&db_state);
            app.manage(db_state);
            app.manage(cart_state);

            // Admin dashboard state (modal target + last rendered snapshot)
            let admin_state = Arc::new(admin::AdminUiState::new());
            app.manage(admin_state.clone());

            // Second DB connection for the background refresh loop
            let db_for_admin =
                Arc::new(db::init(&app_data_dir).expect("Failed to init admin database"));

            // Start background admin refresh loop (30s interval)
            admin::start_admin_refresh_loop(
                app.handle().clone(),
                db_for_admin,
                admin_state,
                ADMIN_REFRESH_INTERVAL_SECS,
            );

            info!("Database, cart store, and admin refresh loop registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App lifecycle
            commands::runtime::app_get_version,
            commands::runtime::system_get_info,
            commands::runtime::system_open_external_url,
            commands::runtime::diagnostics_get_about,
            // Cart
            commands::cart::cart_get_items,
            commands::cart::cart_get_view,
            commands::cart::cart_get_count,
            commands::cart::cart_add_item,
            commands::cart::cart_update_quantity,
            commands::cart::cart_remove_item,
            commands::cart::cart_clear,
            // Menu
            commands::menu::menu_load,
            commands::menu::menu_get_cached,
            // Checkout
            commands::checkout::checkout_begin,
            commands::checkout::checkout_get_summary,
            commands::checkout::checkout_submit_order,
            commands::checkout::order_get_by_id,
            commands::checkout::order_get_recent,
            // Admin dashboard
            commands::admin::admin_load_orders,
            commands::admin::admin_load_stats,
            commands::admin::admin_refresh,
            commands::admin::admin_search_orders,
            commands::admin::admin_open_status_modal,
            commands::admin::admin_close_status_modal,
            commands::admin::admin_update_order_status,
            // Settings
            commands::settings::settings_is_configured,
            commands::settings::settings_get_full_config,
            commands::settings::settings_get_site_url,
            commands::settings::settings_set_site_url,
            commands::settings::settings_set_admin_session,
            commands::settings::settings_clear_admin_session,
            commands::settings::settings_clear_connection,
            commands::settings::settings_test_connection,
            // Notifications / presentation
            commands::system_ui::notify_show_toast,
            commands::system_ui::ui_fade_in_plan,
            commands::system_ui::ui_tilt_transform,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Zaika Desk");
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_base_url_falls_back_to_the_local_mirror() {
        let db_state = db::test_state();
        {
            let conn = db_state.conn.lock().unwrap();
            db::set_setting(&conn, "connection", "site_url", "http://localhost:5000").unwrap();
        }

        // The keyring may or may not hold a URL on the test machine; the
        // resolved value must be a normalized non-empty URL either way.
        let url = site_base_url(&db_state).unwrap();
        assert!(url.starts_with("http"));
        assert!(!url.ends_with('/'));
    }

    #[test]
    fn read_local_setting_skips_blank_values() {
        let db_state = db::test_state();
        {
            let conn = db_state.conn.lock().unwrap();
            db::set_setting(&conn, "connection", "site_url", "   ").unwrap();
        }
        assert!(read_local_setting(&db_state, "connection", "site_url").is_none());
    }
}
