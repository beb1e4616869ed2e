//! Connection settings storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. The site base URL is not secret but
//! lives next to the admin session cookie so both survive reinstalls of the
//! local database.

use keyring::Entry;
use serde_json::Value;
use tracing::{info, warn};

const SERVICE_NAME: &str = "zaika-desk";

// Credential keys
const KEY_SITE_URL: &str = "site_url";
const KEY_ADMIN_SESSION: &str = "admin_session";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_SITE_URL, KEY_ADMIN_SESSION];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The client is considered configured once the site base URL is stored.
/// The admin session is optional: the public menu/cart/checkout flow works
/// without it.
pub fn is_configured() -> bool {
    get_credential(KEY_SITE_URL)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// Stored site base URL, if any.
pub fn get_site_url() -> Option<String> {
    get_credential(KEY_SITE_URL).filter(|v| !v.trim().is_empty())
}

/// Store the (already normalized) site base URL.
pub fn set_site_url(url: &str) -> Result<(), String> {
    set_credential(KEY_SITE_URL, url.trim())
}

/// Stored admin session cookie value, if any.
pub fn get_admin_session() -> Option<String> {
    get_credential(KEY_ADMIN_SESSION).filter(|v| !v.trim().is_empty())
}

/// Store the admin session cookie captured after a dashboard login.
pub fn set_admin_session(token: &str) -> Result<(), String> {
    set_credential(KEY_ADMIN_SESSION, token.trim())
}

/// Drop the admin session without touching the site URL. Called when the
/// server answers an admin request with 401.
pub fn clear_admin_session() -> Result<(), String> {
    delete_credential(KEY_ADMIN_SESSION)
}

/// Return all stored connection config as a JSON value that matches the
/// shape the frontend expects.
pub fn get_full_config() -> Value {
    serde_json::json!({
        "site_url": get_site_url(),
        "has_admin_session": get_admin_session().is_some(),
    })
}

/// Delete every stored credential (disconnect from the site).
pub fn clear_connection() -> Result<Value, String> {
    info!("clearing connection – deleting all credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(serde_json::json!({ "success": true }))
}
