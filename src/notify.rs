//! Transient toast notifications.
//!
//! A toast is enqueue-and-auto-dismiss: `toast_show` fires immediately,
//! `toast_exit` after the fixed visible duration (the exit transition cue),
//! and `toast_remove` 300 ms later. Multiple toasts can be live at once,
//! stacked by layout order; there is no explicit queue or max-count cap
//! (documented limitation). Toasts hold no application state and stay off
//! the critical path of functional flows.

use serde::Serialize;
use std::time::Duration;
use tauri::{AppHandle, Emitter};
use uuid::Uuid;

/// Visible duration before the exit transition starts.
const SUCCESS_VISIBLE_MS: u64 = 2_000;
const ERROR_VISIBLE_MS: u64 = 3_000;

/// Exit transition length before DOM removal.
const EXIT_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn visible_ms(self) -> u64 {
        match self {
            ToastKind::Success => SUCCESS_VISIBLE_MS,
            ToastKind::Error => ERROR_VISIBLE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub kind: ToastKind,
}

/// Show a toast and schedule its dismissal. Returns the toast id.
pub fn show_toast(app: &AppHandle, message: &str, kind: ToastKind) -> String {
    let toast = Toast {
        id: Uuid::new_v4().to_string(),
        message: message.to_string(),
        kind,
    };
    let id = toast.id.clone();

    let _ = app.emit("toast_show", &toast);

    let app = app.clone();
    let dismiss_id = id.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(Duration::from_millis(kind.visible_ms())).await;
        let _ = app.emit("toast_exit", serde_json::json!({ "id": dismiss_id }));
        tokio::time::sleep(Duration::from_millis(EXIT_MS)).await;
        let _ = app.emit("toast_remove", serde_json::json!({ "id": dismiss_id }));
    });

    id
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_toasts_stay_visible_longer() {
        assert_eq!(ToastKind::Success.visible_ms(), 2_000);
        assert_eq!(ToastKind::Error.visible_ms(), 3_000);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ToastKind::Success).unwrap(),
            serde_json::json!("success")
        );
        assert_eq!(
            serde_json::to_value(ToastKind::Error).unwrap(),
            serde_json::json!("error")
        );
    }
}
