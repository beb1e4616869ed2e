use serde::Deserialize;

use crate::effects::{self, ElementRect, TiltOptions};
use crate::notify::{self, ToastKind};

#[derive(Debug, Deserialize)]
struct ToastPayload {
    message: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FadeInPayload {
    count: usize,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TiltPayload {
    x: f64,
    y: f64,
    rect: ElementRect,
    #[serde(default)]
    context: Option<String>,
    /// Mirrors the page's prefers-reduced-motion media query.
    #[serde(default, rename = "reducedMotion")]
    reduced_motion: bool,
}

fn toast_kind(kind: Option<&str>) -> ToastKind {
    match kind {
        Some("error") => ToastKind::Error,
        _ => ToastKind::Success,
    }
}

fn is_admin_context(context: Option<&str>) -> bool {
    matches!(context, Some("admin"))
}

#[tauri::command]
pub async fn notify_show_toast(
    arg0: Option<serde_json::Value>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = match arg0 {
        Some(serde_json::Value::String(message)) => serde_json::json!({ "message": message }),
        Some(v) => v,
        None => return Err("Missing toast payload".into()),
    };
    let parsed: ToastPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid toast payload: {e}"))?;

    let id = notify::show_toast(&app, &parsed.message, toast_kind(parsed.kind.as_deref()));
    Ok(serde_json::json!({ "id": id }))
}

/// Stagger schedule for the page's fade-in reveal, computed once per load.
#[tauri::command]
pub async fn ui_fade_in_plan(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing fade-in payload")?;
    let parsed: FadeInPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid fade-in payload: {e}"))?;

    let step = if is_admin_context(parsed.context.as_deref()) {
        effects::FADE_STEP_ADMIN_MS
    } else {
        effects::FADE_STEP_PUBLIC_MS
    };
    Ok(serde_json::json!({ "delays_ms": effects::fade_in_delays(parsed.count, step) }))
}

/// Pointer tilt transform for a hovered element. Null when reduced motion
/// is requested or the rect is degenerate; the element stays untransformed.
#[tauri::command]
pub async fn ui_tilt_transform(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing tilt payload")?;
    let parsed: TiltPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid tilt payload: {e}"))?;

    if parsed.reduced_motion {
        return Ok(serde_json::Value::Null);
    }

    let opts = if is_admin_context(parsed.context.as_deref()) {
        TiltOptions::ADMIN
    } else {
        TiltOptions::PUBLIC
    };

    match effects::tilt_transform(parsed.x, parsed.y, parsed.rect, opts) {
        Some(transform) => Ok(serde_json::json!({
            "css": transform.css(),
            "rotX": transform.rot_x,
            "rotY": transform.rot_y,
            "scale": transform.scale,
        })),
        None => Ok(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_kind_defaults_to_success() {
        assert_eq!(toast_kind(None), ToastKind::Success);
        assert_eq!(toast_kind(Some("success")), ToastKind::Success);
        assert_eq!(toast_kind(Some("error")), ToastKind::Error);
    }

    #[test]
    fn admin_context_detection() {
        assert!(is_admin_context(Some("admin")));
        assert!(!is_admin_context(Some("public")));
        assert!(!is_admin_context(None));
    }
}
