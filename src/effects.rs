//! Stateless presentation effects: fade-in stagger and pointer tilt.
//!
//! Both are read-only visual embellishments computed here so the webview
//! applies precomputed values instead of interpolating handler code into
//! markup. They hold no application state and are never on the critical
//! path of functional flows.

use serde::{Deserialize, Serialize};

/// Base delay before the first element fades in.
const FADE_BASE_MS: u64 = 50;

/// Per-element stagger step on public pages.
pub const FADE_STEP_PUBLIC_MS: u64 = 60;
/// Per-element stagger step on the admin dashboard.
pub const FADE_STEP_ADMIN_MS: u64 = 50;

/// Fade-in delays for `count` elements: 50 + i*step milliseconds, so
/// content comes in sequence.
pub fn fade_in_delays(count: usize, step_ms: u64) -> Vec<u64> {
    (0..count as u64).map(|i| FADE_BASE_MS + i * step_ms).collect()
}

// ---------------------------------------------------------------------------
// Tilt
// ---------------------------------------------------------------------------

/// Tilt intensity. Public cards use the stronger preset, admin widgets the
/// subtler one.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TiltOptions {
    pub max_deg: f64,
    pub scale: f64,
}

impl TiltOptions {
    pub const PUBLIC: TiltOptions = TiltOptions {
        max_deg: 12.0,
        scale: 1.02,
    };
    pub const ADMIN: TiltOptions = TiltOptions {
        max_deg: 10.0,
        scale: 1.015,
    };
}

/// Element bounding box in viewport coordinates.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiltTransform {
    pub rot_x: f64,
    pub rot_y: f64,
    pub scale: f64,
}

impl TiltTransform {
    /// CSS transform string applied by the webview.
    pub fn css(&self) -> String {
        format!(
            "perspective(800px) rotateX({:.3}deg) rotateY({:.3}deg) scale({})",
            self.rot_x, self.rot_y, self.scale
        )
    }
}

/// Pointer position to tilt transform. Returns `None` for a degenerate
/// rect (zero area), leaving the element untransformed.
pub fn tilt_transform(
    pointer_x: f64,
    pointer_y: f64,
    rect: ElementRect,
    opts: TiltOptions,
) -> Option<TiltTransform> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }

    let dx = pointer_x - (rect.left + rect.width / 2.0);
    let dy = pointer_y - (rect.top + rect.height / 2.0);
    let px = dx / (rect.width / 2.0);
    let py = dy / (rect.height / 2.0);

    Some(TiltTransform {
        rot_x: -py * opts.max_deg,
        rot_y: px * opts.max_deg,
        scale: opts.scale,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: ElementRect = ElementRect {
        left: 100.0,
        top: 200.0,
        width: 280.0,
        height: 200.0,
    };

    #[test]
    fn fade_delays_come_in_sequence() {
        assert_eq!(fade_in_delays(3, FADE_STEP_PUBLIC_MS), vec![50, 110, 170]);
        assert_eq!(fade_in_delays(2, FADE_STEP_ADMIN_MS), vec![50, 100]);
        assert!(fade_in_delays(0, FADE_STEP_PUBLIC_MS).is_empty());
    }

    #[test]
    fn pointer_at_center_is_identity_rotation() {
        let t = tilt_transform(240.0, 300.0, RECT, TiltOptions::PUBLIC).unwrap();
        assert_eq!(t.rot_x, 0.0);
        assert_eq!(t.rot_y, 0.0);
        assert_eq!(t.scale, 1.02);
    }

    #[test]
    fn pointer_at_corners_hits_the_max_angle() {
        // Bottom-right corner: full positive Y rotation, full negative X.
        let t = tilt_transform(380.0, 400.0, RECT, TiltOptions::PUBLIC).unwrap();
        assert!((t.rot_y - 12.0).abs() < 1e-9);
        assert!((t.rot_x + 12.0).abs() < 1e-9);

        // Admin preset is subtler.
        let t = tilt_transform(380.0, 400.0, RECT, TiltOptions::ADMIN).unwrap();
        assert!((t.rot_y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_rect_produces_no_transform() {
        let rect = ElementRect {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 10.0,
        };
        assert!(tilt_transform(5.0, 5.0, rect, TiltOptions::PUBLIC).is_none());
    }

    #[test]
    fn css_string_matches_the_expected_shape() {
        let t = TiltTransform {
            rot_x: -6.0,
            rot_y: 3.0,
            scale: 1.02,
        };
        assert_eq!(
            t.css(),
            "perspective(800px) rotateX(-6.000deg) rotateY(3.000deg) scale(1.02)"
        );
    }
}
