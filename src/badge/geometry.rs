//! Fixed badge geometry in logical units (before the pixel-density scale).

pub const HEADER_TOP: f32 = 50.0;
pub const CAPTION_GAP: f32 = 30.0;
pub const WORDMARK_BASELINE: f32 = 80.0;
pub const WORDMARK_CAPTION_BASELINE: f32 = 110.0;

pub const PROFILE_CENTER_Y: f32 = 260.0;
pub const PROFILE_RADIUS: f32 = 70.0;
/// Side of the offscreen surface the initials fallback is painted on.
pub const FALLBACK_SIZE: f32 = 140.0;

pub const USERNAME_BASELINE: f32 = 380.0;

pub const BOX_X: f32 = 40.0;
pub const BOX_Y: f32 = 420.0;
pub const BOX_HEIGHT: f32 = 140.0;
pub const MESSAGE_X: f32 = 65.0;
pub const MESSAGE_FIRST_BASELINE: f32 = 450.0;
pub const MESSAGE_LINE_HEIGHT: f32 = 22.0;
pub const MESSAGE_FONT_SIZE: f32 = 16.0;
/// Horizontal room lost to the message box padding.
pub const MESSAGE_INSET: f32 = 50.0;
/// Lowest baseline may sit this far above the box bottom.
pub const MESSAGE_BOTTOM_CLEARANCE: f32 = 20.0;

pub const TIMESTAMP_BASELINE: f32 = 600.0;
pub const FOOTER_BASELINE: f32 = 630.0;

pub const STAMP_X: f32 = 400.0;
pub const STAMP_Y: f32 = 70.0;
pub const STAMP_ROTATION_RAD: f32 = 0.3;

pub const WATERMARK_INSET: f32 = 25.0;

/// Size and position of the header logo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scales the logo to `target_height`, then caps the width at `max_width`.
///
/// The order matters: height is fixed first and only recomputed from the
/// width cap when the aspect-scaled width overflows, so the downloaded badge
/// and the live preview agree.
pub fn logo_box(
    natural_width: f32,
    natural_height: f32,
    target_height: f32,
    max_width: f32,
    canvas_width: f32,
) -> LogoBox {
    let aspect = natural_width / natural_height.max(f32::EPSILON);
    let mut height = target_height;
    let mut width = target_height * aspect;
    if width > max_width {
        width = max_width;
        height = max_width / aspect;
    }
    LogoBox {
        x: (canvas_width - width) / 2.0,
        y: HEADER_TOP,
        width,
        height,
    }
}

pub fn message_max_width(canvas_width: f32) -> f32 {
    box_width(canvas_width) - MESSAGE_INSET
}

pub fn box_width(canvas_width: f32) -> f32 {
    canvas_width - 2.0 * BOX_X
}

/// Number of message baselines that fit inside the box.
pub fn message_max_lines() -> usize {
    let last_baseline = BOX_Y + BOX_HEIGHT - MESSAGE_BOTTOM_CLEARANCE;
    ((last_baseline - MESSAGE_FIRST_BASELINE) / MESSAGE_LINE_HEIGHT).floor() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_scale_law() {
        let wide = logo_box(600.0, 100.0, 32.0, 240.0, 480.0);
        assert_eq!((wide.width, wide.height), (192.0, 32.0));
        assert_eq!(wide.x, 144.0);

        let wider = logo_box(1000.0, 100.0, 32.0, 240.0, 480.0);
        assert_eq!((wider.width, wider.height), (240.0, 24.0));
        assert_eq!(wider.x, 120.0);
    }

    #[test]
    fn logo_scale_law_holds_across_ratios() {
        for tenths in 1..200 {
            let ratio = tenths as f32 / 10.0;
            let logo = logo_box(ratio * 50.0, 50.0, 32.0, 240.0, 480.0);
            if 32.0 * ratio <= 240.0 {
                assert!((logo.height - 32.0).abs() < 1e-4);
                assert!((logo.width - 32.0 * ratio).abs() < 1e-3);
            } else {
                assert!((logo.width - 240.0).abs() < 1e-4);
                assert!((logo.height - 240.0 / ratio).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn message_box_holds_five_lines() {
        assert_eq!(message_max_lines(), 5);
        assert_eq!(message_max_width(480.0), 350.0);
    }
}
