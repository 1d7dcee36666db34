//! Viewport tracking, fullscreen intents, and the FPS sampler.
//!
//! Resize messages land here first: dimensions are clamped to a minimum
//! before anything downstream divides by them, and the clamped size is
//! recorded in [`ViewportInfo`], which is what the quality mobile cap keys
//! off.  Fullscreen is an intent message; a rejected request (no primary
//! window to act on) degrades to a warning and an on-screen alert, never an
//! error.

use crate::constants::*;
use crate::error::VizError;
use bevy::prelude::*;
use bevy::window::{MonitorSelection, PrimaryWindow, WindowMode, WindowResized};

// ── Resources & messages ──────────────────────────────────────────────────────

/// Last known (clamped) viewport size in logical pixels.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportInfo {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportInfo {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Rolling one-second FPS sample for the debug overlay.
#[derive(Resource, Debug, Default)]
pub struct FpsSample {
    frames: u32,
    accumulated: f32,
    pub fps: f32,
}

/// Host- or key-initiated fullscreen toggle.
#[derive(Message, Debug, Default)]
pub struct FullscreenIntent;

// ── Clamping ──────────────────────────────────────────────────────────────────

/// Sanitize raw resize dimensions.  Returns the clamped size plus whether
/// the input was degenerate (non-finite, zero, or below the minimum).
pub fn clamp_viewport(width: f32, height: f32) -> (u32, u32, bool) {
    let sanitize = |v: f32| {
        if v.is_finite() {
            v.max(0.0).round() as u32
        } else {
            0
        }
    };
    let raw_width = sanitize(width);
    let raw_height = sanitize(height);
    let degenerate = raw_width < MIN_VIEWPORT_DIM || raw_height < MIN_VIEWPORT_DIM;
    (
        raw_width.max(MIN_VIEWPORT_DIM),
        raw_height.max(MIN_VIEWPORT_DIM),
        degenerate,
    )
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Seeds [`ViewportInfo`] from the primary window when one exists; headless
/// runs keep the default.
pub fn capture_initial_viewport(
    mut viewport: ResMut<ViewportInfo>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let (width, height, _) = clamp_viewport(window.width(), window.height());
    viewport.width = width;
    viewport.height = height;
}

/// Applies every resize, clamped.  Degenerate callbacks are routine during
/// window setup and minimize, so they warn and proceed.
pub fn track_resize_messages(
    mut resizes: MessageReader<WindowResized>,
    mut viewport: ResMut<ViewportInfo>,
) {
    for resize in resizes.read() {
        let (width, height, degenerate) = clamp_viewport(resize.width, resize.height);
        if degenerate {
            warn!(
                "⚠ {}",
                VizError::DegenerateViewport {
                    width: resize.width.max(0.0) as u32,
                    height: resize.height.max(0.0) as u32,
                }
            );
        }
        if viewport.width != width || viewport.height != height {
            viewport.width = width;
            viewport.height = height;
            debug!("Viewport now {width}×{height}");
        }
    }
}

/// Toggles borderless fullscreen on the primary window.  A missing window
/// surfaces as an alert and nothing else changes.
pub fn apply_fullscreen_intents(
    mut intents: MessageReader<FullscreenIntent>,
    mut alerts: ResMut<crate::overlay::EngineAlerts>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    for _ in intents.read() {
        match windows.single_mut() {
            Ok(mut window) => {
                window.mode = match window.mode {
                    WindowMode::Windowed => {
                        WindowMode::BorderlessFullscreen(MonitorSelection::Current)
                    }
                    _ => WindowMode::Windowed,
                };
                info!("Window mode now {:?}", window.mode);
            }
            Err(_) => {
                let error = VizError::FullscreenDenied {
                    reason: "no primary window",
                };
                warn!("⚠ {error}");
                alerts.raise(error.to_string());
            }
        }
    }
}

/// Counts frames and publishes an FPS figure once per sample interval.
pub fn sample_fps(time: Res<Time>, mut sample: ResMut<FpsSample>) {
    sample.frames += 1;
    sample.accumulated += time.delta_secs();
    if sample.accumulated >= FPS_SAMPLE_INTERVAL_SECS {
        sample.fps = sample.frames as f32 / sample.accumulated;
        sample.frames = 0;
        sample.accumulated = 0.0;
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct ViewportPlugin;

impl Plugin for ViewportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewportInfo>()
            .init_resource::<FpsSample>()
            .init_resource::<crate::overlay::EngineAlerts>()
            .add_message::<FullscreenIntent>()
            // Registered here as well as by `WindowPlugin` so headless apps
            // without a window backend can still drive resize handling.
            .add_message::<WindowResized>()
            .add_systems(Startup, capture_initial_viewport)
            .add_systems(
                Update,
                (track_resize_messages, apply_fullscreen_intents, sample_fps),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Healthy sizes pass through unchanged and are not flagged.
    #[test]
    fn normal_sizes_pass_through() {
        assert_eq!(clamp_viewport(1920.0, 1080.0), (1920, 1080, false));
        assert_eq!(
            clamp_viewport(MIN_VIEWPORT_DIM as f32, MIN_VIEWPORT_DIM as f32),
            (MIN_VIEWPORT_DIM, MIN_VIEWPORT_DIM, false)
        );
    }

    /// Zero, negative, and non-finite dimensions clamp to the floor and are
    /// flagged degenerate.
    #[test]
    fn degenerate_sizes_clamp_to_minimum() {
        for (w, h) in [
            (0.0, 600.0),
            (-4.0, 600.0),
            (800.0, 0.0),
            (f32::NAN, 600.0),
            (800.0, f32::INFINITY),
        ] {
            let (width, height, degenerate) = clamp_viewport(w, h);
            assert!(degenerate, "({w}, {h}) must be flagged");
            assert!(width >= MIN_VIEWPORT_DIM);
            assert!(height >= MIN_VIEWPORT_DIM);
        }
    }

    /// A width just below the minimum clamps up rather than erroring.
    #[test]
    fn near_minimum_rounds_up() {
        let (width, _, degenerate) = clamp_viewport(MIN_VIEWPORT_DIM as f32 - 1.0, 720.0);
        assert_eq!(width, MIN_VIEWPORT_DIM);
        assert!(degenerate);
    }
}
