//! Engine-specific error types.
//!
//! Every fault the engine can hit at runtime is recoverable: a missing
//! texture degrades one surface, a rejected fullscreen request leaves the
//! window as it was, a degenerate resize is clamped.  Systems therefore
//! construct these values for logging and degradation decisions rather than
//! panicking.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::error::VizError;
//!
//! fn barrier_slot_failed(name: &'static str) {
//!     warn!("{}", VizError::TextureUnavailable { name });
//! }
//! ```

use std::fmt;

/// Top-level error enum for the visualization engine.
#[derive(Debug)]
pub enum VizError {
    /// A texture failed to load or decode.  The slot is left empty and the
    /// affected surface falls back to a flat material.
    TextureUnavailable {
        /// Logical slot name, e.g. `"planet_night"`.
        name: &'static str,
    },

    /// A fullscreen transition was requested but could not be honoured.
    /// Engine state is unaffected.
    FullscreenDenied {
        /// Human-readable reason (e.g. no primary window).
        reason: &'static str,
    },

    /// A resize event carried dimensions at or below zero.  The viewport is
    /// clamped to the minimum before the projection update.
    DegenerateViewport {
        /// Raw width reported by the event (pixels).
        width: u32,
        /// Raw height reported by the event (pixels).
        height: u32,
    },

    /// A configuration value is outside its safe operating range.
    /// Returned by the validation helpers run against `assets/engine.toml`.
    UnsafeConfigValue {
        /// Name of the field (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for VizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VizError::TextureUnavailable { name } => {
                write!(f, "texture '{}' unavailable; using flat-color fallback", name)
            }
            VizError::FullscreenDenied { reason } => {
                write!(f, "fullscreen request denied: {}", reason)
            }
            VizError::DegenerateViewport { width, height } => write!(
                f,
                "viewport resized to {}×{}; clamping to minimum before projection update",
                width, height
            ),
            VizError::UnsafeConfigValue {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "config value '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for VizError {}

/// Convenience alias: a `Result` using `VizError` as the error type.
pub type VizResult<T> = Result<T, VizError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error if `run_duration_factor` would produce a zero-length or
/// reversed animation run.
pub fn validate_run_duration_factor(value: f32) -> VizResult<()> {
    if !value.is_finite() || value <= 0.0 {
        Err(VizError::UnsafeConfigValue {
            name: "run_duration_factor",
            value,
            safe_range: "(0.0, ∞)",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if `particle_scale` is outside the range the per-frame
/// budget was sized for.  Values above 4.0 overwhelm the frame budget on the
/// Ultra tier.
pub fn validate_particle_scale(value: f32) -> VizResult<()> {
    if !value.is_finite() || value <= 0.0 || value > 4.0 {
        Err(VizError::UnsafeConfigValue {
            name: "particle_scale",
            value,
            safe_range: "(0.0, 4.0]",
        })
    } else {
        Ok(())
    }
}

/// Returns an error if `barrier_timeout_secs` would fire the texture watchdog
/// before the first load tick.
pub fn validate_barrier_timeout(value: f32) -> VizResult<()> {
    if !value.is_finite() || value < 0.5 {
        Err(VizError::UnsafeConfigValue {
            name: "barrier_timeout_secs",
            value,
            safe_range: "[0.5, ∞)",
        })
    } else {
        Ok(())
    }
}
