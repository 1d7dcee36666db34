//! Runtime engine configuration loaded from `assets/engine.toml`.
//!
//! [`EngineConfig`] is a Bevy [`Resource`] that mirrors the live-tunable
//! subset of [`crate::constants`].  At startup, [`load_engine_config`] reads
//! `assets/engine.toml` and overwrites the defaults with any values present
//! in the file.  Missing keys fall back to the compile-time defaults, so a
//! minimal TOML can override just the values you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<EngineConfig>` to any system parameter list and read
//! values with `config.run_duration_factor`, `config.auto_rotate_speed`, etc.
//!
//! ## Tuning workflow
//!
//! 1. Edit `assets/engine.toml`.
//! 2. Restart the engine; no recompilation required.
//! 3. Out-of-range values are rejected at startup with a warning and the
//!    compiled default is kept (see [`crate::error`]).
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `EngineConfig::default()`.

use crate::constants::*;
use crate::error::{
    validate_barrier_timeout, validate_particle_scale, validate_run_duration_factor,
};
use bevy::prelude::*;
use serde::Deserialize;

/// Runtime-tunable engine configuration.
///
/// All numeric fields default to the corresponding compile-time constant from
/// `src/constants.rs`.  Override any subset by setting the value in
/// `assets/engine.toml`.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // ── Assets ───────────────────────────────────────────────────────────────
    /// Base path for texture lookups, relative to the `assets/` root.
    pub texture_base: String,

    // ── Startup Selection ────────────────────────────────────────────────────
    /// Initial quality tier: `"medium"`, `"high"`, or `"ultra"`.
    pub default_quality: String,
    /// Named parameter preset applied at startup (empty = engine defaults).
    /// The `BOLIDE_PRESET` environment variable takes precedence.
    pub preset: String,
    /// Explicit startup scenario, overridden by any named preset.  Values are
    /// sanitized on the way in like every other host-supplied parameter set.
    pub initial_parameters: Option<crate::params::SimulationParameters>,
    /// Whether the debug overlay starts visible.
    pub overlay_visible: bool,

    // ── Camera ───────────────────────────────────────────────────────────────
    pub auto_rotate_enabled: bool,
    pub auto_rotate_speed: f32,
    pub camera_start_distance: f32,

    // ── Animation Run ────────────────────────────────────────────────────────
    pub run_duration_factor: f32,
    pub run_min_duration_secs: f32,
    pub impact_hold_secs: f32,
    pub entry_glow_altitude: f32,
    pub fireball_velocity_threshold: f32,

    // ── Impact Effects ───────────────────────────────────────────────────────
    /// Multiplier on every per-class particle count (after quality scaling).
    pub particle_scale: f32,
    pub shockwave_max_radius: f32,
    pub shockwave_duration_secs: f32,

    // ── World Motion ─────────────────────────────────────────────────────────
    pub planet_rotation_secs: f32,
    pub cloud_rotation_secs: f32,
    pub moon_orbit_secs: f32,

    // ── Texture Loading / Viewport ───────────────────────────────────────────
    pub barrier_timeout_secs: f32,
    pub mobile_width_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Assets
            texture_base: "textures".to_string(),
            // Startup Selection
            default_quality: "high".to_string(),
            preset: String::new(),
            initial_parameters: None,
            overlay_visible: false,
            // Camera
            auto_rotate_enabled: true,
            auto_rotate_speed: AUTO_ROTATE_SPEED,
            camera_start_distance: CAMERA_START_DISTANCE,
            // Animation Run
            run_duration_factor: RUN_DURATION_FACTOR,
            run_min_duration_secs: RUN_MIN_DURATION_SECS,
            impact_hold_secs: IMPACT_HOLD_SECS,
            entry_glow_altitude: ENTRY_GLOW_ALTITUDE,
            fireball_velocity_threshold: FIREBALL_VELOCITY_THRESHOLD,
            // Impact Effects
            particle_scale: 1.0,
            shockwave_max_radius: SHOCKWAVE_MAX_RADIUS,
            shockwave_duration_secs: SHOCKWAVE_DURATION_SECS,
            // World Motion
            planet_rotation_secs: PLANET_ROTATION_SECS,
            cloud_rotation_secs: CLOUD_ROTATION_SECS,
            moon_orbit_secs: MOON_ORBIT_SECS,
            // Texture Loading / Viewport
            barrier_timeout_secs: TEXTURE_BARRIER_TIMEOUT_SECS,
            mobile_width_threshold: MOBILE_WIDTH_THRESHOLD,
        }
    }
}

/// Startup system: attempt to load `assets/engine.toml` and overwrite the
/// `EngineConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  TOML parse errors are logged
/// but do not abort the engine.  A missing file is silently ignored (defaults
/// are already in place from `insert_resource`).  Out-of-range values are
/// individually rejected and reset to their defaults.
pub fn load_engine_config(mut config: ResMut<EngineConfig>) {
    let path = "assets/engine.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<EngineConfig>(&contents) {
            Ok(loaded) => {
                *config = loaded;
                info!("✓ Loaded engine config from {path}");
            }
            Err(e) => {
                warn!("⚠ Failed to parse {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            // File not present: defaults are already in place, not an error.
            info!("ℹ No {path} found; using compiled defaults");
        }
    }

    let defaults = EngineConfig::default();
    if let Err(e) = validate_run_duration_factor(config.run_duration_factor) {
        warn!("⚠ {e}; keeping default");
        config.run_duration_factor = defaults.run_duration_factor;
    }
    if let Err(e) = validate_particle_scale(config.particle_scale) {
        warn!("⚠ {e}; keeping default");
        config.particle_scale = defaults.particle_scale;
    }
    if let Err(e) = validate_barrier_timeout(config.barrier_timeout_secs) {
        warn!("⚠ {e}; keeping default");
        config.barrier_timeout_secs = defaults.barrier_timeout_secs;
    }
}
