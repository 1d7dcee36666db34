//! Simulation parameters: the host-facing input surface of the engine.
//!
//! [`SimulationParameters`] is the single source the Trajectory Model and the
//! Asteroid Factory read from.  It is immutable for the duration of an
//! animation run: edits made while a run is in flight are picked up only
//! after the run returns to idle (see `crate::asteroid::regenerate_asteroid`).
//!
//! The [`RunSignal`] resource carries the external "run requested" boolean.
//! It is deliberately level-based here; the edge detection (false→true plus a
//! changed parameter fingerprint) lives in the animation driver so that
//! repeated or re-rendered signals cannot start duplicate runs.

use crate::constants::*;
use bevy::prelude::*;
use serde::Deserialize;

// ── Composition ───────────────────────────────────────────────────────────────

/// Bulk composition of the incoming body.  Drives material styling and
/// nothing else; the trajectory is composition-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Composition {
    #[default]
    Rock,
    Metal,
    Ice,
    Mixed,
}

impl Composition {
    /// Parse a loose host-supplied string.  Unknown values style as `Rock`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "metal" | "iron" => Self::Metal,
            "ice" | "icy" => Self::Ice,
            "mixed" => Self::Mixed,
            _ => Self::Rock,
        }
    }

    /// Stable discriminant used by the parameter fingerprint.
    fn tag(self) -> u8 {
        match self {
            Self::Rock => 0,
            Self::Metal => 1,
            Self::Ice => 2,
            Self::Mixed => 3,
        }
    }

    /// Display name for the overlay.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Metal => "metal",
            Self::Ice => "ice",
            Self::Mixed => "mixed",
        }
    }
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// Host-supplied description of one impact scenario.
///
/// Always pass through [`SimulationParameters::sanitized`] at the trust
/// boundary: non-finite or non-positive values fall back to the documented
/// defaults (100 m, 20 km/s, 45°, rock) and the entry angle is clamped to
/// 0–90°, so malformed input can never panic downstream geometry.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Asteroid diameter in metres.
    pub size_m: f32,
    /// Approach velocity in km/s.
    pub velocity_kms: f32,
    /// Entry angle in degrees from the horizon plane, 0–90.
    pub entry_angle_deg: f32,
    /// Bulk composition.
    pub composition: Composition,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            size_m: DEFAULT_SIZE_M,
            velocity_kms: DEFAULT_VELOCITY_KMS,
            entry_angle_deg: DEFAULT_ANGLE_DEG,
            composition: Composition::Rock,
        }
    }
}

impl SimulationParameters {
    /// Return a copy with every malformed field replaced by its default and
    /// the angle clamped to the legal range.
    pub fn sanitized(&self) -> Self {
        let size_m = if self.size_m.is_finite() && self.size_m > 0.0 {
            self.size_m
        } else {
            DEFAULT_SIZE_M
        };
        let velocity_kms = if self.velocity_kms.is_finite() && self.velocity_kms > 0.0 {
            self.velocity_kms
        } else {
            DEFAULT_VELOCITY_KMS
        };
        let entry_angle_deg = if self.entry_angle_deg.is_finite() {
            self.entry_angle_deg.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG)
        } else {
            DEFAULT_ANGLE_DEG
        };
        Self {
            size_m,
            velocity_kms,
            entry_angle_deg,
            composition: self.composition,
        }
    }

    /// Order-sensitive FNV-1a fingerprint over the sanitized field values.
    ///
    /// Two parameter sets fingerprint equal iff they describe the same
    /// scenario.  The run driver compares fingerprints to ignore duplicate
    /// run signals, and the asteroid factory seeds its surface jitter from
    /// this value so a given scenario always regenerates the same mesh.
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        let p = self.sanitized();
        let mut hash = OFFSET;
        let mut mix = |bytes: &[u8]| {
            for &b in bytes {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(PRIME);
            }
        };
        mix(&p.size_m.to_bits().to_le_bytes());
        mix(&p.velocity_kms.to_bits().to_le_bytes());
        mix(&p.entry_angle_deg.to_bits().to_le_bytes());
        mix(&[p.composition.tag()]);
        hash
    }

    /// Asteroid mesh radius in world units: `clamp(size/12, 1.5, 20)`.
    pub fn mesh_radius(&self) -> f32 {
        (self.sanitized().size_m / ASTEROID_SIZE_DIVISOR)
            .clamp(ASTEROID_MIN_RADIUS, ASTEROID_MAX_RADIUS)
    }
}

// ── Presets ───────────────────────────────────────────────────────────────────

/// Named historical scenarios, cycled with the preset key and selectable at
/// startup via the `BOLIDE_PRESET` environment variable or
/// `EngineConfig::preset`.
pub const PRESET_NAMES: [&str; 4] = ["chelyabinsk", "tunguska", "barringer", "chicxulub"];

/// Look up a preset by name.  Returns `None` for unknown names so callers can
/// log and keep their current parameters.
pub fn preset(name: &str) -> Option<SimulationParameters> {
    let p = match name.trim().to_ascii_lowercase().as_str() {
        "chelyabinsk" => SimulationParameters {
            size_m: 20.0,
            velocity_kms: 19.0,
            entry_angle_deg: 20.0,
            composition: Composition::Rock,
        },
        "tunguska" => SimulationParameters {
            size_m: 60.0,
            velocity_kms: 27.0,
            entry_angle_deg: 35.0,
            composition: Composition::Ice,
        },
        "barringer" => SimulationParameters {
            size_m: 50.0,
            velocity_kms: 12.8,
            entry_angle_deg: 45.0,
            composition: Composition::Metal,
        },
        "chicxulub" => SimulationParameters {
            size_m: 10_000.0,
            velocity_kms: 20.0,
            entry_angle_deg: 60.0,
            composition: Composition::Mixed,
        },
        _ => return None,
    };
    Some(p)
}

// ── Run signal ────────────────────────────────────────────────────────────────

/// Level-based "run requested" flag written by the host, the in-scene Run
/// button, and the keyboard binding.
///
/// The animation driver consumes this with edge-triggered semantics: a run
/// starts only on a false→true transition combined with a parameter
/// fingerprint that differs from the previous run's.  Re-entrant requests
/// while a run is in flight are ignored, not queued.
#[derive(Resource, Debug, Default)]
pub struct RunSignal {
    pub requested: bool,
}

impl RunSignal {
    /// Host-invokable trigger; also driven by the in-scene Run control.
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Drop the signal back to its rest level.
    pub fn clear(&mut self) {
        self.requested = false;
    }
}

/// Startup system: apply a named preset if one was selected through the
/// `BOLIDE_PRESET` environment variable or the config file, or the config's
/// explicit `initial_parameters` when no preset was named.
///
/// Runs after `load_engine_config` so the config values are final.
pub fn apply_startup_preset(
    mut params: ResMut<SimulationParameters>,
    config: Res<crate::config::EngineConfig>,
) {
    let choice = std::env::var("BOLIDE_PRESET")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.preset.clone());
    if choice.is_empty() {
        if let Some(initial) = config.initial_parameters {
            *params = initial.sanitized();
            info!(
                "Startup parameters: {:.0} m, {:.1} km/s, {:.0}°, {}",
                params.size_m,
                params.velocity_kms,
                params.entry_angle_deg,
                params.composition.name()
            );
        }
        return;
    }
    match preset(&choice) {
        Some(p) => {
            *params = p;
            info!(
                "Preset '{}': {:.0} m, {:.1} km/s, {:.0}°, {}",
                choice,
                p.size_m,
                p.velocity_kms,
                p.entry_angle_deg,
                p.composition.name()
            );
        }
        None => warn!(
            "Unknown preset '{}' (available: {}); keeping current parameters",
            choice,
            PRESET_NAMES.join(", ")
        ),
    }
}
