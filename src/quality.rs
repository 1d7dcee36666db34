//! Rendering quality tiers.
//!
//! A [`QualityTier`] names a fixed [`QualityProfile`] bundle of rendering-cost
//! parameters.  Tiers form an ordered set (Medium < High < Ultra) and every
//! profile field is monotone non-decreasing along that order, so a higher
//! tier is always a superset of a lower tier's resource consumption, never
//! cheaper.  `quality_superset_invariant` in the test module pins this down.
//!
//! The *effective* tier can sit below the requested tier: viewports narrower
//! than the mobile threshold are capped at High regardless of what the user
//! or config asked for.

use crate::constants::MOBILE_WIDTH_THRESHOLD;
use bevy::light::DirectionalLightShadowMap;
use bevy::prelude::*;

// ── Tiers ─────────────────────────────────────────────────────────────────────

/// Ordered quality tier.  The derived `Ord` follows declaration order, which
/// the mobile cap relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QualityTier {
    Medium,
    #[default]
    High,
    Ultra,
}

impl QualityTier {
    pub const ORDERED: [QualityTier; 3] = [Self::Medium, Self::High, Self::Ultra];

    /// Parse a config string.  Unknown values fall back to `High`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "medium" => Self::Medium,
            "ultra" => Self::Ultra,
            _ => Self::High,
        }
    }

    /// Display name for the overlay.
    pub fn name(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Next tier up, wrapping.  Drives the quality-cycle key.
    pub fn cycled(self) -> Self {
        match self {
            Self::Medium => Self::High,
            Self::High => Self::Ultra,
            Self::Ultra => Self::Medium,
        }
    }

    /// The fixed cost bundle for this tier.
    pub fn profile(self) -> QualityProfile {
        match self {
            Self::Medium => QualityProfile {
                shadow_resolution: 1024,
                particle_budget: 350,
                mesh_detail: 24,
                trail_length: 40,
                explosion_particle_count: 90,
                shadows_enabled: false,
                antialiasing: false,
            },
            Self::High => QualityProfile {
                shadow_resolution: 2048,
                particle_budget: 700,
                mesh_detail: 32,
                trail_length: 70,
                explosion_particle_count: 160,
                shadows_enabled: true,
                antialiasing: true,
            },
            Self::Ultra => QualityProfile {
                shadow_resolution: 4096,
                particle_budget: 1200,
                mesh_detail: 48,
                trail_length: 110,
                explosion_particle_count: 260,
                shadows_enabled: true,
                antialiasing: true,
            },
        }
    }
}

/// Fixed bundle of rendering-cost parameters attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityProfile {
    /// Directional shadow map edge length (texels).
    pub shadow_resolution: u32,
    /// Cap on simultaneously alive transient effect entities.
    pub particle_budget: u32,
    /// UV-sphere sector count for procedural meshes (stacks are 2/3 of this).
    pub mesh_detail: u32,
    /// Maximum retained asteroid trail points.
    pub trail_length: usize,
    /// Particles across all four explosion stages before budget scaling.
    pub explosion_particle_count: u32,
    pub shadows_enabled: bool,
    pub antialiasing: bool,
}

impl QualityProfile {
    /// Multiplier effects apply to per-class spawn counts, normalised so the
    /// High tier is 1.0.
    pub fn particle_count_scale(&self) -> f32 {
        self.particle_budget as f32 / QualityTier::High.profile().particle_budget as f32
    }
}

// ── Active selection ──────────────────────────────────────────────────────────

/// Requested vs. effective quality tier.
///
/// `requested` is what the user/config asked for; `effective` is what the
/// engine actually runs, and never exceeds High while the viewport is below
/// the mobile width threshold.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ActiveQuality {
    pub requested: QualityTier,
    pub effective: QualityTier,
}

impl Default for ActiveQuality {
    fn default() -> Self {
        Self {
            requested: QualityTier::High,
            effective: QualityTier::High,
        }
    }
}

impl ActiveQuality {
    pub fn profile(&self) -> QualityProfile {
        self.effective.profile()
    }
}

/// Cap a requested tier for the given viewport width.
pub fn effective_tier(requested: QualityTier, viewport_width: u32) -> QualityTier {
    if viewport_width < MOBILE_WIDTH_THRESHOLD {
        requested.min(QualityTier::High)
    } else {
        requested
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Re-cap the effective tier whenever the tracked viewport width changes
/// (resize handling records it into [`crate::viewport::ViewportInfo`]).
pub fn enforce_mobile_quality_cap(
    viewport: Res<crate::viewport::ViewportInfo>,
    mut quality: ResMut<ActiveQuality>,
) {
    if !viewport.is_changed() {
        return;
    }
    let capped = effective_tier(quality.requested, viewport.width);
    if capped != quality.effective {
        info!(
            "Quality tier {} → {} (viewport width {})",
            quality.effective.name(),
            capped.name(),
            viewport.width
        );
        quality.effective = capped;
    }
}

/// Push the effective profile into the renderer whenever it changes: shadow
/// map resolution, per-light shadow toggle, and camera MSAA.
#[allow(clippy::type_complexity)]
pub fn apply_quality_profile(
    quality: Res<ActiveQuality>,
    mut commands: Commands,
    mut lights: Query<&mut DirectionalLight>,
    cameras: Query<Entity, With<Camera3d>>,
) {
    if !quality.is_changed() {
        return;
    }
    let profile = quality.profile();
    commands.insert_resource(DirectionalLightShadowMap {
        size: profile.shadow_resolution as usize,
    });
    for mut light in lights.iter_mut() {
        light.shadows_enabled = profile.shadows_enabled;
    }
    let msaa = if profile.antialiasing {
        Msaa::Sample4
    } else {
        Msaa::Off
    };
    for camera in cameras.iter() {
        commands.entity(camera).insert(msaa);
    }
}

/// Applies the configured tier once startup configuration has loaded.  The
/// mobile cap re-evaluates it as soon as a viewport width is known.
pub fn seed_quality_from_config(
    config: Res<crate::config::EngineConfig>,
    mut quality: ResMut<ActiveQuality>,
) {
    let requested = QualityTier::from_name(&config.default_quality);
    quality.requested = requested;
    quality.effective = requested;
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct QualityPlugin;

impl Plugin for QualityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveQuality>().add_systems(
            Update,
            (enforce_mobile_quality_cap, apply_quality_profile).chain(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every profile field is monotone non-decreasing from Medium through
    /// Ultra; a higher tier can never be cheaper in any dimension.
    #[test]
    fn quality_superset_invariant() {
        for pair in QualityTier::ORDERED.windows(2) {
            let (lo, hi) = (pair[0].profile(), pair[1].profile());
            assert!(hi.shadow_resolution >= lo.shadow_resolution);
            assert!(hi.particle_budget >= lo.particle_budget);
            assert!(hi.mesh_detail >= lo.mesh_detail);
            assert!(hi.trail_length >= lo.trail_length);
            assert!(hi.explosion_particle_count >= lo.explosion_particle_count);
            assert!(
                hi.shadows_enabled >= lo.shadows_enabled,
                "shadows may never switch off when stepping up a tier"
            );
            assert!(hi.antialiasing >= lo.antialiasing);
        }
    }

    /// Below the mobile width threshold the effective tier is capped at High;
    /// at or above the threshold the request passes through.
    #[test]
    fn mobile_viewport_caps_tier_at_high() {
        let narrow = MOBILE_WIDTH_THRESHOLD - 1;
        assert_eq!(
            effective_tier(QualityTier::Ultra, narrow),
            QualityTier::High
        );
        assert_eq!(
            effective_tier(QualityTier::Medium, narrow),
            QualityTier::Medium,
            "capping must never upgrade a lower request"
        );
        assert_eq!(
            effective_tier(QualityTier::Ultra, MOBILE_WIDTH_THRESHOLD),
            QualityTier::Ultra
        );
    }

    /// The cycle key walks Medium → High → Ultra → Medium.
    #[test]
    fn cycle_visits_all_tiers() {
        let mut tier = QualityTier::Medium;
        let mut seen = vec![tier];
        for _ in 0..2 {
            tier = tier.cycled();
            seen.push(tier);
        }
        assert_eq!(
            seen,
            vec![QualityTier::Medium, QualityTier::High, QualityTier::Ultra]
        );
        assert_eq!(tier.cycled(), QualityTier::Medium, "cycle must wrap");
    }

    /// Config strings parse leniently; anything unknown lands on High.
    #[test]
    fn tier_parsing_defaults_to_high() {
        assert_eq!(QualityTier::from_name("medium"), QualityTier::Medium);
        assert_eq!(QualityTier::from_name(" ULTRA "), QualityTier::Ultra);
        assert_eq!(QualityTier::from_name("potato"), QualityTier::High);
    }

    /// Particle scaling is normalised to the High tier.
    #[test]
    fn particle_scale_is_relative_to_high() {
        assert!((QualityTier::High.profile().particle_count_scale() - 1.0).abs() < 1e-6);
        assert!(QualityTier::Medium.profile().particle_count_scale() < 1.0);
        assert!(QualityTier::Ultra.profile().particle_count_scale() > 1.0);
    }
}
