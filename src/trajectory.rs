//! Approach trajectory model.
//!
//! A pure mapping from [`SimulationParameters`] to one straight-line-ish
//! approach: a start point safely outside the scene and an impact point on
//! the planet surface.  No randomness anywhere: identical parameters always
//! produce the identical path, and composition has no influence at all.
//!
//! The impact point is the approach direction reflected through the origin,
//! then nudged sideways by a bend factor standing in for gravitational
//! deflection.  Slow bodies linger in the well, so they bend more.

use crate::constants::*;
use crate::params::SimulationParameters;
use bevy::prelude::*;

/// One computed approach, regenerated together with the asteroid whenever
/// parameters change while the driver is idle.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPath {
    /// Entry point in space, `start_distance` from the origin.
    pub start: Vec3,
    /// Impact point on the planet surface.
    pub end: Vec3,
    /// Sideways deflection applied to the reflected direction (radian-scale).
    pub bend_factor: f32,
}

impl Default for TrajectoryPath {
    fn default() -> Self {
        compute_trajectory(&SimulationParameters::default())
    }
}

/// Distance from the origin at which the approach begins.
///
/// `max(250, size*1.5 + velocity*3)`: large or fast bodies need more runway
/// so the approach reads at a sensible on-screen speed.
pub fn start_distance(size_m: f32, velocity_kms: f32) -> f32 {
    MIN_START_DISTANCE.max(size_m * START_SIZE_FACTOR + velocity_kms * START_VELOCITY_FACTOR)
}

/// Bend factor for the gravitational-deflection nudge.
pub fn bend_factor(velocity_kms: f32) -> f32 {
    if velocity_kms < BEND_VELOCITY_THRESHOLD {
        BEND_FACTOR_SLOW
    } else {
        BEND_FACTOR_FAST
    }
}

/// Compute the full approach for one parameter set.
///
/// The entry angle sets the elevation of the approach direction; a fixed
/// off-plane tilt keeps the path from being perfectly planar.  The impact
/// point is the reflected direction pushed sideways by the bend factor and
/// re-projected onto the surface radius.
pub fn compute_trajectory(params: &SimulationParameters) -> TrajectoryPath {
    let p = params.sanitized();
    let elevation = p.entry_angle_deg.to_radians();

    let approach = Vec3::new(
        elevation.cos() * APPROACH_TILT.cos(),
        elevation.sin(),
        elevation.cos() * APPROACH_TILT.sin(),
    )
    .normalize_or(Vec3::X);

    let start = approach * start_distance(p.size_m, p.velocity_kms);

    let bend = bend_factor(p.velocity_kms);
    let reflected = -approach;
    let side = reflected.cross(Vec3::Y).normalize_or(Vec3::X);
    let end = (reflected + side * bend).normalize_or(reflected) * PLANET_RADIUS;

    TrajectoryPath {
        start,
        end,
        bend_factor: bend,
    }
}
