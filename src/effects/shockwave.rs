//! Expanding surface shockwave.
//!
//! A single flat ring, oriented to the surface tangent plane at the strike
//! point, that grows to its maximum radius with an ease-out curve while its
//! alpha drains away.  Geometry comes from the same annulus builder the
//! reference ring uses; the mesh is unit-radius and the transform scale
//! carries the expansion.

use super::{ImpactEffect, ImpactOccurred};
use crate::config::EngineConfig;
use crate::scene::annulus_mesh;
use bevy::prelude::*;

/// Starting alpha of the ring material.
const BASE_ALPHA: f32 = 0.85;
/// Inner radius of the unit ring, as a fraction of the outer edge.
const INNER_FRACTION: f32 = 0.82;

#[derive(Component, Debug)]
pub struct Shockwave {
    pub age: f32,
    pub duration: f32,
    pub max_radius: f32,
}

/// Ease-out expansion: fast at first, coasting into the maximum radius.
pub fn ring_radius(t: f32, max_radius: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    max_radius * (1.0 - (1.0 - t) * (1.0 - t))
}

/// Alpha drain over the ring's life.
pub fn ring_alpha(t: f32) -> f32 {
    BASE_ALPHA * (1.0 - t.clamp(0.0, 1.0)).powf(1.5)
}

pub fn spawn_shockwave(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    impact: &ImpactOccurred,
    config: &EngineConfig,
) {
    let mesh = meshes.add(annulus_mesh(INNER_FRACTION, 1.0, 96));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 0.75, 0.45, BASE_ALPHA),
        emissive: LinearRgba::rgb(3.0, 1.6, 0.6),
        alpha_mode: AlphaMode::Add,
        unlit: true,
        cull_mode: None,
        double_sided: true,
        ..default()
    });

    commands.spawn((
        ImpactEffect,
        Shockwave {
            age: 0.0,
            duration: config.shockwave_duration_secs.max(0.1),
            max_radius: config.shockwave_max_radius.max(1.0),
        },
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform {
            translation: impact.position + impact.normal * 0.6,
            rotation: Quat::from_rotation_arc(Vec3::Y, impact.normal),
            scale: Vec3::splat(0.01),
        },
    ));
}

/// Expands and fades each ring, despawning it at end of life.
pub fn update_shockwaves(
    time: Res<Time>,
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut waves: Query<(
        Entity,
        &mut Shockwave,
        &mut Transform,
        &MeshMaterial3d<StandardMaterial>,
    )>,
) {
    let dt = time.delta_secs();
    for (entity, mut wave, mut transform, handle) in waves.iter_mut() {
        wave.age += dt;
        let t = wave.age / wave.duration;
        if t >= 1.0 {
            commands.entity(entity).despawn();
            continue;
        }
        transform.scale = Vec3::splat(ring_radius(t, wave.max_radius).max(0.01));
        if let Some(material) = materials.get_mut(&handle.0) {
            material.base_color.set_alpha(ring_alpha(t));
        }
    }
}
