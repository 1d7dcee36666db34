//! Four-stage explosion burst.
//!
//! Stages march through the classic fireball palette (white core, yellow
//! fireball, orange plume, red-brown smoke), each stage igniting later,
//! flying slower, and lingering longer than the last.  Only the white core
//! fires on the impact frame; the rest are queued on igniter entities and
//! burst when their start offset elapses.  Particles fly a simple ballistic
//! integration: radial gravity toward the planet center, velocity drag, and
//! a scale fade over the particle's lifetime.

use super::{ImpactEffect, ImpactOccurred};
use crate::constants::*;
use bevy::prelude::*;
use rand::Rng;

/// One stage of the burst.  `share` is the fraction of the total particle
/// count the stage receives; `start_offset` is seconds after impact before
/// it ignites.
#[derive(Debug, Clone, Copy)]
pub struct ExplosionStage {
    pub emissive: [f32; 3],
    pub share: f32,
    pub start_offset: f32,
    pub speed_scale: f32,
    pub lifetime: f32,
    pub scale_min: f32,
    pub scale_max: f32,
}

/// White → yellow → orange → red, in firing order.
pub const EXPLOSION_STAGES: [ExplosionStage; 4] = [
    ExplosionStage {
        emissive: [14.0, 14.0, 13.0],
        share: 0.15,
        start_offset: 0.0,
        speed_scale: 1.35,
        lifetime: 0.7,
        scale_min: 1.6,
        scale_max: 2.6,
    },
    ExplosionStage {
        emissive: [10.0, 7.5, 1.6],
        share: 0.30,
        start_offset: 0.12,
        speed_scale: 1.15,
        lifetime: 1.3,
        scale_min: 1.2,
        scale_max: 2.2,
    },
    ExplosionStage {
        emissive: [7.0, 3.0, 0.7],
        share: 0.30,
        start_offset: 0.3,
        speed_scale: 0.9,
        lifetime: 2.1,
        scale_min: 1.0,
        scale_max: 2.0,
    },
    ExplosionStage {
        emissive: [2.4, 0.5, 0.2],
        share: 0.25,
        start_offset: 0.55,
        speed_scale: 0.6,
        lifetime: 3.4,
        scale_min: 1.4,
        scale_max: 3.0,
    },
];

#[derive(Component, Debug)]
pub struct ExplosionParticle {
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub base_scale: f32,
    /// Index into [`EXPLOSION_STAGES`] this particle belongs to.
    pub stage: usize,
}

/// A stage waiting on its start offset.  Despawned the frame it bursts.
#[derive(Component, Debug)]
pub struct PendingExplosionStage {
    pub stage: usize,
    pub count: usize,
    pub origin: Vec3,
    pub normal: Vec3,
    pub remaining: f32,
    pub mesh: Handle<Mesh>,
}

/// Burst one stage's worth of particles, hemisphere-biased along the surface
/// normal.
fn burst_stage(
    commands: &mut Commands,
    materials: &mut Assets<StandardMaterial>,
    mesh: &Handle<Mesh>,
    stage_index: usize,
    count: usize,
    origin: Vec3,
    normal: Vec3,
) {
    let stage = EXPLOSION_STAGES[stage_index];
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::rgb(stage.emissive[0], stage.emissive[1], stage.emissive[2]),
        unlit: true,
        alpha_mode: AlphaMode::Add,
        ..default()
    });
    let mut rng = rand::thread_rng();

    for _ in 0..count {
        let scatter = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let direction =
            (normal * rng.gen_range(0.4..1.0) + scatter * 0.85).normalize_or(normal);
        let speed = rng.gen_range(EXPLOSION_MIN_SPEED..EXPLOSION_MAX_SPEED) * stage.speed_scale;
        let base_scale = rng.gen_range(stage.scale_min..stage.scale_max);

        commands.spawn((
            ImpactEffect,
            ExplosionParticle {
                velocity: direction * speed,
                age: 0.0,
                lifetime: stage.lifetime * rng.gen_range(0.8..1.2),
                base_scale,
                stage: stage_index,
            },
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(origin + normal * 1.5)
                .with_scale(Vec3::splat(base_scale)),
        ));
    }
}

/// Launches the staged burst at the strike point: stages with a zero offset
/// fire immediately, the rest are parked on igniter entities until their
/// offset elapses.  Returns how many particles the full burst will spawn.
pub fn spawn_explosion(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    impact: &ImpactOccurred,
    total_count: usize,
) -> usize {
    let mesh = meshes.add(Mesh::from(Tetrahedron::default()));
    let mut planned = 0;

    for (index, stage) in EXPLOSION_STAGES.iter().enumerate() {
        let count = ((total_count as f32) * stage.share).round() as usize;
        if count == 0 {
            continue;
        }
        planned += count;

        if stage.start_offset <= 0.0 {
            burst_stage(
                commands,
                materials,
                &mesh,
                index,
                count,
                impact.position,
                impact.normal,
            );
        } else {
            commands.spawn((
                ImpactEffect,
                PendingExplosionStage {
                    stage: index,
                    count,
                    origin: impact.position,
                    normal: impact.normal,
                    remaining: stage.start_offset,
                    mesh: mesh.clone(),
                },
            ));
        }
    }
    planned
}

/// Ticks pending stages down and bursts each one the frame its offset runs
/// out.
pub fn ignite_pending_stages(
    time: Res<Time>,
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut pending: Query<(Entity, &mut PendingExplosionStage)>,
) {
    let dt = time.delta_secs();
    for (entity, mut stage) in pending.iter_mut() {
        stage.remaining -= dt;
        if stage.remaining > 0.0 {
            continue;
        }
        burst_stage(
            &mut commands,
            &mut materials,
            &stage.mesh,
            stage.stage,
            stage.count,
            stage.origin,
            stage.normal,
        );
        commands.entity(entity).despawn();
    }
}

/// Ballistics and lifetime fade; despawns each particle at end of life.
pub fn update_explosion_particles(
    time: Res<Time>,
    mut commands: Commands,
    mut particles: Query<(Entity, &mut ExplosionParticle, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut particle, mut transform) in particles.iter_mut() {
        particle.age += dt;
        if particle.age >= particle.lifetime {
            commands.entity(entity).despawn();
            continue;
        }
        let inward = -transform.translation.normalize_or(Vec3::Y);
        particle.velocity += inward * EXPLOSION_GRAVITY * dt;
        particle.velocity *= (1.0 - EXPLOSION_DRAG * dt).max(0.0);
        transform.translation += particle.velocity * dt;

        let remaining = (1.0 - particle.age / particle.lifetime).max(0.0);
        transform.scale = Vec3::splat(particle.base_scale * remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shares cover the whole burst and stages cool monotonically: each one
    /// igniting later, flying slower, and lingering longer than the previous.
    #[test]
    fn stage_table_is_coherent() {
        let share_sum: f32 = EXPLOSION_STAGES.iter().map(|s| s.share).sum();
        assert!((share_sum - 1.0).abs() < 1e-6, "shares must sum to one");
        assert_eq!(
            EXPLOSION_STAGES[0].start_offset, 0.0,
            "the white core must fire on the impact frame"
        );

        for pair in EXPLOSION_STAGES.windows(2) {
            assert!(
                pair[1].start_offset > pair[0].start_offset,
                "stages must ignite strictly later down the table"
            );
            assert!(
                pair[1].lifetime > pair[0].lifetime,
                "later stages must linger longer"
            );
            assert!(
                pair[1].speed_scale < pair[0].speed_scale,
                "later stages must fly slower"
            );
        }
    }

    /// The table opens near-white and ends deep red: the red channel must
    /// dominate ever harder down the table.
    #[test]
    fn palette_cools_from_white_to_red() {
        let first = EXPLOSION_STAGES[0].emissive;
        assert!((first[0] - first[2]).abs() < 2.0, "core is near-white");

        for pair in EXPLOSION_STAGES.windows(2) {
            let ratio_a = pair[0].emissive[2] / pair[0].emissive[0];
            let ratio_b = pair[1].emissive[2] / pair[1].emissive[0];
            assert!(
                ratio_b <= ratio_a + 1e-6,
                "blue fraction must fall stage over stage"
            );
        }
    }
}
