//! Post-impact debris field.
//!
//! Three fixed size classes populate the field: a few heavy boulders, a
//! spread of mid-size chunks, and a cloud of fine settling dust.  Each
//! fragment integrates radial gravity and drag, reflects off the planet
//! surface with a per-class restitution, and shrinks away over the final
//! quarter of its lifetime.

use super::{ImpactEffect, ImpactOccurred};
use crate::constants::*;
use crate::params::Composition;
use bevy::prelude::*;
use rand::Rng;

/// One of the three debris categories.
#[derive(Debug, Clone, Copy)]
pub struct DebrisClass {
    pub name: &'static str,
    /// Base count before quality/config scaling.
    pub count: u32,
    pub size_min: f32,
    pub size_max: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub gravity: f32,
    pub drag: f32,
    /// Restitution on surface contact.
    pub bounce: f32,
    pub lifetime: f32,
}

/// Boulders, chunks, fine dust.  Dust falls gently, barely bounces, and
/// outlives everything else as it settles.
pub const DEBRIS_CLASSES: [DebrisClass; 3] = [
    DebrisClass {
        name: "boulder",
        count: 12,
        size_min: 1.4,
        size_max: 3.0,
        speed_min: 24.0,
        speed_max: 44.0,
        gravity: 15.0,
        drag: 0.3,
        bounce: 0.45,
        lifetime: 7.5,
    },
    DebrisClass {
        name: "chunk",
        count: 26,
        size_min: 0.7,
        size_max: 1.4,
        speed_min: 32.0,
        speed_max: 58.0,
        gravity: 13.0,
        drag: 0.45,
        bounce: 0.28,
        lifetime: 6.0,
    },
    DebrisClass {
        name: "dust",
        count: 64,
        size_min: 0.2,
        size_max: 0.6,
        speed_min: 16.0,
        speed_max: 38.0,
        gravity: 7.0,
        drag: 1.0,
        bounce: 0.06,
        lifetime: 9.5,
    },
];

#[derive(Component, Debug)]
pub struct DebrisFragment {
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub gravity: f32,
    pub drag: f32,
    pub bounce: f32,
    pub half_size: f32,
    pub base_scale: f32,
    pub spin: Vec3,
}

/// Reflect an incoming velocity about the surface normal, scaled by the
/// restitution factor.
pub fn reflect_velocity(velocity: Vec3, normal: Vec3, bounce: f32) -> Vec3 {
    (velocity - 2.0 * velocity.dot(normal) * normal) * bounce
}

/// Fragment tint: the composition's rock color, lightened for dust.
fn fragment_color(composition: Composition, is_dust: bool) -> Color {
    let (r, g, b): (f32, f32, f32) = match composition {
        Composition::Rock => (0.35, 0.28, 0.22),
        Composition::Metal => (0.45, 0.45, 0.50),
        Composition::Ice => (0.75, 0.85, 0.92),
        Composition::Mixed => (0.40, 0.34, 0.27),
    };
    if is_dust {
        Color::srgb(
            (r * 1.5).min(1.0),
            (g * 1.5).min(1.0),
            (b * 1.5).min(1.0),
        )
    } else {
        Color::srgb(r, g, b)
    }
}

/// Spawns every class, scaled by `class_scale`, never exceeding `max_total`
/// fragments.  Returns how many were spawned.
pub fn spawn_debris_field(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    impact: &ImpactOccurred,
    class_scale: f32,
    max_total: usize,
) -> usize {
    let mut rng = rand::thread_rng();
    let mesh = meshes.add(Mesh::from(Tetrahedron::default()));
    let mut spawned = 0;

    for (index, class) in DEBRIS_CLASSES.iter().enumerate() {
        let material = materials.add(StandardMaterial {
            base_color: fragment_color(impact.params.composition, index == 2),
            perceptual_roughness: 1.0,
            ..default()
        });
        let count = ((class.count as f32) * class_scale).round() as usize;

        for _ in 0..count {
            if spawned >= max_total {
                return spawned;
            }
            let scatter = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let direction = (impact.normal * rng.gen_range(0.3..1.0) + scatter * 0.9)
                .normalize_or(impact.normal);
            let speed = rng.gen_range(class.speed_min..class.speed_max);
            let size = rng.gen_range(class.size_min..class.size_max);

            commands.spawn((
                ImpactEffect,
                DebrisFragment {
                    velocity: direction * speed,
                    age: 0.0,
                    lifetime: class.lifetime * rng.gen_range(0.75..1.25),
                    gravity: class.gravity,
                    drag: class.drag,
                    bounce: class.bounce,
                    half_size: size * 0.5,
                    base_scale: size,
                    spin: scatter * rng.gen_range(1.0..4.0),
                },
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                Transform::from_translation(impact.position + impact.normal * (1.0 + size))
                    .with_scale(Vec3::splat(size)),
            ));
            spawned += 1;
        }
    }
    spawned
}

/// Ballistics, surface bounce, tumble, and the late-life shrink.
pub fn update_debris(
    time: Res<Time>,
    mut commands: Commands,
    mut fragments: Query<(Entity, &mut DebrisFragment, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut fragment, mut transform) in fragments.iter_mut() {
        fragment.age += dt;
        if fragment.age >= fragment.lifetime {
            commands.entity(entity).despawn();
            continue;
        }

        let radial = transform.translation.normalize_or(Vec3::Y);
        let gravity = fragment.gravity;
        fragment.velocity -= radial * gravity * dt;
        let drag = (1.0 - fragment.drag * dt).max(0.0);
        fragment.velocity *= drag;
        transform.translation += fragment.velocity * dt;

        let floor = PLANET_RADIUS + fragment.half_size;
        if transform.translation.length() < floor {
            let normal = transform.translation.normalize_or(Vec3::Y);
            transform.translation = normal * floor;
            fragment.velocity = reflect_velocity(fragment.velocity, normal, fragment.bounce);
        }

        transform.rotate(Quat::from_scaled_axis(fragment.spin * dt));

        let t = fragment.age / fragment.lifetime;
        if t > 1.0 - DEBRIS_FADE_FRACTION {
            let left = ((1.0 - t) / DEBRIS_FADE_FRACTION).max(0.0);
            transform.scale = Vec3::splat(fragment.base_scale * left);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fragment falling straight down reflects straight back up, scaled by
    /// the restitution; a grazing hit keeps its tangential component.
    #[test]
    fn reflection_inverts_the_normal_component() {
        let normal = Vec3::Y;
        let falling = Vec3::new(0.0, -10.0, 0.0);
        let bounced = reflect_velocity(falling, normal, 0.5);
        assert!((bounced - Vec3::new(0.0, 5.0, 0.0)).length() < 1e-5);

        let grazing = Vec3::new(8.0, -6.0, 0.0);
        let bounced = reflect_velocity(grazing, normal, 1.0);
        assert!((bounced - Vec3::new(8.0, 6.0, 0.0)).length() < 1e-5);
    }

    /// Class table sanity: three classes, ordered largest to finest, dust
    /// settling longest with the least bounce.
    #[test]
    fn class_table_orders_largest_to_finest() {
        assert_eq!(DEBRIS_CLASSES.len(), 3);
        for class in &DEBRIS_CLASSES {
            assert!(class.count > 0);
            assert!(class.size_min < class.size_max);
            assert!(class.speed_min < class.speed_max);
            assert!(class.lifetime > 0.0);
            assert!((0.0..1.0).contains(&class.bounce));
        }
        for pair in DEBRIS_CLASSES.windows(2) {
            assert!(pair[1].size_max <= pair[0].size_max + 1e-6);
            assert!(pair[1].count >= pair[0].count, "finer classes are denser");
        }
        let dust = &DEBRIS_CLASSES[2];
        assert_eq!(dust.name, "dust");
        assert!(dust.lifetime > DEBRIS_CLASSES[0].lifetime);
        assert!(dust.bounce < DEBRIS_CLASSES[0].bounce);
    }

    /// Ice throws visibly paler debris than rock.
    #[test]
    fn fragment_tint_tracks_composition() {
        let rock = fragment_color(Composition::Rock, false);
        let ice = fragment_color(Composition::Ice, false);
        assert_ne!(rock, ice);

        let dust = fragment_color(Composition::Rock, true);
        let rock_srgb = rock.to_srgba();
        let dust_srgb = dust.to_srgba();
        assert!(dust_srgb.red > rock_srgb.red, "dust is lightened");
    }
}
