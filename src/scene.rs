//! Scene construction and ambient world motion.
//!
//! Built once per entry into [`EngineState::Running`], torn down on exit, so
//! a rebuild (texture base change, quality reseed, host remount) always goes
//! teardown-first through the state machine.  [`build_scene`] also sweeps
//! any stragglers before spawning, which makes it safe to call twice.
//!
//! Layer stack, innermost out:
//!
//! | Layer             | Geometry                        | Material notes                        |
//! |-------------------|---------------------------------|---------------------------------------|
//! | planet            | UV sphere, quality-scaled       | day albedo, night emissive, normal, specular |
//! | cloud shell       | sphere × `CLOUD_SHELL_SCALE`    | alpha-blended, drifts past the ground |
//! | atmosphere inner  | sphere × `ATMOSPHERE_INNER_SCALE` | additive, front-face culled rim glow |
//! | atmosphere outer  | sphere × `ATMOSPHERE_OUTER_SCALE` | fainter second rim                   |
//! | moon              | sphere, wall-clock orbit        | textured or flat grey                 |
//! | reference ring    | flat annulus                    | faint unlit marker for scale          |
//! | ambient belt      | 48 small rocks                  | slow wall-clock drift                 |
//! | starfield + sky   | 900 dots, textured far sphere   | unlit                                 |
//!
//! Every slot that lost its texture falls back to a flat color; construction
//! never fails on missing assets.
//!
//! Ambient motion is a pure function of elapsed wall-clock time, not
//! integrated per frame, so a rebuilt scene picks up exactly where the old
//! one left off.

use crate::config::EngineConfig;
use crate::constants::*;
use crate::quality::ActiveQuality;
use crate::textures::{EngineState, TextureSet};
use bevy::prelude::*;
use bevy::render::render_resource::Face;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};
use rand::Rng;

// ── Markers ───────────────────────────────────────────────────────────────────

/// Common marker for everything the builder spawns; teardown sweeps these.
#[derive(Component)]
pub struct ScenePiece;

#[derive(Component)]
pub struct Planet;

#[derive(Component)]
pub struct CloudShell;

#[derive(Component)]
pub struct Moon;

#[derive(Component)]
pub struct SunLight;

/// Atmosphere rim shell.  The flash pulse raises the material alpha above
/// `baseline_alpha` at impact and decays it back.
#[derive(Component, Debug, Clone, Copy)]
pub struct AtmosphereShell {
    pub baseline_alpha: f32,
}

/// One rock of the decorative belt, positioned by wall-clock time.
#[derive(Component, Debug, Clone, Copy)]
pub struct BeltRock {
    pub radius: f32,
    pub angular_speed: f32,
    pub phase: f32,
    pub height: f32,
    pub spin_rate: f32,
}

// ── Mesh helpers ──────────────────────────────────────────────────────────────

/// Flat annulus in the XZ plane, normals up.  Shared by the reference ring
/// and the impact shockwave.
pub fn annulus_mesh(inner_radius: f32, outer_radius: f32, segments: u32) -> Mesh {
    let mut positions = Vec::with_capacity(((segments + 1) * 2) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());
    for i in 0..=segments {
        let fraction = i as f32 / segments as f32;
        let theta = fraction * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        positions.push([inner_radius * cos, 0.0, inner_radius * sin]);
        positions.push([outer_radius * cos, 0.0, outer_radius * sin]);
        normals.push([0.0, 1.0, 0.0]);
        normals.push([0.0, 1.0, 0.0]);
        uvs.push([fraction, 0.0]);
        uvs.push([fraction, 1.0]);
    }
    let mut indices = Vec::with_capacity((segments * 6) as usize);
    for i in 0..segments {
        let a = i * 2;
        indices.extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

// ── Materials ─────────────────────────────────────────────────────────────────

/// Planet surface: every texture slot is optional and independently falls
/// back.  A missing day map leaves a flat ocean tint; a missing night map
/// simply means no city glow, nothing else changes.
fn planet_material(textures: &TextureSet) -> StandardMaterial {
    let base_color = if textures.planet_day.is_some() {
        Color::WHITE
    } else {
        Color::srgb(0.05, 0.22, 0.38)
    };
    let emissive = if textures.planet_night.is_some() {
        LinearRgba::rgb(1.2, 1.1, 0.85)
    } else {
        LinearRgba::BLACK
    };
    StandardMaterial {
        base_color,
        base_color_texture: textures.planet_day.clone(),
        emissive,
        emissive_texture: textures.planet_night.clone(),
        normal_map_texture: textures.planet_normal.clone(),
        metallic_roughness_texture: textures.planet_specular.clone(),
        perceptual_roughness: 0.9,
        metallic: 0.0,
        ..default()
    }
}

fn cloud_material(textures: &TextureSet) -> StandardMaterial {
    let alpha = if textures.clouds.is_some() { 0.85 } else { 0.08 };
    StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, alpha),
        base_color_texture: textures.clouds.clone(),
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 1.0,
        ..default()
    }
}

/// Additive rim glow rendered on the inside-facing shell surface, which is
/// what keeps the glow at the limb instead of washing out the ground.
fn atmosphere_material(alpha: f32) -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgba(0.30, 0.55, 1.0, alpha),
        alpha_mode: AlphaMode::Add,
        cull_mode: Some(Face::Front),
        unlit: true,
        ..default()
    }
}

fn moon_material(textures: &TextureSet) -> StandardMaterial {
    let base_color = if textures.moon.is_some() {
        Color::WHITE
    } else {
        Color::srgb(0.55, 0.55, 0.55)
    };
    StandardMaterial {
        base_color,
        base_color_texture: textures.moon.clone(),
        perceptual_roughness: 1.0,
        ..default()
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Builds the whole set.  Runs on entry into `Running`, after the texture
/// barrier has resolved every slot one way or the other.
#[allow(clippy::too_many_arguments)]
pub fn build_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    textures: Res<TextureSet>,
    quality: Res<ActiveQuality>,
    existing: Query<Entity, With<ScenePiece>>,
) {
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let detail = quality.profile().mesh_detail;
    let mut rng = rand::thread_rng();

    // Planet and its shells.
    commands.spawn((
        ScenePiece,
        Planet,
        Mesh3d(meshes.add(Sphere::new(PLANET_RADIUS).mesh().uv(detail * 2, detail * 3 / 2))),
        MeshMaterial3d(materials.add(planet_material(&textures))),
        Transform::default(),
    ));
    commands.spawn((
        ScenePiece,
        CloudShell,
        Mesh3d(meshes.add(
            Sphere::new(PLANET_RADIUS * CLOUD_SHELL_SCALE)
                .mesh()
                .uv(detail * 2, detail * 3 / 2),
        )),
        MeshMaterial3d(materials.add(cloud_material(&textures))),
        Transform::default(),
    ));
    for (scale, alpha) in [
        (ATMOSPHERE_INNER_SCALE, ATMOSPHERE_INNER_ALPHA),
        (ATMOSPHERE_OUTER_SCALE, ATMOSPHERE_OUTER_ALPHA),
    ] {
        commands.spawn((
            ScenePiece,
            AtmosphereShell {
                baseline_alpha: alpha,
            },
            Mesh3d(meshes.add(Sphere::new(PLANET_RADIUS * scale).mesh().uv(48, 32))),
            MeshMaterial3d(materials.add(atmosphere_material(alpha))),
            Transform::default(),
        ));
    }

    // Moon; the orbit system places it from wall-clock time every frame.
    commands.spawn((
        ScenePiece,
        Moon,
        Mesh3d(meshes.add(Sphere::new(MOON_RADIUS).mesh().uv(40, 28))),
        MeshMaterial3d(materials.add(moon_material(&textures))),
        Transform::from_translation(Vec3::X * MOON_ORBIT_RADIUS),
    ));

    // Reference ring for scale.
    commands.spawn((
        ScenePiece,
        Mesh3d(meshes.add(annulus_mesh(RING_INNER_RADIUS, RING_OUTER_RADIUS, 128))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.6, 0.75, 1.0, RING_ALPHA),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            cull_mode: None,
            double_sided: true,
            ..default()
        })),
        Transform::default(),
    ));

    // Ambient belt: shared rock mesh, per-rock tint and drift parameters.
    let rock_mesh = meshes.add(Mesh::from(Tetrahedron::default()));
    for _ in 0..BELT_ROCK_COUNT {
        let shade = rng.gen_range(0.25..0.45);
        commands.spawn((
            ScenePiece,
            BeltRock {
                radius: rng.gen_range(BELT_INNER_RADIUS..BELT_OUTER_RADIUS),
                angular_speed: rng.gen_range(BELT_MIN_ANGULAR_SPEED..BELT_MAX_ANGULAR_SPEED),
                phase: rng.gen_range(0.0..std::f32::consts::TAU),
                height: rng.gen_range(-14.0..14.0),
                spin_rate: rng.gen_range(0.1..0.5),
            },
            Mesh3d(rock_mesh.clone()),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(shade, shade * 0.9, shade * 0.75),
                perceptual_roughness: 1.0,
                ..default()
            })),
            Transform::from_scale(Vec3::splat(
                rng.gen_range(BELT_ROCK_MIN_SIZE..BELT_ROCK_MAX_SIZE),
            )),
        ));
    }

    // Starfield dots on a dome, plus the textured sky sphere when the
    // background map survived loading.
    let star_mesh = meshes.add(Sphere::new(1.0).mesh().uv(6, 4));
    let star_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::rgb(2.0, 2.0, 2.2),
        unlit: true,
        ..default()
    });
    for _ in 0..STAR_COUNT {
        let direction = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .normalize_or(Vec3::Z);
        commands.spawn((
            ScenePiece,
            Mesh3d(star_mesh.clone()),
            MeshMaterial3d(star_material.clone()),
            Transform::from_translation(direction * STAR_DOME_RADIUS)
                .with_scale(Vec3::splat(rng.gen_range(1.2..3.4))),
        ));
    }
    if textures.background.is_some() {
        commands.spawn((
            ScenePiece,
            Mesh3d(meshes.add(Sphere::new(BACKGROUND_SPHERE_RADIUS).mesh().uv(48, 32))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::WHITE,
                base_color_texture: textures.background.clone(),
                cull_mode: Some(Face::Front),
                unlit: true,
                ..default()
            })),
            Transform::default(),
        ));
    }

    // Lighting.
    commands.spawn((
        ScenePiece,
        SunLight,
        DirectionalLight {
            illuminance: 11_000.0,
            shadows_enabled: quality.profile().shadows_enabled,
            ..default()
        },
        Transform::from_translation(Vec3::new(420.0, 160.0, 180.0)).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.6, 0.7, 0.9),
        brightness: 80.0,
        ..default()
    });

    info!(
        "Scene built: {} belt rocks, {} stars, textures {}",
        BELT_ROCK_COUNT,
        STAR_COUNT,
        if textures.ready { "resolved" } else { "pending" }
    );
}

/// Removes every set piece.  Asteroid, camera and effect entities are owned
/// and cleaned up by their own modules on the same state exit.
pub fn teardown_scene(mut commands: Commands, pieces: Query<Entity, With<ScenePiece>>) {
    let count = pieces.iter().count();
    for entity in pieces.iter() {
        commands.entity(entity).despawn();
    }
    if count > 0 {
        info!("Scene torn down ({count} entities)");
    }
}

// ── Ambient motion ────────────────────────────────────────────────────────────

/// Planet and cloud rotation as functions of elapsed time.  The cloud period
/// is shorter, so the deck visibly slides over the ground.
#[allow(clippy::type_complexity)]
pub fn spin_planet_and_clouds(
    time: Res<Time>,
    config: Res<EngineConfig>,
    mut planets: Query<&mut Transform, (With<Planet>, Without<CloudShell>)>,
    mut clouds: Query<&mut Transform, (With<CloudShell>, Without<Planet>)>,
) {
    let t = time.elapsed_secs();
    let planet_angle = t / config.planet_rotation_secs.max(1.0) * std::f32::consts::TAU;
    let cloud_angle = t / config.cloud_rotation_secs.max(1.0) * std::f32::consts::TAU;
    for mut transform in planets.iter_mut() {
        transform.rotation = Quat::from_rotation_y(planet_angle);
    }
    for mut transform in clouds.iter_mut() {
        transform.rotation = Quat::from_rotation_y(cloud_angle);
    }
}

/// Moon orbit: inclined circle around the planet, plus its own slow spin,
/// both pure functions of wall-clock time.
pub fn orbit_moon(
    time: Res<Time>,
    config: Res<EngineConfig>,
    mut moons: Query<&mut Transform, With<Moon>>,
) {
    let t = time.elapsed_secs();
    let angle = t / config.moon_orbit_secs.max(1.0) * std::f32::consts::TAU;
    let flat = Vec3::new(angle.cos(), 0.0, angle.sin()) * MOON_ORBIT_RADIUS;
    let position = Quat::from_rotation_x(MOON_ORBIT_INCLINATION) * flat;
    let spin = Quat::from_rotation_y(t / MOON_SPIN_SECS * std::f32::consts::TAU);
    for mut transform in moons.iter_mut() {
        transform.translation = position;
        transform.rotation = spin;
    }
}

/// Belt drift, same wall-clock scheme as the moon.
pub fn drift_belt(time: Res<Time>, mut rocks: Query<(&BeltRock, &mut Transform)>) {
    let t = time.elapsed_secs();
    for (rock, mut transform) in rocks.iter_mut() {
        let angle = rock.phase + t * rock.angular_speed;
        transform.translation = Vec3::new(
            angle.cos() * rock.radius,
            rock.height,
            angle.sin() * rock.radius,
        );
        transform.rotation = Quat::from_rotation_y(t * rock.spin_rate + rock.phase);
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct SceneBuilderPlugin;

impl Plugin for SceneBuilderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(EngineState::Running), build_scene)
            .add_systems(OnExit(EngineState::Running), teardown_scene)
            .add_systems(
                Update,
                (spin_planet_and_clouds, orbit_moon, drift_belt)
                    .run_if(in_state(EngineState::Running)),
            );
    }
}
