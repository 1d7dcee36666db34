//! Procedural asteroid factory.
//!
//! Every asteroid starts as a UV sphere and is roughed up by a deterministic
//! per-vertex displacement along the vertex normal: low-frequency bumps give
//! the silhouette its lumpy outline, a squared high-frequency term carves
//! crater-like depressions, and a small hashed jitter breaks up the remaining
//! regularity.  A perfect sphere reads as obviously fake at close camera
//! range; the displaced body does not.
//!
//! The displacement pipeline is plain functions over vertex arrays, so the
//! geometry invariants are unit-testable without any GPU or ECS
//! involvement.  Randomness is seeded from the parameter fingerprint, which
//! means a given parameter set always regenerates the identical rock.
//!
//! One asteroid lives at a time.  [`regenerate_asteroid`] watches for
//! parameter edits while the driver is idle, despawns the previous body, and
//! spawns the replacement together with its freshly computed trajectory.

use crate::animation::ImpactRun;
use crate::config::EngineConfig;
use crate::constants::*;
use crate::params::{Composition, SimulationParameters};
use crate::quality::ActiveQuality;
use crate::textures::TextureSet;
use crate::trajectory::compute_trajectory;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ── Components & resources ────────────────────────────────────────────────────

/// The single live asteroid body.
#[derive(Component, Debug, Clone, Copy)]
pub struct AsteroidBody {
    /// Tumble axis (unit length), fixed per instance.
    pub spin_axis: Vec3,
    /// Tumble rate in radians/second, velocity-scaled.
    pub spin_rate: f32,
    /// Deformed mesh base radius in world units.
    pub mesh_radius: f32,
}

/// The cone-shaped trailing glow attached for fast entries.  Positioned by
/// the animation driver every frame so it never inherits the body's tumble.
#[derive(Component, Debug, Clone, Copy)]
pub struct EntryTrailCone {
    /// Cone length in world units, used when centring it behind the body.
    pub length: f32,
}

/// Fingerprint of the parameter set the current asteroid was built from.
/// `None` until the first spawn.
#[derive(Resource, Debug, Default)]
pub struct SpawnedFingerprint(pub Option<u64>);

// ── Pure geometry pipeline ────────────────────────────────────────────────────

/// Raw UV-sphere geometry before displacement.
#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Generate a UV sphere with `sectors` longitudinal and `stacks` latitudinal
/// subdivisions.  The seam column is duplicated for clean texture wrapping,
/// so there are `(stacks + 1) * (sectors + 1)` vertices.
pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> SphereGeometry {
    let mut positions = Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());

    for stack in 0..=stacks {
        let v = stack as f32 / stacks as f32;
        let phi = v * std::f32::consts::PI;
        for sector in 0..=sectors {
            let u = sector as f32 / sectors as f32;
            // The seam column copies sector 0's position verbatim rather
            // than evaluating sin/cos at TAU, which is not bit-identical to
            // 0 and would give the position-keyed jitter two different keys.
            let position = if sector == sectors {
                positions[positions.len() - sectors as usize]
            } else {
                let theta = u * std::f32::consts::TAU;
                [
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                ]
            };
            positions.push(position);
            uvs.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity((stacks * sectors * 6) as usize);
    let row = sectors + 1;
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * row + sector;
            let b = a + row;
            // Counter-clockwise from outside, so face normals point outward.
            indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }

    SphereGeometry {
        positions,
        uvs,
        indices,
    }
}

/// Hash a vertex position and the instance seed into a jitter sample in
/// [-1, 1).  Keyed by position rather than index so the duplicated seam
/// column (same position, different UV) jitters identically and the mesh
/// stays watertight.  Same FNV-1a mix as the parameter fingerprint.
fn position_jitter(seed: u64, position: [f32; 3]) -> f32 {
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    for component in position {
        for b in component.to_bits().to_le_bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    // Top 24 bits give a clean mantissa-sized sample in [0, 1).
    ((hash >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
}

/// Displace every vertex along its own normal by the multi-frequency surface
/// function.  `base_radius` is the undisplaced sphere radius; `seed` selects
/// the jitter pattern.
///
/// Displacement stays within ±(BUMP + CRATER + JITTER) amplitudes of the base
/// radius, floored so no vertex can cross the origin and invert a triangle.
pub fn displace_surface(positions: &mut [[f32; 3]], base_radius: f32, seed: u64) {
    for position in positions.iter_mut() {
        let p = Vec3::from_array(*position);
        let n = p.normalize_or(Vec3::Y);

        let bump = (n.x * BUMP_FREQUENCY + 0.9).sin()
            * (n.y * BUMP_FREQUENCY + 2.3).sin()
            * (n.z * BUMP_FREQUENCY + 4.1).sin()
            * BUMP_AMPLITUDE;

        let crater_wave = (n.x * CRATER_FREQUENCY).sin()
            * (n.y * CRATER_FREQUENCY).sin()
            * (n.z * CRATER_FREQUENCY).sin();
        let crater = -crater_wave * crater_wave * CRATER_AMPLITUDE;

        let jitter = position_jitter(seed, n.to_array()) * JITTER_AMPLITUDE;

        let scale = (1.0 + bump + crater + jitter).max(0.35);
        *position = (n * base_radius * scale).to_array();
    }
}

/// Recompute smooth per-vertex normals by area-weighted face accumulation.
/// Degenerate accumulations fall back to the radial direction.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let pa = Vec3::from_array(positions[a]);
        let pb = Vec3::from_array(positions[b]);
        let pc = Vec3::from_array(positions[c]);
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    accum
        .iter()
        .zip(positions)
        .map(|(n, p)| {
            n.try_normalize()
                .unwrap_or_else(|| Vec3::from_array(*p).normalize_or(Vec3::Y))
                .to_array()
        })
        .collect()
}

/// Assemble the displaced geometry into a renderable [`Mesh`].
pub fn asteroid_mesh(geometry: &SphereGeometry) -> Mesh {
    let normals = smooth_normals(&geometry.positions, &geometry.indices);
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, geometry.uvs.clone());
    mesh.insert_indices(Indices::U32(geometry.indices.clone()));
    mesh
}

/// Build the full deformed asteroid geometry for one parameter set.
pub fn build_asteroid_geometry(params: &SimulationParameters, mesh_detail: u32) -> SphereGeometry {
    let radius = params.mesh_radius();
    let sectors = mesh_detail.max(8);
    let stacks = (mesh_detail * 2 / 3).max(6);
    let mut geometry = uv_sphere(radius, sectors, stacks);
    displace_surface(&mut geometry.positions, radius, params.fingerprint());
    geometry
}

// ── Materials ─────────────────────────────────────────────────────────────────

/// Surface material for a composition, tinting the shared asteroid texture
/// when it loaded and falling back to the flat color when it did not.
pub fn composition_material(
    composition: Composition,
    surface_texture: Option<Handle<Image>>,
) -> StandardMaterial {
    let (base_color, perceptual_roughness, metallic, reflectance) = match composition {
        Composition::Rock => (Color::srgb(0.42, 0.33, 0.24), 0.95, 0.02, 0.25),
        Composition::Metal => (Color::srgb(0.56, 0.56, 0.60), 0.35, 0.85, 0.60),
        Composition::Ice => (Color::srgb(0.78, 0.88, 0.95), 0.15, 0.0, 0.55),
        Composition::Mixed => (Color::srgb(0.50, 0.42, 0.33), 0.65, 0.40, 0.40),
    };
    StandardMaterial {
        base_color,
        base_color_texture: surface_texture,
        perceptual_roughness,
        metallic,
        reflectance,
        ..default()
    }
}

/// Emissive material for the entry-trail cone: additive, double-sided, with
/// an HDR emissive push so it blooms against the dark sky.
fn trail_cone_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgba(1.0, 0.55, 0.15, 0.35),
        emissive: LinearRgba::rgb(8.0, 3.2, 0.8),
        alpha_mode: AlphaMode::Add,
        unlit: true,
        cull_mode: None,
        double_sided: true,
        ..default()
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

/// Spawn a freshly generated asteroid at the trajectory start, plus the trail
/// cone when the approach is fast enough to burn.
#[allow(clippy::too_many_arguments)]
pub fn spawn_asteroid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    params: &SimulationParameters,
    start: Vec3,
    mesh_detail: u32,
    surface_texture: Option<Handle<Image>>,
    fireball_threshold: f32,
) -> Entity {
    let p = params.sanitized();
    let radius = p.mesh_radius();
    let geometry = build_asteroid_geometry(&p, mesh_detail);

    let mut rng = ChaCha8Rng::seed_from_u64(p.fingerprint() ^ 0x5eed);
    let spin_axis = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
    .normalize_or(Vec3::Y);

    let body = commands
        .spawn((
            AsteroidBody {
                spin_axis,
                spin_rate: SPIN_BASE_RATE + p.velocity_kms * SPIN_VELOCITY_FACTOR,
                mesh_radius: radius,
            },
            Mesh3d(meshes.add(asteroid_mesh(&geometry))),
            MeshMaterial3d(materials.add(composition_material(p.composition, surface_texture))),
            Transform::from_translation(start),
            Visibility::Visible,
        ))
        .id();

    if p.velocity_kms > fireball_threshold {
        let length = radius * TRAIL_CONE_LENGTH_FACTOR;
        commands.spawn((
            EntryTrailCone { length },
            Mesh3d(meshes.add(Cone {
                radius: radius * TRAIL_CONE_RADIUS_FACTOR,
                height: length,
            })),
            MeshMaterial3d(materials.add(trail_cone_material())),
            Transform::from_translation(start),
            Visibility::Hidden,
        ));
    }

    body
}

/// Replace the asteroid (and trajectory) when the parameters changed while
/// the driver is idle.  Mid-run edits are deliberately left pending here and
/// picked up on the frame the run returns to idle.  The previous instance is
/// despawned before the replacement spawns.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn regenerate_asteroid(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut spawned: ResMut<SpawnedFingerprint>,
    params: Res<SimulationParameters>,
    run: Res<ImpactRun>,
    quality: Res<ActiveQuality>,
    textures: Res<TextureSet>,
    config: Res<EngineConfig>,
    existing: Query<Entity, Or<(With<AsteroidBody>, With<EntryTrailCone>)>>,
) {
    if !run.is_idle() {
        return;
    }
    let fingerprint = params.fingerprint();
    if spawned.0 == Some(fingerprint) {
        return;
    }

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let path = compute_trajectory(&params);
    spawn_asteroid(
        &mut commands,
        &mut meshes,
        &mut materials,
        &params,
        path.start,
        quality.profile().mesh_detail,
        textures.asteroid_surface.clone(),
        config.fireball_velocity_threshold,
    );
    commands.insert_resource(path);
    spawned.0 = Some(fingerprint);

    let p = params.sanitized();
    info!(
        "Asteroid regenerated: {:.0} m {} at {:.1} km/s, entry {:.0}°, start {:.0} u out",
        p.size_m,
        p.composition.name(),
        p.velocity_kms,
        p.entry_angle_deg,
        path.start.length()
    );
}

/// Removes the body and cone on teardown and clears the fingerprint so the
/// next scene build respawns from scratch.
pub fn despawn_on_teardown(
    mut commands: Commands,
    mut spawned: ResMut<SpawnedFingerprint>,
    existing: Query<Entity, Or<(With<AsteroidBody>, With<EntryTrailCone>)>>,
) {
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }
    spawned.0 = None;
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers asteroid bookkeeping and the idle regeneration watcher.
pub struct AsteroidFactoryPlugin;

impl Plugin for AsteroidFactoryPlugin {
    fn build(&self, app: &mut App) {
        use crate::textures::EngineState;
        app.init_resource::<SpawnedFingerprint>()
            .add_systems(
                Update,
                regenerate_asteroid.run_if(in_state(EngineState::Running)),
            )
            .add_systems(OnExit(EngineState::Running), despawn_on_teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Composition;

    /// Vertex and index counts follow the UV-sphere layout formulas.
    #[test]
    fn uv_sphere_counts_match_subdivisions() {
        let geometry = uv_sphere(10.0, 24, 16);
        assert_eq!(geometry.positions.len(), 25 * 17);
        assert_eq!(geometry.uvs.len(), geometry.positions.len());
        assert_eq!(geometry.indices.len(), (24 * 16 * 6) as usize);
        let max_index = *geometry.indices.iter().max().unwrap() as usize;
        assert!(
            max_index < geometry.positions.len(),
            "indices must stay inside the vertex array"
        );
    }

    /// The index buffer winds counter-clockwise seen from outside: the mesh
    /// encloses positive signed volume, so face normals (and the culled back
    /// faces) point away from the body.
    #[test]
    fn uv_sphere_winds_outward() {
        let geometry = uv_sphere(10.0, 16, 12);
        let mut six_volumes = 0.0_f64;
        for triangle in geometry.indices.chunks_exact(3) {
            let pa = Vec3::from_array(geometry.positions[triangle[0] as usize]);
            let pb = Vec3::from_array(geometry.positions[triangle[1] as usize]);
            let pc = Vec3::from_array(geometry.positions[triangle[2] as usize]);
            six_volumes += f64::from(pa.dot(pb.cross(pc)));
        }
        assert!(
            six_volumes > 0.0,
            "signed volume {six_volumes} not positive, triangles wind inward"
        );
    }

    /// The duplicated seam column carries sector 0's position bit for bit,
    /// so anything keyed on position bits treats both copies as one vertex.
    #[test]
    fn seam_column_is_bit_identical_to_sector_zero() {
        let sectors = 16;
        let stacks = 12;
        let geometry = uv_sphere(10.0, sectors, stacks);
        let row = (sectors + 1) as usize;
        for stack in 0..=stacks as usize {
            assert_eq!(
                geometry.positions[stack * row],
                geometry.positions[stack * row + sectors as usize],
                "seam copies differ at stack {stack}"
            );
        }
    }

    /// Before displacement every vertex sits exactly on the sphere.
    #[test]
    fn uv_sphere_vertices_sit_on_the_radius() {
        let radius = 7.5;
        let geometry = uv_sphere(radius, 16, 12);
        for p in &geometry.positions {
            let r = Vec3::from_array(*p).length();
            assert!(
                (r - radius).abs() < 1e-3,
                "undisplaced vertex at radius {r}, expected {radius}"
            );
        }
    }

    /// Displacement keeps the vertex count and stays inside the documented
    /// amplitude envelope around the base radius.
    #[test]
    fn displacement_stays_within_amplitude_envelope() {
        let radius = 10.0;
        let mut geometry = uv_sphere(radius, 24, 16);
        let count_before = geometry.positions.len();
        displace_surface(&mut geometry.positions, radius, 42);
        assert_eq!(geometry.positions.len(), count_before);

        let max_off = BUMP_AMPLITUDE + CRATER_AMPLITUDE + JITTER_AMPLITUDE;
        for p in &geometry.positions {
            let r = Vec3::from_array(*p).length();
            assert!(
                r >= radius * (1.0 - max_off) - 1e-3 && r <= radius * (1.0 + max_off) + 1e-3,
                "vertex radius {r} escaped the envelope around {radius}"
            );
        }
    }

    /// The displaced body is genuinely irregular, not still a sphere.
    #[test]
    fn displacement_produces_an_irregular_silhouette() {
        let radius = 10.0;
        let mut geometry = uv_sphere(radius, 24, 16);
        displace_surface(&mut geometry.positions, radius, 7);
        let radii: Vec<f32> = geometry
            .positions
            .iter()
            .map(|p| Vec3::from_array(*p).length())
            .collect();
        let min = radii.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = radii.iter().cloned().fold(0.0, f32::max);
        assert!(
            max - min > radius * 0.1,
            "radial spread {:.3} too small, surface still reads as a sphere",
            max - min
        );
    }

    /// Same seed, same rock; different seed, different rock.
    #[test]
    fn displacement_is_seed_deterministic() {
        let radius = 10.0;
        let base = uv_sphere(radius, 16, 12);

        let mut a = base.positions.clone();
        let mut b = base.positions.clone();
        displace_surface(&mut a, radius, 1234);
        displace_surface(&mut b, radius, 1234);
        assert_eq!(a, b, "identical seeds must reproduce the identical mesh");

        let mut c = base.positions.clone();
        displace_surface(&mut c, radius, 9999);
        assert_ne!(a, c, "different seeds must produce different jitter");
    }

    /// The duplicated UV seam column must displace identically on both
    /// copies, or the mesh tears open along the seam.
    #[test]
    fn seam_vertices_displace_identically() {
        let radius = 10.0;
        let sectors = 16;
        let stacks = 12;
        let mut geometry = uv_sphere(radius, sectors, stacks);
        displace_surface(&mut geometry.positions, radius, 77);

        let row = (sectors + 1) as usize;
        for stack in 0..=stacks as usize {
            let first = geometry.positions[stack * row];
            let seam = geometry.positions[stack * row + sectors as usize];
            for (a, b) in first.iter().zip(seam.iter()) {
                assert!(
                    (a - b).abs() < 1e-4,
                    "seam column drifted apart at stack {stack}"
                );
            }
        }
    }

    /// Recomputed normals are unit length and face outward on the displaced
    /// sphere.
    #[test]
    fn recomputed_normals_are_unit_and_outward() {
        let radius = 10.0;
        let mut geometry = uv_sphere(radius, 24, 16);
        displace_surface(&mut geometry.positions, radius, 3);
        let normals = smooth_normals(&geometry.positions, &geometry.indices);
        assert_eq!(normals.len(), geometry.positions.len());

        let mut outward = 0;
        for (n, p) in normals.iter().zip(&geometry.positions) {
            let n = Vec3::from_array(*n);
            assert!((n.length() - 1.0).abs() < 1e-3, "normal not unit length");
            if n.dot(Vec3::from_array(*p)) > 0.0 {
                outward += 1;
            }
        }
        assert!(
            outward as f32 > normals.len() as f32 * 0.95,
            "most normals must face outward, got {outward}/{}",
            normals.len()
        );
    }

    /// Each composition styles distinctly.
    #[test]
    fn compositions_style_distinct_materials() {
        let rock = composition_material(Composition::Rock, None);
        let metal = composition_material(Composition::Metal, None);
        let ice = composition_material(Composition::Ice, None);
        assert_ne!(rock.base_color, metal.base_color);
        assert_ne!(metal.base_color, ice.base_color);
        assert!(metal.metallic > rock.metallic);
        assert!(ice.perceptual_roughness < rock.perceptual_roughness);
    }

    /// Geometry generation is total over malformed parameters thanks to the
    /// sanitize + clamp path.
    #[test]
    fn malformed_parameters_still_build_geometry() {
        let params = SimulationParameters {
            size_m: -50.0,
            velocity_kms: f32::NAN,
            entry_angle_deg: 400.0,
            composition: Composition::Mixed,
        };
        let geometry = build_asteroid_geometry(&params, 24);
        assert!(!geometry.positions.is_empty());
        for p in &geometry.positions {
            assert!(Vec3::from_array(*p).is_finite());
        }
    }
}
