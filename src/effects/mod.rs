//! Impact effects subsystem.
//!
//! Four visual families spawn together off one [`ImpactOccurred`] message
//! and then run concurrently, each cleaning up after itself:
//!
//! | Family     | Module      | Lifetime control                          |
//! |------------|-------------|-------------------------------------------|
//! | explosion  | `explosion` | four time-offset color stages, per-particle lifetime |
//! | debris     | `debris`    | three size classes, bounce off the surface |
//! | shockwave  | `shockwave` | one expanding ring, fixed duration        |
//! | flash      | here        | atmosphere shell alpha pulse              |
//!
//! None of these gate the run state machine; the camera reset is scheduled
//! on its own fixed hold and effects may outlive the visible run.  Camera
//! shake is driven here too, as a decaying offset the rig composes on top of
//! whatever owns the camera.
//!
//! Particle counts scale with the effective quality tier and the configured
//! particle multiplier, and the total spawn per impact is capped by the
//! tier's particle budget.

pub mod debris;
pub mod explosion;
pub mod shockwave;

use crate::camera::CameraRig;
use crate::config::EngineConfig;
use crate::constants::*;
use crate::params::SimulationParameters;
use crate::quality::ActiveQuality;
use crate::scene::AtmosphereShell;
use crate::textures::EngineState;
use bevy::prelude::*;
use rand::Rng;

// ── Messages & markers ────────────────────────────────────────────────────────

/// Fired by the animation driver on the frame the body strikes the surface.
#[derive(Message, Debug, Clone, Copy)]
pub struct ImpactOccurred {
    /// Strike point on the planet surface.
    pub position: Vec3,
    /// Outward surface normal at the strike point.
    pub normal: Vec3,
    /// Parameters the run was launched with.
    pub params: SimulationParameters,
}

/// Marker on every entity the subsystem spawns, for teardown sweeps.
#[derive(Component)]
pub struct ImpactEffect;

// ── Camera shake ──────────────────────────────────────────────────────────────

/// Decaying random camera offset, re-rolled on a fixed interval.
#[derive(Resource, Debug, Default)]
pub struct CameraShake {
    pub active: bool,
    pub remaining: u32,
    pub magnitude: f32,
    timer: f32,
}

/// Shake amplitude grows with impact energy and is clamped to stay readable.
pub fn shake_magnitude(velocity_kms: f32, size_m: f32) -> f32 {
    (velocity_kms * size_m * SHAKE_MAGNITUDE_FACTOR).clamp(SHAKE_MIN_MAGNITUDE, SHAKE_MAX_MAGNITUDE)
}

impl CameraShake {
    pub fn trigger(&mut self, velocity_kms: f32, size_m: f32) {
        self.active = true;
        self.remaining = SHAKE_REPEATS;
        self.magnitude = shake_magnitude(velocity_kms, size_m);
        self.timer = 0.0;
    }
}

/// Re-rolls the shake offset every interval and damps the amplitude until
/// the repeat count runs out, then zeroes the offset.
pub fn drive_camera_shake(
    time: Res<Time>,
    mut shake: ResMut<CameraShake>,
    mut rig: ResMut<CameraRig>,
) {
    if !shake.active {
        return;
    }
    shake.timer -= time.delta_secs();
    if shake.timer > 0.0 {
        return;
    }
    shake.timer += SHAKE_INTERVAL_SECS;

    if shake.remaining == 0 {
        shake.active = false;
        shake.magnitude = 0.0;
        rig.shake_offset = Vec3::ZERO;
        return;
    }
    shake.remaining -= 1;

    let mut rng = rand::thread_rng();
    rig.shake_offset = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    ) * shake.magnitude;
    shake.magnitude *= SHAKE_DAMPING;
}

// ── Atmospheric flash ─────────────────────────────────────────────────────────

/// Whole-sky pulse: a sharp spike to peak alpha, then an exponential decay
/// back to each shell's baseline.
#[derive(Resource, Debug, Default)]
pub struct FlashPulse {
    pub active: bool,
    pub age: f32,
}

impl FlashPulse {
    pub fn trigger(&mut self) {
        self.active = true;
        self.age = 0.0;
    }
}

/// Alpha added on top of the shell baselines at the given pulse age.
pub fn flash_boost(age: f32) -> f32 {
    if age <= FLASH_SPIKE_SECS {
        FLASH_PEAK_ALPHA * (age / FLASH_SPIKE_SECS)
    } else {
        FLASH_PEAK_ALPHA * (-(3.0 * (age - FLASH_SPIKE_SECS) / FLASH_DECAY_SECS)).exp()
    }
}

pub fn pulse_atmosphere_flash(
    time: Res<Time>,
    mut flash: ResMut<FlashPulse>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    shells: Query<(&AtmosphereShell, &MeshMaterial3d<StandardMaterial>)>,
) {
    if !flash.active {
        return;
    }
    flash.age += time.delta_secs();
    let boost = flash_boost(flash.age);
    let finished = flash.age > FLASH_SPIKE_SECS && boost < 0.005;

    for (shell, handle) in shells.iter() {
        if let Some(material) = materials.get_mut(&handle.0) {
            let alpha = if finished {
                shell.baseline_alpha
            } else {
                shell.baseline_alpha + boost
            };
            material.base_color.set_alpha(alpha);
        }
    }
    if finished {
        flash.active = false;
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

/// Consumes impact messages and launches all four families plus the shake,
/// staying inside the quality tier's particle budget.
#[allow(clippy::too_many_arguments)]
pub fn spawn_impact_effects(
    mut impacts: MessageReader<ImpactOccurred>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut shake: ResMut<CameraShake>,
    mut flash: ResMut<FlashPulse>,
    quality: Res<ActiveQuality>,
    config: Res<EngineConfig>,
) {
    for impact in impacts.read() {
        let profile = quality.profile();
        let budget = profile.particle_budget as usize;
        let explosion_count = ((profile.explosion_particle_count as f32 * config.particle_scale)
            .round() as usize)
            .min(budget);
        let class_scale = profile.particle_count_scale() * config.particle_scale;

        let spawned = explosion::spawn_explosion(
            &mut commands,
            &mut meshes,
            &mut materials,
            impact,
            explosion_count,
        );
        let debris_budget = budget.saturating_sub(spawned);
        let fragments = debris::spawn_debris_field(
            &mut commands,
            &mut meshes,
            &mut materials,
            impact,
            class_scale,
            debris_budget,
        );
        shockwave::spawn_shockwave(&mut commands, &mut meshes, &mut materials, impact, &config);
        shake.trigger(impact.params.velocity_kms, impact.params.size_m);
        flash.trigger();

        info!(
            "Impact effects: {spawned} explosion particles, {fragments} fragments at ({:.0}, {:.0}, {:.0})",
            impact.position.x, impact.position.y, impact.position.z
        );
    }
}

/// Teardown sweep; also silences the shake and flash so a rebuilt scene
/// starts quiet.
pub fn cleanup_effects(
    mut commands: Commands,
    mut shake: ResMut<CameraShake>,
    mut flash: ResMut<FlashPulse>,
    mut rig: ResMut<CameraRig>,
    effects: Query<Entity, With<ImpactEffect>>,
) {
    for entity in effects.iter() {
        commands.entity(entity).despawn();
    }
    *shake = CameraShake::default();
    *flash = FlashPulse::default();
    rig.shake_offset = Vec3::ZERO;
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct ImpactEffectsPlugin;

impl Plugin for ImpactEffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ImpactOccurred>()
            .init_resource::<CameraShake>()
            .init_resource::<FlashPulse>()
            .add_systems(
                Update,
                (
                    spawn_impact_effects.after(crate::animation::detect_impact),
                    explosion::ignite_pending_stages,
                    explosion::update_explosion_particles,
                    debris::update_debris,
                    shockwave::update_shockwaves,
                    pulse_atmosphere_flash,
                    drive_camera_shake.before(crate::camera::compose_camera_transform),
                )
                    .run_if(in_state(EngineState::Running)),
            )
            .add_systems(OnExit(EngineState::Running), cleanup_effects);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shake amplitude scales with impact energy between the clamp bounds.
    #[test]
    fn shake_magnitude_scales_and_clamps() {
        let default_run = shake_magnitude(20.0, 100.0);
        assert!((default_run - 0.4).abs() < 1e-6);
        assert_eq!(
            shake_magnitude(20.0, 10_000.0),
            SHAKE_MAX_MAGNITUDE,
            "planet-killer impacts hit the ceiling"
        );
        assert_eq!(
            shake_magnitude(1.0, 1.0),
            SHAKE_MIN_MAGNITUDE,
            "tiny impacts still register"
        );
    }

    /// The flash ramps to its peak inside the spike window and decays toward
    /// zero afterwards, never going negative.
    #[test]
    fn flash_envelope_spikes_then_decays() {
        assert_eq!(flash_boost(0.0), 0.0);
        assert!((flash_boost(FLASH_SPIKE_SECS) - FLASH_PEAK_ALPHA).abs() < 1e-6);

        let early = flash_boost(FLASH_SPIKE_SECS + 0.2);
        let late = flash_boost(FLASH_SPIKE_SECS + 1.5);
        assert!(early < FLASH_PEAK_ALPHA);
        assert!(late < early, "decay must be monotone");
        assert!(late >= 0.0);
        assert!(
            flash_boost(FLASH_SPIKE_SECS + FLASH_DECAY_SECS * 3.0) < 0.005,
            "pulse ends well below visibility"
        );
    }

    #[test]
    fn triggered_shake_is_armed() {
        let mut shake = CameraShake::default();
        assert!(!shake.active);
        shake.trigger(19.0, 20.0);
        assert!(shake.active);
        assert_eq!(shake.remaining, SHAKE_REPEATS);
        assert!(shake.magnitude >= SHAKE_MIN_MAGNITUDE);
    }
}
