//! Animation driver for the impact run.
//!
//! A single resource, [`ImpactRun`], steps through the run's phases once per
//! frame:
//!
//! | Phase         | Entered when                                        | Exits to           |
//! |---------------|-----------------------------------------------------|--------------------|
//! | `Idle`        | startup, and again once a reset converges           | `Approaching`      |
//! | `Approaching` | run signal edge with a fresh parameter fingerprint  | `Entry` / `Impact` |
//! | `Entry`       | altitude drops below the atmospheric glow threshold | `Impact`           |
//! | `Impact`      | progress reaches 1 or the body touches the surface  | `Resetting`        |
//! | `Resetting`   | the post-impact hold elapses                         | `Idle`             |
//!
//! The external run signal is a level with edge-triggered semantics: only a
//! false→true transition paired with a parameter fingerprint that differs
//! from the previous run's starts a run, so repeated signals without an edit
//! produce exactly one run.  [`RunCommand`] messages (the in-scene Run
//! control) skip the fingerprint gate but never interrupt a run in flight;
//! requests arriving mid-run are dropped, not queued.
//!
//! The trajectory aims past the planet, so the surface-distance check is the
//! collision detector that usually fires, partway along the chord.  Progress
//! reaching 1 is the backstop.  Both are evaluated every frame.

use crate::asteroid::{AsteroidBody, EntryTrailCone};
use crate::camera::{CameraControl, CameraMode, CameraOwner, CameraRig};
use crate::config::EngineConfig;
use crate::constants::*;
use crate::effects::ImpactOccurred;
use crate::params::{RunSignal, SimulationParameters};
use crate::quality::ActiveQuality;
use crate::textures::EngineState;
use crate::trajectory::TrajectoryPath;
use bevy::prelude::*;
use std::collections::VecDeque;

// ── Run state ─────────────────────────────────────────────────────────────────

/// Phase of the active (or absent) impact run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Approaching,
    Entry,
    Impact,
    Resetting,
}

/// Per-run state machine plus the bits that persist between runs (the last
/// fingerprint for dedup and the completed-run counter for telemetry).
#[derive(Resource, Debug, Default)]
pub struct ImpactRun {
    pub phase: RunPhase,
    /// Normalized position along the trajectory, monotone in [0, 1].
    pub progress: f32,
    /// Seconds since the run started.
    pub elapsed: f32,
    /// Total approach time for this run, velocity-scaled and floored.
    pub duration: f32,
    /// Camera mode snapshotted when the run started.
    pub camera_mode: CameraMode,
    /// Parameters snapshotted when the run started.  The live resource may
    /// be edited mid-run; the run keeps flying the values it launched with.
    pub params: SimulationParameters,
    /// Recent positions for the fading trail, oldest first.
    pub trail: VecDeque<Vec3>,
    /// Fingerprint of the last started run, for duplicate-signal dedup.
    pub last_fingerprint: Option<u64>,
    /// Previous frame's signal level, for edge detection.
    signal_level: bool,
    /// Countdown from impact to the start of the camera reset.
    pub hold_remaining: f32,
    /// Surface point where the body struck, valid from `Impact` onward.
    pub impact_point: Vec3,
    pub runs_completed: u32,
}

impl ImpactRun {
    pub fn is_idle(&self) -> bool {
        self.phase == RunPhase::Idle
    }

    /// True while the body is still flying (before impact).
    pub fn is_airborne(&self) -> bool {
        matches!(self.phase, RunPhase::Approaching | RunPhase::Entry)
    }
}

/// Approach duration in seconds: inversely proportional to velocity, floored
/// so even extreme speeds stay watchable.
pub fn run_duration(velocity_kms: f32, factor: f32, min_secs: f32) -> f32 {
    (factor / velocity_kms.max(f32::EPSILON)).max(min_secs)
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Programmatic run request from the in-scene Run control.  Starts a run
/// when idle regardless of whether the parameters changed.
#[derive(Message, Debug, Default)]
pub struct RunCommand;

/// Fired once per run, after the camera reset converges.
#[derive(Message, Debug)]
pub struct RunCompleted {
    pub total_runs: u32,
}

/// Marks the transient atmospheric-entry point light.
#[derive(Component)]
pub struct EntryGlow;

// ── Systems ───────────────────────────────────────────────────────────────────

/// Idle → Approaching.  Consumes the signal edge and any queued commands;
/// requests that arrive while a run is in flight are discarded here, which
/// is what keeps duplicate signals from stacking runs.
pub fn start_requested_runs(
    mut run: ResMut<ImpactRun>,
    mut rig: ResMut<CameraRig>,
    mut control: ResMut<CameraControl>,
    mut commands_in: MessageReader<RunCommand>,
    signal: Res<RunSignal>,
    params: Res<SimulationParameters>,
    config: Res<EngineConfig>,
) {
    let level = signal.requested;
    let edge = level && !run.signal_level;
    run.signal_level = level;

    let commanded = !commands_in.is_empty();
    commands_in.clear();

    if !run.is_idle() {
        return;
    }
    let fingerprint = params.fingerprint();
    let fresh = run.last_fingerprint != Some(fingerprint);
    if !(commanded || (edge && fresh)) {
        return;
    }

    let p = params.sanitized();
    run.phase = RunPhase::Approaching;
    run.progress = 0.0;
    run.elapsed = 0.0;
    run.duration = run_duration(
        p.velocity_kms,
        config.run_duration_factor,
        config.run_min_duration_secs,
    );
    run.camera_mode = control.mode;
    run.params = p;
    run.trail.clear();
    run.last_fingerprint = Some(fingerprint);
    run.hold_remaining = config.impact_hold_secs;

    control.free_enabled = false;
    control.owner = CameraOwner::RunDriver;
    rig.pre_run = Some(rig.pose());
    rig.settled = false;

    info!(
        "Run started: {:.0} m at {:.1} km/s over {:.1} s ({:?} camera)",
        p.size_m, p.velocity_kms, run.duration, run.camera_mode
    );
}

/// Approaching/Entry kinematics: progress, interpolation, tumble, trail and
/// the trailing fire cone.
#[allow(clippy::type_complexity)]
pub fn advance_run(
    time: Res<Time>,
    mut run: ResMut<ImpactRun>,
    path: Res<TrajectoryPath>,
    quality: Res<ActiveQuality>,
    mut body_q: Query<(&AsteroidBody, &mut Transform), Without<EntryTrailCone>>,
    mut cone_q: Query<
        (&EntryTrailCone, &mut Transform, &mut Visibility),
        Without<AsteroidBody>,
    >,
) {
    if !run.is_airborne() {
        return;
    }

    run.elapsed += time.delta_secs();
    run.progress = (run.elapsed / run.duration.max(f32::EPSILON)).min(1.0);
    let position = path.start.lerp(path.end, run.progress);

    run.trail.push_back(position);
    let cap = quality.profile().trail_length;
    while run.trail.len() > cap {
        run.trail.pop_front();
    }

    let Ok((body, mut transform)) = body_q.single_mut() else {
        return;
    };
    transform.translation = position;
    transform.rotate(Quat::from_axis_angle(
        body.spin_axis,
        body.spin_rate * time.delta_secs(),
    ));

    let travel = (path.end - path.start).normalize_or(Vec3::NEG_X);
    for (cone, mut cone_transform, mut visibility) in cone_q.iter_mut() {
        cone_transform.translation =
            position - travel * (body.mesh_radius * 0.6 + cone.length * 0.5);
        cone_transform.rotation = Quat::from_rotation_arc(Vec3::Y, -travel);
        *visibility = Visibility::Visible;
    }
}

/// Approaching → Entry once altitude falls below the glow threshold: light
/// the body up with a hot emissive and hang a point light on it.
pub fn enter_atmosphere(
    mut run: ResMut<ImpactRun>,
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<EngineConfig>,
    body_q: Query<(&Transform, &MeshMaterial3d<StandardMaterial>), With<AsteroidBody>>,
) {
    if run.phase != RunPhase::Approaching {
        return;
    }
    let Ok((transform, material)) = body_q.single() else {
        return;
    };
    let altitude = transform.translation.length() - PLANET_RADIUS;
    if altitude > config.entry_glow_altitude {
        return;
    }

    run.phase = RunPhase::Entry;
    if let Some(material) = materials.get_mut(&material.0) {
        material.emissive = LinearRgba::rgb(6.0, 2.0, 0.4);
    }
    commands.spawn((
        EntryGlow,
        PointLight {
            color: Color::srgb(1.0, 0.6, 0.25),
            intensity: ENTRY_GLOW_INTENSITY,
            range: ENTRY_GLOW_RANGE,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(transform.translation),
    ));
    info!("Atmospheric entry at altitude {:.1}", altitude);
}

/// Keeps the entry light riding along with the body.
pub fn sync_entry_glow(
    run: Res<ImpactRun>,
    body_q: Query<&Transform, (With<AsteroidBody>, Without<EntryGlow>)>,
    mut glow_q: Query<&mut Transform, With<EntryGlow>>,
) {
    if run.phase != RunPhase::Entry {
        return;
    }
    let Ok(body) = body_q.single() else {
        return;
    };
    for mut transform in glow_q.iter_mut() {
        transform.translation = body.translation;
    }
}

/// Approaching/Entry → Impact.  The surface-distance check fires the moment
/// the body crosses the planet's surface along its chord; progress reaching
/// 1 is the backstop when the path never dips below the surface.  On the
/// transition the body and its glow disappear and the effects subsystem is
/// notified exactly once.
#[allow(clippy::type_complexity)]
pub fn detect_impact(
    mut run: ResMut<ImpactRun>,
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut impacts: MessageWriter<ImpactOccurred>,
    path: Res<TrajectoryPath>,
    mut body_q: Query<
        (&Transform, &mut Visibility, &MeshMaterial3d<StandardMaterial>),
        With<AsteroidBody>,
    >,
    mut cone_q: Query<&mut Visibility, (With<EntryTrailCone>, Without<AsteroidBody>)>,
    glow_q: Query<Entity, With<EntryGlow>>,
) {
    if !run.is_airborne() {
        return;
    }

    let position = match body_q.single() {
        Ok((transform, _, _)) => transform.translation,
        Err(_) => path.start.lerp(path.end, run.progress),
    };
    let struck_surface = position.length() <= PLANET_RADIUS;
    if !(struck_surface || run.progress >= 1.0) {
        return;
    }

    let surface_point = position.normalize_or(Vec3::Y) * PLANET_RADIUS;
    run.phase = RunPhase::Impact;
    run.impact_point = surface_point;

    if let Ok((_, mut visibility, material)) = body_q.single_mut() {
        *visibility = Visibility::Hidden;
        if let Some(material) = materials.get_mut(&material.0) {
            material.emissive = LinearRgba::BLACK;
        }
    }
    for mut visibility in cone_q.iter_mut() {
        *visibility = Visibility::Hidden;
    }
    for entity in glow_q.iter() {
        commands.entity(entity).despawn();
    }

    impacts.write(ImpactOccurred {
        position: surface_point,
        normal: surface_point.normalize_or(Vec3::Y),
        params: run.params,
    });
    info!(
        "Impact at progress {:.2} after {:.2} s ({})",
        run.progress,
        run.elapsed,
        if struck_surface {
            "surface contact"
        } else {
            "trajectory end"
        }
    );
}

/// Impact → Resetting on a fixed hold.  Effects keep playing on their own;
/// none of them gate this transition.
pub fn hold_after_impact(time: Res<Time>, mut run: ResMut<ImpactRun>) {
    if run.phase != RunPhase::Impact {
        return;
    }
    run.hold_remaining -= time.delta_secs();
    if run.hold_remaining <= 0.0 {
        run.phase = RunPhase::Resetting;
        info!("Hold elapsed, camera resetting");
    }
}

/// Resetting → Idle once the camera rig reports convergence.  Free camera
/// control comes back exactly once and the completion message fires; the
/// body reappears parked at the trajectory start, ready for a re-run.
pub fn finish_reset(
    mut run: ResMut<ImpactRun>,
    mut rig: ResMut<CameraRig>,
    mut control: ResMut<CameraControl>,
    mut completions: MessageWriter<RunCompleted>,
    path: Res<TrajectoryPath>,
    mut body_q: Query<(&mut Transform, &mut Visibility), With<AsteroidBody>>,
) {
    if run.phase != RunPhase::Resetting || !rig.settled {
        return;
    }

    run.phase = RunPhase::Idle;
    run.progress = 0.0;
    run.elapsed = 0.0;
    run.trail.clear();
    run.runs_completed += 1;

    rig.pre_run = None;
    control.free_enabled = true;
    control.owner = CameraOwner::UserFree;

    if let Ok((mut transform, mut visibility)) = body_q.single_mut() {
        transform.translation = path.start;
        *visibility = Visibility::Visible;
    }

    completions.write(RunCompleted {
        total_runs: run.runs_completed,
    });
    info!("Run complete ({} total)", run.runs_completed);
}

/// Aborts any in-flight run on teardown.  The fingerprint and the completed
/// counter survive; everything ephemeral about the run does not, including a
/// glow light stranded mid-entry.
pub fn reset_run_on_teardown(
    mut run: ResMut<ImpactRun>,
    mut control: ResMut<CameraControl>,
    mut commands: Commands,
    glow_q: Query<Entity, With<EntryGlow>>,
) {
    for entity in glow_q.iter() {
        commands.entity(entity).despawn();
    }
    run.phase = RunPhase::Idle;
    run.progress = 0.0;
    run.elapsed = 0.0;
    run.trail.clear();
    run.hold_remaining = 0.0;
    control.free_enabled = true;
    control.owner = CameraOwner::UserFree;
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers the run state machine and its per-frame drivers, strictly
/// ordered so every transition is evaluated once per frame.
pub struct AnimationDriverPlugin;

impl Plugin for AnimationDriverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ImpactRun>()
            .init_resource::<TrajectoryPath>()
            .init_resource::<RunSignal>()
            .init_resource::<SimulationParameters>()
            .add_message::<RunCommand>()
            .add_message::<RunCompleted>()
            .add_systems(
                Update,
                (
                    start_requested_runs,
                    advance_run,
                    enter_atmosphere,
                    sync_entry_glow,
                    detect_impact,
                    hold_after_impact,
                    finish_reset,
                )
                    .chain()
                    .run_if(in_state(EngineState::Running)),
            )
            .add_systems(OnExit(EngineState::Running), reset_run_on_teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Duration scales inversely with velocity until the floor kicks in.
    #[test]
    fn duration_scales_inversely_and_floors() {
        assert_eq!(run_duration(20.0, 90.0, 3.0), 4.5);
        assert_eq!(run_duration(5.0, 90.0, 3.0), 18.0);
        assert_eq!(run_duration(60.0, 90.0, 3.0), 3.0, "fast runs hit the floor");
        assert_eq!(run_duration(0.0, 90.0, 3.0).is_finite(), true);
    }

    #[test]
    fn fresh_run_state_is_idle() {
        let run = ImpactRun::default();
        assert!(run.is_idle());
        assert!(!run.is_airborne());
        assert_eq!(run.progress, 0.0);
        assert_eq!(run.runs_completed, 0);
        assert!(run.trail.is_empty());
        assert!(run.last_fingerprint.is_none());
    }

    #[test]
    fn airborne_covers_both_flight_phases() {
        let mut run = ImpactRun::default();
        for phase in [RunPhase::Approaching, RunPhase::Entry] {
            run.phase = phase;
            assert!(run.is_airborne());
            assert!(!run.is_idle());
        }
        for phase in [RunPhase::Impact, RunPhase::Resetting, RunPhase::Idle] {
            run.phase = phase;
            assert!(!run.is_airborne());
        }
    }
}
