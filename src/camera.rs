//! Camera rig and ownership.
//!
//! The camera is shared mutable state, so exactly one actor may write it per
//! frame, tracked by an explicit owner token:
//!
//! | Owner       | Writes the rig when                                      |
//! |-------------|----------------------------------------------------------|
//! | `UserFree`  | idle, user dragging or zooming (default)                 |
//! | `AutoOrbit` | idle, auto-rotate enabled, user idle past the grace      |
//! | `RunDriver` | a run is in flight, through reset convergence            |
//!
//! All writers produce a base position and look target on [`CameraRig`]; a
//! single compose step at the end of the frame turns that into the camera
//! `Transform`, adding the impact shake offset on top.  Keeping shake out of
//! the base means it can never bleed into easing math or the reset
//! convergence check.
//!
//! The orbital pose is spherical (yaw, pitch, distance) around the planet.
//! Follow and cinematic modes drive the base position directly; the
//! spherical pose is left untouched during a run, which is exactly the
//! pre-run pose the reset eases back to.

use crate::animation::{ImpactRun, RunPhase};
use crate::config::EngineConfig;
use crate::constants::*;
use crate::textures::EngineState;
use crate::trajectory::TrajectoryPath;
use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;

// ── Resources ─────────────────────────────────────────────────────────────────

/// One of the three user-selectable camera behaviors for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    /// Free orbit around the planet; a run plays out in front of it.
    #[default]
    Orbital,
    /// Chase position behind the asteroid through the middle of the run.
    Follow,
    /// Three scripted framings: establishing, trailing, close impact.
    Cinematic,
}

impl CameraMode {
    pub fn name(&self) -> &'static str {
        match self {
            CameraMode::Orbital => "orbital",
            CameraMode::Follow => "follow",
            CameraMode::Cinematic => "cinematic",
        }
    }

    pub fn cycled(&self) -> Self {
        match self {
            CameraMode::Orbital => CameraMode::Follow,
            CameraMode::Follow => CameraMode::Cinematic,
            CameraMode::Cinematic => CameraMode::Orbital,
        }
    }
}

/// Exclusive write token for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraOwner {
    #[default]
    UserFree,
    AutoOrbit,
    RunDriver,
}

/// Spherical orbit pose plus look target, snapshotted at run start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
}

/// Camera position a pose resolves to.
pub fn pose_position(pose: &RigPose) -> Vec3 {
    let horizontal = pose.distance * pose.pitch.cos();
    pose.target
        + Vec3::new(
            horizontal * pose.yaw.cos(),
            pose.distance * pose.pitch.sin(),
            horizontal * pose.yaw.sin(),
        )
}

/// The rig every camera writer goes through.
#[derive(Resource, Debug)]
pub struct CameraRig {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
    /// Base camera position for this frame, before shake.
    pub base_position: Vec3,
    /// Look target for this frame.
    pub base_target: Vec3,
    /// Pose snapshotted when a run started; reset eases back to it.
    pub pre_run: Option<RigPose>,
    /// Set by the reset easing once within epsilon of the pre-run pose.
    pub settled: bool,
    /// Impact shake displacement, written by the effects subsystem.
    pub shake_offset: Vec3,
    /// Residual drag motion, decayed each frame for the release glide.
    pub orbit_momentum: Vec2,
    /// Residual zoom motion, decayed the same way.
    pub zoom_momentum: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        let mut rig = Self {
            yaw: 0.6,
            pitch: 0.35,
            distance: CAMERA_START_DISTANCE,
            target: Vec3::ZERO,
            base_position: Vec3::ZERO,
            base_target: Vec3::ZERO,
            pre_run: None,
            settled: false,
            shake_offset: Vec3::ZERO,
            orbit_momentum: Vec2::ZERO,
            zoom_momentum: 0.0,
        };
        rig.base_position = rig.camera_position();
        rig
    }
}

impl CameraRig {
    pub fn pose(&self) -> RigPose {
        RigPose {
            yaw: self.yaw,
            pitch: self.pitch,
            distance: self.distance,
            target: self.target,
        }
    }

    pub fn camera_position(&self) -> Vec3 {
        pose_position(&self.pose())
    }
}

/// User-facing camera switches and the interaction idle timer.
#[derive(Resource, Debug)]
pub struct CameraControl {
    pub mode: CameraMode,
    pub owner: CameraOwner,
    /// False for the duration of a run; restored when reset converges.
    pub free_enabled: bool,
    pub auto_rotate: bool,
    pub seconds_since_input: f32,
}

impl Default for CameraControl {
    fn default() -> Self {
        Self {
            mode: CameraMode::Orbital,
            owner: CameraOwner::UserFree,
            free_enabled: true,
            auto_rotate: true,
            // Past the grace already, so a fresh scene drifts immediately.
            seconds_since_input: USER_IDLE_GRACE_SECS + 1.0,
        }
    }
}

/// Marks the single scene camera.
#[derive(Component)]
pub struct EngineCamera;

// ── Systems ───────────────────────────────────────────────────────────────────

/// Applies startup configuration that overrides the built-in rig defaults.
pub fn seed_camera_from_config(
    config: Res<EngineConfig>,
    mut rig: ResMut<CameraRig>,
    mut control: ResMut<CameraControl>,
) {
    rig.distance = config
        .camera_start_distance
        .clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    rig.base_position = rig.camera_position();
    control.auto_rotate = config.auto_rotate_enabled;
}

/// Spawns the scene camera with a far plane deep enough for the most distant
/// trajectory starts.  MSAA comes from the active quality profile so a
/// Medium-tier startup does not pay for antialiasing it asked to skip.
pub fn spawn_camera(
    mut commands: Commands,
    rig: Res<CameraRig>,
    quality: Res<crate::quality::ActiveQuality>,
) {
    let msaa = if quality.profile().antialiasing {
        Msaa::Sample4
    } else {
        Msaa::Off
    };
    commands.spawn((
        EngineCamera,
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            far: CAMERA_FAR,
            ..default()
        }),
        Transform::from_translation(rig.camera_position()).looking_at(rig.target, Vec3::Y),
        msaa,
    ));
}

/// Teardown: drop the camera entity and clear the rig's transient state so
/// a rebuilt scene starts from a clean orbit.
pub fn despawn_camera(
    mut commands: Commands,
    mut rig: ResMut<CameraRig>,
    cameras: Query<Entity, With<EngineCamera>>,
) {
    for entity in cameras.iter() {
        commands.entity(entity).despawn();
    }
    rig.pre_run = None;
    rig.settled = false;
    rig.shake_offset = Vec3::ZERO;
    rig.orbit_momentum = Vec2::ZERO;
    rig.zoom_momentum = 0.0;
    let position = rig.camera_position();
    rig.base_position = position;
    rig.base_target = rig.target;
}

/// Mouse orbit and zoom while free control is enabled.  Any input resets the
/// idle timer and reclaims the owner token from auto-rotate.
///
/// The latest pointer delta overwrites the rig's momentum, which keeps
/// applying itself at [`ORBIT_DAMPING`] decay after release, so a drag
/// glides to rest instead of stopping dead.  The glide itself is not input:
/// the idle timer keeps counting through it.
pub fn track_user_input(
    time: Res<Time>,
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    scroll: Res<AccumulatedMouseScroll>,
    mut rig: ResMut<CameraRig>,
    mut control: ResMut<CameraControl>,
) {
    control.seconds_since_input += time.delta_secs();
    if !control.free_enabled {
        // A run owns the camera; stale glide must not kick in afterwards.
        rig.orbit_momentum = Vec2::ZERO;
        rig.zoom_momentum = 0.0;
        return;
    }

    let mut interacted = false;
    if buttons.pressed(MouseButton::Left) && motion.delta != Vec2::ZERO {
        rig.orbit_momentum = motion.delta * ORBIT_SENSITIVITY;
        interacted = true;
    }
    if scroll.delta.y != 0.0 {
        rig.zoom_momentum = -scroll.delta.y * ZOOM_SENSITIVITY;
        interacted = true;
    }

    let momentum = rig.orbit_momentum;
    let zoom = rig.zoom_momentum;
    rig.yaw += momentum.x;
    rig.pitch = (rig.pitch + momentum.y).clamp(-CAMERA_PITCH_LIMIT, CAMERA_PITCH_LIMIT);
    rig.distance = (rig.distance + zoom).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);

    rig.orbit_momentum *= ORBIT_DAMPING;
    rig.zoom_momentum *= ORBIT_DAMPING;
    if rig.orbit_momentum.length_squared() < 1e-10 {
        rig.orbit_momentum = Vec2::ZERO;
    }
    if rig.zoom_momentum.abs() < 1e-5 {
        rig.zoom_momentum = 0.0;
    }

    if interacted {
        control.seconds_since_input = 0.0;
        control.owner = CameraOwner::UserFree;
    }
}

/// Slowly drifts the orbit while idle.  Five gates: auto-rotate is switched
/// on, the mode is orbital, free control is enabled (no run owns the
/// camera), no run is in flight, and the user has been hands-off past the
/// grace period.
pub fn auto_rotate_camera(
    time: Res<Time>,
    run: Res<ImpactRun>,
    config: Res<EngineConfig>,
    mut rig: ResMut<CameraRig>,
    mut control: ResMut<CameraControl>,
) {
    if !control.auto_rotate
        || control.mode != CameraMode::Orbital
        || !control.free_enabled
        || !run.is_idle()
    {
        return;
    }
    if control.seconds_since_input < USER_IDLE_GRACE_SECS {
        return;
    }
    control.owner = CameraOwner::AutoOrbit;
    rig.yaw += config.auto_rotate_speed * time.delta_secs();
}

/// Writes the frame's base pose for the idle owners.  The run driver has its
/// own writer below; between them exactly one system touches the base.
pub fn apply_idle_camera_pose(mut rig: ResMut<CameraRig>) {
    let position = rig.camera_position();
    rig.base_position = position;
    rig.base_target = rig.target;
}

/// Run-owned camera behavior: per-mode framing during flight, a steady gaze
/// at the crater during the hold, and the epsilon-checked ease home during
/// reset.
#[allow(clippy::type_complexity)]
pub fn drive_run_camera(
    time: Res<Time>,
    run: Res<ImpactRun>,
    control: Res<CameraControl>,
    path: Res<TrajectoryPath>,
    mut rig: ResMut<CameraRig>,
    body_q: Query<(&crate::asteroid::AsteroidBody, &Transform)>,
) {
    if control.owner != CameraOwner::RunDriver {
        return;
    }
    let dt = time.delta_secs();
    let ease = 1.0 - (-CAMERA_EASE_RATE * dt).exp();
    let body_position = body_q
        .single()
        .map(|(_, transform)| transform.translation)
        .unwrap_or_else(|_| path.start.lerp(path.end, run.progress));
    let body_radius = body_q
        .single()
        .map(|(body, _)| body.mesh_radius)
        .unwrap_or(ASTEROID_MIN_RADIUS);

    match run.phase {
        RunPhase::Approaching | RunPhase::Entry => match run.camera_mode {
            CameraMode::Orbital => {
                rig.base_position = rig.camera_position();
                rig.base_target = rig.target;
            }
            CameraMode::Follow => {
                if run.progress > FOLLOW_WINDOW_START && run.progress < FOLLOW_WINDOW_END {
                    let travel = (path.end - path.start).normalize_or(Vec3::NEG_X);
                    let back = FOLLOW_BASE_BACK + body_radius * FOLLOW_BACK_RADIUS_FACTOR;
                    let desired =
                        body_position - travel * back + Vec3::Y * back * FOLLOW_UP_FRACTION;
                    rig.base_position = rig.base_position.lerp(desired, ease);
                    rig.base_target = body_position;
                }
            }
            CameraMode::Cinematic => {
                let travel = (path.end - path.start).normalize_or(Vec3::NEG_X);
                let start_distance = path.start.length();
                let (desired, target) = if run.progress < CINEMATIC_TRAILING_AT {
                    // Wide establishing shot, perpendicular to the approach.
                    let side = travel.cross(Vec3::Y).normalize_or(Vec3::X);
                    (
                        side * (start_distance * 0.45) + Vec3::Y * (start_distance * 0.18),
                        Vec3::ZERO,
                    )
                } else if run.progress < CINEMATIC_CLOSE_AT {
                    // Trailing shot, well behind the body.
                    let back = (FOLLOW_BASE_BACK + body_radius * FOLLOW_BACK_RADIUS_FACTOR) * 2.2;
                    (
                        body_position - travel * back + Vec3::Y * back * 0.5,
                        body_position,
                    )
                } else {
                    // Close impact shot, hovering over the predicted site.
                    let surface = body_position.normalize_or(Vec3::Y);
                    let side = travel.cross(surface).normalize_or(Vec3::X);
                    (
                        surface * (PLANET_RADIUS + 30.0 + body_radius * 4.0) + side * 14.0,
                        body_position,
                    )
                };
                rig.base_position = rig.base_position.lerp(desired, ease);
                rig.base_target = target;
            }
        },
        RunPhase::Impact => {
            rig.base_target = run.impact_point;
        }
        RunPhase::Resetting => {
            let home = rig.pre_run.unwrap_or_else(|| rig.pose());
            let home_position = pose_position(&home);
            rig.base_position = rig
                .base_position
                .lerp(home_position, 1.0 - (-RESET_EASE_RATE * dt).exp());
            rig.base_target = home.target;
            if rig.base_position.distance(home_position) <= RESET_EPSILON {
                rig.base_position = home_position;
                rig.settled = true;
            }
        }
        RunPhase::Idle => {}
    }
}

/// Turns the frame's base pose into the camera transform, shake on top.
pub fn compose_camera_transform(
    rig: Res<CameraRig>,
    mut camera_q: Query<&mut Transform, With<EngineCamera>>,
) {
    let Ok(mut transform) = camera_q.single_mut() else {
        return;
    };
    transform.translation = rig.base_position + rig.shake_offset;
    transform.look_at(rig.base_target, Vec3::Y);
}

/// Gate for [`apply_idle_camera_pose`] so the run driver and the idle pose
/// writer never both touch the base in one frame.
pub fn camera_is_user_owned(control: Res<CameraControl>) -> bool {
    control.owner != CameraOwner::RunDriver
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct CameraRigPlugin;

impl Plugin for CameraRigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraRig>()
            .init_resource::<CameraControl>()
            .add_systems(OnEnter(EngineState::Running), spawn_camera)
            .add_systems(OnExit(EngineState::Running), despawn_camera)
            .add_systems(
                Update,
                // Runs after the animation chain so the rig reads this frame's
                // body transform and phase, not last frame's.
                (
                    track_user_input,
                    auto_rotate_camera,
                    apply_idle_camera_pose.run_if(camera_is_user_owned),
                    drive_run_camera,
                    compose_camera_transform,
                )
                    .chain()
                    .after(crate::animation::finish_reset)
                    .run_if(in_state(EngineState::Running)),
            );
    }
}
