//! Headless end-to-end tests for the impact-run state machine.
//!
//! These tests assemble every engine plugin except the overlay (which needs
//! the gizmo machinery from `DefaultPlugins`) on top of [`MinimalPlugins`],
//! step time manually at 20 ms per frame, and let the texture barrier's
//! watchdog hand control to `Running` with zero textures on disk.
//!
//! Covered scenarios:
//! 1. A full run: signal → approach → atmospheric entry → impact → hold →
//!    camera reset → exactly one completion, with monotone progress.
//! 2. Duplicate and re-entrant signals collapse into a single run.
//! 3. A repeated signal with unchanged parameters is ignored; the
//!    programmatic run command is not.
//! 4. Slow giant and fast small parameter extremes produce the documented
//!    start distance and duration floor.
//! 5. Follow camera tracks the body through its mid-run window and the rig
//!    returns to its pre-run pose on completion.
//! 6. A released orbit drag glides to rest under damping instead of
//!    stopping dead.
//! 7. Mouse input during a run never moves the rig; the run driver holds the
//!    camera until reset convergence hands it back.
//! 8. The explosion's four stages ignite in time order, white core first and
//!    red smoke last.

use std::time::Duration;

use bevy::asset::AssetPlugin;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::input::InputPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;

use bolide::animation::{AnimationDriverPlugin, ImpactRun, RunCommand, RunCompleted, RunPhase};
use bolide::asteroid::{AsteroidBody, AsteroidFactoryPlugin, EntryTrailCone};
use bolide::camera::{pose_position, CameraControl, CameraMode, CameraRig, CameraRigPlugin};
use bolide::config::EngineConfig;
use bolide::constants::PLANET_RADIUS;
use bolide::effects::debris::DebrisFragment;
use bolide::effects::explosion::{ExplosionParticle, PendingExplosionStage};
use bolide::effects::shockwave::Shockwave;
use bolide::effects::{FlashPulse, ImpactEffect, ImpactEffectsPlugin};
use bolide::params::{RunSignal, SimulationParameters};
use bolide::quality::QualityPlugin;
use bolide::scene::SceneBuilderPlugin;
use bolide::textures::{EngineState, TextureLoaderPlugin};
use bolide::trajectory::TrajectoryPath;
use bolide::viewport::ViewportPlugin;

// ── Helpers ───────────────────────────────────────────────────────────────────

const TICK: Duration = Duration::from_millis(20);

/// Captures every completion message so tests can assert "exactly once".
#[derive(Resource, Default)]
struct CompletionLog(Vec<u32>);

fn log_completions(mut log: ResMut<CompletionLog>, mut completions: MessageReader<RunCompleted>) {
    for message in completions.read() {
        log.0.push(message.total_runs);
    }
}

/// Full headless engine with a zero-second texture watchdog and a short
/// post-impact hold so runs finish in a few hundred frames.
fn engine_app() -> App {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        StatesPlugin,
        AssetPlugin::default(),
        InputPlugin,
    ));
    app.init_asset::<Image>();
    app.init_asset::<Mesh>();
    app.init_asset::<StandardMaterial>();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(TICK));
    app.insert_resource(EngineConfig {
        barrier_timeout_secs: 0.0,
        impact_hold_secs: 0.3,
        ..EngineConfig::default()
    });
    app.add_plugins((
        TextureLoaderPlugin,
        ViewportPlugin,
        QualityPlugin,
        SceneBuilderPlugin,
        AsteroidFactoryPlugin,
        AnimationDriverPlugin,
        CameraRigPlugin,
        ImpactEffectsPlugin,
    ));
    app.init_resource::<CompletionLog>();
    // After the driver chain, so a completion emitted by `finish_reset` is
    // logged on the frame it fires rather than one frame late.
    app.add_systems(
        Update,
        log_completions.after(bolide::animation::finish_reset),
    );
    app
}

/// Step until the texture watchdog fires and the engine enters `Running`,
/// then one more frame so the first asteroid and trajectory exist.
fn settle_into_running(app: &mut App) {
    for _ in 0..20 {
        app.update();
        if *app.world().resource::<State<EngineState>>().get() == EngineState::Running {
            app.update();
            return;
        }
    }
    panic!("engine never reached Running");
}

/// Overwrite the live parameters, then run one frame so the idle factory
/// regenerates the asteroid and trajectory before anything else happens.
fn set_params(app: &mut App, size_m: f32, velocity_kms: f32, entry_angle_deg: f32) {
    {
        let mut params = app.world_mut().resource_mut::<SimulationParameters>();
        params.size_m = size_m;
        params.velocity_kms = velocity_kms;
        params.entry_angle_deg = entry_angle_deg;
    }
    app.update();
}

fn raise_signal(app: &mut App) {
    app.world_mut().resource_mut::<RunSignal>().request();
}

fn drop_signal(app: &mut App) {
    app.world_mut().resource_mut::<RunSignal>().clear();
}

fn run_snapshot(app: &App) -> (RunPhase, f32, u32) {
    let run = app.world().resource::<ImpactRun>();
    (run.phase, run.progress, run.runs_completed)
}

fn count_with<C: Component>(app: &mut App) -> usize {
    let mut query = app.world_mut().query_filtered::<Entity, With<C>>();
    query.iter(app.world()).count()
}

fn body_visibility(app: &mut App) -> Visibility {
    let mut query = app
        .world_mut()
        .query_filtered::<&Visibility, With<AsteroidBody>>();
    *query.single(app.world()).expect("asteroid body must exist")
}

/// Which explosion stages have at least one live particle right now.
fn explosion_stages_present(app: &mut App) -> [bool; 4] {
    let mut present = [false; 4];
    let mut query = app.world_mut().query::<&ExplosionParticle>();
    for particle in query.iter(app.world()) {
        present[particle.stage] = true;
    }
    present
}

/// Step until the run counter reaches `target`, panicking if it never does.
fn run_to_completion(app: &mut App, target: u32, max_frames: usize) {
    for _ in 0..max_frames {
        app.update();
        if app.world().resource::<ImpactRun>().runs_completed >= target {
            return;
        }
    }
    panic!("run never completed within {max_frames} frames");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// The whole lifecycle for a small fast rock: monotone progress, an Entry
/// phase, a surface impact that hides the body and spawns every effect
/// family, and exactly one completion that hands the camera back.
#[test]
fn full_run_lifecycle() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 20.0, 19.0, 20.0);

    let path = *app.world().resource::<TrajectoryPath>();
    assert!(
        (path.start.length() - 250.0).abs() < 1e-2,
        "small slow parameters keep the minimum start distance, got {}",
        path.start.length()
    );

    raise_signal(&mut app);

    let mut saw_entry = false;
    let mut saw_impact = false;
    let mut last_progress = 0.0_f32;
    for _ in 0..2000 {
        app.update();
        let (phase, progress, completed) = run_snapshot(&app);
        if completed == 1 {
            // finish_reset zeroes progress on this frame; the run is over.
            break;
        }
        assert!(
            progress >= last_progress - 1e-6,
            "progress regressed from {last_progress} to {progress}"
        );
        last_progress = progress;

        if phase == RunPhase::Entry {
            saw_entry = true;
        }
        if phase == RunPhase::Impact && !saw_impact {
            saw_impact = true;
            assert_eq!(
                body_visibility(&mut app),
                Visibility::Hidden,
                "body must vanish on impact"
            );
            assert!(
                count_with::<ExplosionParticle>(&mut app) > 0,
                "impact must spawn explosion particles"
            );
            assert!(
                count_with::<DebrisFragment>(&mut app) > 0,
                "impact must spawn debris"
            );
            assert!(
                count_with::<Shockwave>(&mut app) > 0,
                "impact must spawn a shockwave ring"
            );
            assert!(
                app.world().resource::<FlashPulse>().active,
                "impact must trigger the atmospheric flash"
            );
        }
    }

    assert!(saw_entry, "run must pass through the Entry phase");
    assert!(saw_impact, "run must reach Impact");
    let (phase, _, completed) = run_snapshot(&app);
    assert_eq!(completed, 1, "run must complete");
    assert_eq!(phase, RunPhase::Idle, "driver must return to Idle");
    assert_eq!(
        app.world().resource::<CompletionLog>().0,
        vec![1],
        "completion must fire exactly once"
    );
    assert!(
        app.world().resource::<CameraControl>().free_enabled,
        "free camera control must return after the run"
    );
    assert_eq!(
        body_visibility(&mut app),
        Visibility::Visible,
        "body reappears parked for the next run"
    );

    // Every effect entity ages out on its own.
    for _ in 0..700 {
        app.update();
        if count_with::<ImpactEffect>(&mut app) == 0 {
            break;
        }
    }
    assert_eq!(
        count_with::<ImpactEffect>(&mut app),
        0,
        "all impact effects must self-terminate"
    );
}

/// Duplicate signals while a run is in flight are discarded, not queued:
/// one completion, no restart.
#[test]
fn duplicate_signal_starts_single_run() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 60.0, 25.0, 45.0);

    raise_signal(&mut app);
    for _ in 0..10 {
        app.update();
    }
    assert!(!app.world().resource::<ImpactRun>().is_idle());

    // Same level again (no edge), then a genuine second edge mid-flight.
    raise_signal(&mut app);
    for _ in 0..5 {
        app.update();
    }
    drop_signal(&mut app);
    app.update();
    raise_signal(&mut app);

    run_to_completion(&mut app, 1, 2000);
    for _ in 0..20 {
        app.update();
    }
    let run = app.world().resource::<ImpactRun>();
    assert_eq!(run.runs_completed, 1, "duplicates must not stack runs");
    assert_eq!(app.world().resource::<CompletionLog>().0, vec![1]);
}

/// After completion an unchanged parameter set no longer triggers on the
/// signal, but the in-scene command channel replays it on demand.
#[test]
fn repeat_run_needs_command_or_fresh_params() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 80.0, 30.0, 45.0);

    raise_signal(&mut app);
    run_to_completion(&mut app, 1, 2000);

    drop_signal(&mut app);
    app.update();
    raise_signal(&mut app);
    for _ in 0..25 {
        app.update();
    }
    let run = app.world().resource::<ImpactRun>();
    assert!(run.is_idle(), "same fingerprint must not re-run on signal");
    assert_eq!(run.runs_completed, 1);

    app.world_mut().write_message(RunCommand);
    for _ in 0..5 {
        app.update();
    }
    assert!(
        !app.world().resource::<ImpactRun>().is_idle(),
        "run command must replay the same parameters"
    );

    run_to_completion(&mut app, 2, 2000);
    assert_eq!(app.world().resource::<CompletionLog>().0, vec![1, 2]);
}

/// A 10 km rock at 5 km/s starts far outside the minimum distance and is
/// too slow to burn, so no trail cone spawns.
#[test]
fn giant_slow_rock_starts_far_out() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 10_000.0, 5.0, 60.0);

    let path = *app.world().resource::<TrajectoryPath>();
    assert!(
        (path.start.length() - 15_015.0).abs() < 1.0,
        "start distance must scale with size and velocity, got {}",
        path.start.length()
    );
    assert!(
        (path.end.length() - PLANET_RADIUS).abs() < 1e-2,
        "trajectory must terminate on the surface"
    );
    assert_eq!(
        path.bend_factor, 0.08,
        "5 km/s is below the bend threshold"
    );
    assert_eq!(
        count_with::<EntryTrailCone>(&mut app),
        0,
        "slow approaches have no fire cone"
    );

    raise_signal(&mut app);
    app.update();
    let run = app.world().resource::<ImpactRun>();
    assert!(
        (run.duration - 18.0).abs() < 1e-3,
        "90 / 5 km/s gives an 18 s approach, got {}",
        run.duration
    );
}

/// Very fast approaches hit the duration floor and carry the fire cone.
#[test]
fn fast_rock_floors_duration_and_burns() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 50.0, 60.0, 45.0);

    assert_eq!(
        count_with::<EntryTrailCone>(&mut app),
        1,
        "fast approaches spawn the fire cone"
    );

    raise_signal(&mut app);
    app.update();
    let run = app.world().resource::<ImpactRun>();
    assert!(
        (run.duration - 3.0).abs() < 1e-3,
        "duration must floor at 3 s, got {}",
        run.duration
    );
}

/// In Follow mode the camera target locks onto the body through the middle
/// of the approach.
#[test]
fn follow_camera_tracks_body_mid_window() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 100.0, 20.0, 45.0);
    app.world_mut().resource_mut::<CameraControl>().mode = CameraMode::Follow;

    raise_signal(&mut app);
    let mut checked = false;
    for _ in 0..400 {
        app.update();
        let (phase, progress, _) = run_snapshot(&app);
        if phase != RunPhase::Approaching && phase != RunPhase::Entry {
            break;
        }
        if progress > 0.3 && progress < 0.6 {
            let body = {
                let mut query = app
                    .world_mut()
                    .query_filtered::<&Transform, With<AsteroidBody>>();
                query.single(app.world()).expect("body").translation
            };
            let rig = app.world().resource::<CameraRig>();
            assert!(
                rig.base_target.distance(body) < 1e-3,
                "follow camera must aim at the body"
            );
            assert!(
                rig.base_position.distance(body) > 1.0,
                "follow camera sits behind the body, not inside it"
            );
            checked = true;
        }
    }
    assert!(checked, "run never reached the follow window");
}

/// With auto-rotate off, the rig comes home: after completion the base pose
/// matches the pose captured before the run within the reset epsilon.
#[test]
fn camera_pose_restored_after_run() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 30.0, 35.0, 45.0);
    app.world_mut().resource_mut::<CameraControl>().auto_rotate = false;
    app.update();

    let home = app.world().resource::<CameraRig>().pose();
    raise_signal(&mut app);
    run_to_completion(&mut app, 1, 2000);

    let rig = app.world().resource::<CameraRig>();
    assert!(
        rig.base_position.distance(pose_position(&home)) <= 0.6,
        "camera must converge back to its pre-run pose, off by {}",
        rig.base_position.distance(pose_position(&home))
    );
    assert!(rig.pre_run.is_none(), "pre-run snapshot must be consumed");
}

/// A one-frame drag leaves residual momentum that glides the orbit to rest
/// rather than stopping dead on release.
#[test]
fn orbit_drag_glides_to_rest() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    app.world_mut().resource_mut::<CameraControl>().auto_rotate = false;

    let yaw_start = app.world().resource::<CameraRig>().yaw;
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.world_mut().write_message(MouseMotion {
        delta: Vec2::new(40.0, 0.0),
    });
    app.update();
    let yaw_on_release = app.world().resource::<CameraRig>().yaw;
    assert!(yaw_on_release > yaw_start, "drag must turn the orbit");

    // No further motion this frame, so the residual glide carries on.
    app.update();
    let yaw_gliding = app.world().resource::<CameraRig>().yaw;
    assert!(
        yaw_gliding > yaw_on_release,
        "residual momentum must keep turning after release"
    );

    for _ in 0..200 {
        app.update();
    }
    let yaw_settled = app.world().resource::<CameraRig>().yaw;
    for _ in 0..10 {
        app.update();
    }
    assert_eq!(
        app.world().resource::<CameraRig>().yaw,
        yaw_settled,
        "glide must decay to a complete stop"
    );
}

/// While a run owns the camera, mouse drags and scrolls leave the rig's pose
/// and momenta untouched; input only takes effect again after the reset
/// hands the camera back.
#[test]
fn user_input_is_ignored_while_run_owns_camera() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 100.0, 10.0, 45.0);
    app.world_mut().resource_mut::<CameraControl>().auto_rotate = false;

    raise_signal(&mut app);
    for _ in 0..5 {
        app.update();
    }
    assert!(!app.world().resource::<ImpactRun>().is_idle());
    assert!(
        !app.world().resource::<CameraControl>().free_enabled,
        "free control must drop for the run's duration"
    );

    let before = {
        let rig = app.world().resource::<CameraRig>();
        (rig.yaw, rig.pitch, rig.distance)
    };

    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.world_mut().write_message(MouseMotion {
        delta: Vec2::new(60.0, 25.0),
    });
    app.world_mut().write_message(MouseWheel {
        unit: MouseScrollUnit::Line,
        x: 0.0,
        y: 3.0,
        window: Entity::PLACEHOLDER,
    });
    app.update();

    {
        let rig = app.world().resource::<CameraRig>();
        assert_eq!(
            (rig.yaw, rig.pitch, rig.distance),
            before,
            "mid-run input must not move the orbit pose"
        );
        assert_eq!(
            rig.orbit_momentum,
            Vec2::ZERO,
            "mid-run drags must not bank glide momentum"
        );
        assert_eq!(rig.zoom_momentum, 0.0);
    }
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .release(MouseButton::Left);

    run_to_completion(&mut app, 1, 2000);
    assert!(app.world().resource::<CameraControl>().free_enabled);

    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.world_mut().write_message(MouseMotion {
        delta: Vec2::new(40.0, 0.0),
    });
    app.update();
    assert!(
        app.world().resource::<CameraRig>().yaw != before.0,
        "input must move the orbit again once the camera is handed back"
    );
}

/// Only the white-hot core bursts on the impact frame; the yellow, orange,
/// and red stages ignite strictly later, each on its own offset.
#[test]
fn explosion_stages_ignite_over_time() {
    let mut app = engine_app();
    settle_into_running(&mut app);
    set_params(&mut app, 40.0, 30.0, 45.0);
    raise_signal(&mut app);

    for _ in 0..2000 {
        app.update();
        if run_snapshot(&app).0 == RunPhase::Impact {
            break;
        }
    }
    assert_eq!(run_snapshot(&app).0, RunPhase::Impact, "run never impacted");

    assert_eq!(
        explosion_stages_present(&mut app),
        [true, false, false, false],
        "only the zero-offset core may burst on the impact frame"
    );
    assert_eq!(
        count_with::<PendingExplosionStage>(&mut app),
        3,
        "the three deferred stages wait on igniters"
    );

    // 0.2 s in: the yellow fireball has ignited, orange and red have not.
    for _ in 0..10 {
        app.update();
    }
    let at_fifth = explosion_stages_present(&mut app);
    assert!(at_fifth[1], "yellow stage ignites after its 0.12 s offset");
    assert!(!at_fifth[3], "red smoke must still be pending at 0.2 s");

    // 1 s in: every offset has elapsed and no igniters remain.
    for _ in 0..40 {
        app.update();
    }
    let at_second = explosion_stages_present(&mut app);
    assert!(
        at_second[1] && at_second[2] && at_second[3],
        "every deferred stage must have ignited within a second, got {at_second:?}"
    );
    assert_eq!(count_with::<PendingExplosionStage>(&mut app), 0);
}
