//! Debug overlay: telemetry panel, Run button, alert line, keyboard map,
//! and the fading trajectory trail.
//!
//! The panel reads engine state and never writes simulation data directly;
//! every mutation goes through the same messages and resources the host
//! controls use, so a run started from the button is indistinguishable from
//! one started by a parameter signal.
//!
//! | Key | Action                        |
//! |-----|-------------------------------|
//! | R   | start an impact run           |
//! | C   | cycle camera mode             |
//! | Q   | cycle quality tier            |
//! | P   | cycle named preset            |
//! | A   | toggle camera auto-rotate     |
//! | O   | toggle this overlay           |
//! | F   | toggle fullscreen             |
//! | B   | tear down and rebuild scene   |

use crate::animation::{ImpactRun, RunCommand, RunPhase};
use crate::camera::CameraControl;
use crate::params::{preset, SimulationParameters, PRESET_NAMES};
use crate::quality::{effective_tier, ActiveQuality};
use crate::textures::{EngineState, TextureSet};
use crate::viewport::{FpsSample, FullscreenIntent, ViewportInfo};
use bevy::prelude::*;

/// Seconds an alert stays on screen before it clears itself.
const ALERT_TTL_SECS: f32 = 6.0;

// ── Resources & markers ───────────────────────────────────────────────────────

/// Whether the overlay panel is shown.  Seeded from configuration, toggled
/// with the O key.
#[derive(Resource, Debug, Default)]
pub struct OverlayState {
    pub visible: bool,
}

/// One-line alert channel for non-fatal problems (denied fullscreen, preset
/// switches).  Newer alerts replace older ones.
#[derive(Resource, Debug, Default)]
pub struct EngineAlerts {
    pub line: Option<String>,
    age: f32,
}

impl EngineAlerts {
    pub fn raise(&mut self, message: String) {
        self.line = Some(message);
        self.age = 0.0;
    }
}

/// Position in [`PRESET_NAMES`] for the P key cycle.
#[derive(Resource, Debug, Default)]
pub struct PresetCycle {
    pub index: usize,
}

#[derive(Component)]
pub struct OverlayRoot;

#[derive(Component)]
pub struct HudText;

#[derive(Component)]
pub struct AlertText;

#[derive(Component)]
pub struct RunButton;

// ── Palette ───────────────────────────────────────────────────────────────────

fn panel_bg() -> Color {
    Color::srgba(0.02, 0.03, 0.06, 0.72)
}

fn hud_color() -> Color {
    Color::srgb(0.78, 0.88, 1.0)
}

fn alert_color() -> Color {
    Color::srgb(1.0, 0.58, 0.45)
}

fn run_bg() -> Color {
    Color::srgb(0.10, 0.32, 0.16)
}

fn run_border() -> Color {
    Color::srgb(0.35, 0.65, 0.42)
}

fn run_text() -> Color {
    Color::srgb(0.75, 0.95, 0.78)
}

fn trail_color(alpha: f32) -> Color {
    Color::srgba(1.0, 0.76, 0.42, alpha)
}

// ── HUD formatting ────────────────────────────────────────────────────────────

/// Builds the telemetry block.  Pure so the layout is testable.
#[allow(clippy::too_many_arguments)]
pub fn hud_line(
    fps: f32,
    camera_mode: &str,
    quality: &str,
    quality_capped: bool,
    textures_ready: bool,
    params: &SimulationParameters,
    phase: RunPhase,
    progress: f32,
    runs_completed: u32,
) -> String {
    let cap_marker = if quality_capped { " (capped)" } else { "" };
    let texture_word = if textures_ready { "ready" } else { "loading" };
    format!(
        "fps {:>5.1}   camera {}   quality {}{}   textures {}\n\
         {} · {:.0} m · {:.1} km/s · {:.0}°\n\
         phase {:?}   progress {:.2}   runs {}\n\
         [R]un [C]amera [Q]uality [P]reset [A]uto [O]verlay [F]ullscreen [B]uild",
        fps,
        camera_mode,
        quality,
        cap_marker,
        texture_word,
        params.composition.name(),
        params.size_m,
        params.velocity_kms,
        params.entry_angle_deg,
        phase,
        progress,
        runs_completed,
    )
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Applies the configured initial visibility.  Runs after config load.
pub fn seed_overlay_from_config(
    config: Res<crate::config::EngineConfig>,
    mut overlay: ResMut<OverlayState>,
) {
    overlay.visible = config.overlay_visible;
}

// ── OnEnter(Running): spawn panel ─────────────────────────────────────────────

/// Spawns the overlay panel in the top-left corner.
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ fps · camera · quality · textures    │
/// │ composition · size · velocity · angle│
/// │ phase · progress · runs              │
/// │ key hints                            │
/// │ (alert line)                         │
/// │ [ RUN IMPACT ]                       │
/// └──────────────────────────────────────┘
/// ```
pub fn setup_overlay(mut commands: Commands, overlay: Res<OverlayState>) {
    let initial = if overlay.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(12.0),
                left: Val::Px(12.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(6.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(panel_bg()),
            initial,
            OverlayRoot,
        ))
        .with_children(|root| {
            root.spawn((
                Text::new("telemetry pending"),
                TextFont {
                    font_size: 13.0,
                    ..default()
                },
                TextColor(hud_color()),
                HudText,
            ));

            root.spawn((
                Text::new(""),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(alert_color()),
                AlertText,
            ));

            root.spawn((
                Button,
                Node {
                    width: Val::Px(150.0),
                    height: Val::Px(34.0),
                    justify_content: JustifyContent::Center,
                    align_items: AlignItems::Center,
                    border: UiRect::all(Val::Px(2.0)),
                    ..default()
                },
                BackgroundColor(run_bg()),
                BorderColor::all(run_border()),
                RunButton,
            ))
            .with_children(|button| {
                button.spawn((
                    Text::new("RUN IMPACT"),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(run_text()),
                ));
            });
        });
}

// ── OnExit(Running): teardown ─────────────────────────────────────────────────

pub fn teardown_overlay(mut commands: Commands, roots: Query<Entity, With<OverlayRoot>>) {
    for entity in roots.iter() {
        commands.entity(entity).despawn();
    }
}

// ── Update (Running only) ─────────────────────────────────────────────────────

/// Keyboard map.  Each binding routes through the same channel the host
/// controls use; none of them touch run state directly.
#[allow(clippy::too_many_arguments)]
pub fn handle_overlay_keys(
    keys: Res<ButtonInput<KeyCode>>,
    viewport: Res<ViewportInfo>,
    mut overlay: ResMut<OverlayState>,
    mut alerts: ResMut<EngineAlerts>,
    mut control: ResMut<CameraControl>,
    mut quality: ResMut<ActiveQuality>,
    mut params: ResMut<SimulationParameters>,
    mut presets: ResMut<PresetCycle>,
    mut run_commands: MessageWriter<RunCommand>,
    mut fullscreen: MessageWriter<FullscreenIntent>,
    mut next_state: ResMut<NextState<EngineState>>,
) {
    if keys.just_pressed(KeyCode::KeyR) {
        run_commands.write(RunCommand);
    }
    if keys.just_pressed(KeyCode::KeyC) {
        control.mode = control.mode.cycled();
        alerts.raise(format!("Camera: {}", control.mode.name()));
    }
    if keys.just_pressed(KeyCode::KeyQ) {
        quality.requested = quality.requested.cycled();
        quality.effective = effective_tier(quality.requested, viewport.width);
        let cap = if quality.effective != quality.requested {
            " (capped for narrow viewport)"
        } else {
            ""
        };
        alerts.raise(format!("Quality: {}{cap}", quality.effective.name()));
    }
    if keys.just_pressed(KeyCode::KeyP) {
        presets.index = (presets.index + 1) % PRESET_NAMES.len();
        let name = PRESET_NAMES[presets.index];
        if let Some(selected) = preset(name) {
            *params = selected;
            alerts.raise(format!("Preset: {name}"));
        }
    }
    if keys.just_pressed(KeyCode::KeyA) {
        control.auto_rotate = !control.auto_rotate;
        let word = if control.auto_rotate { "on" } else { "off" };
        alerts.raise(format!("Auto-rotate {word}"));
    }
    if keys.just_pressed(KeyCode::KeyO) {
        overlay.visible = !overlay.visible;
    }
    if keys.just_pressed(KeyCode::KeyF) {
        fullscreen.write(FullscreenIntent);
    }
    if keys.just_pressed(KeyCode::KeyB) {
        info!("Rebuilding scene");
        next_state.set(EngineState::Loading);
    }
}

/// Run button: press starts a run, hover tints the label.
#[allow(clippy::type_complexity)]
pub fn run_button_system(
    buttons: Query<(&Interaction, &Children), (Changed<Interaction>, With<RunButton>)>,
    mut labels: Query<&mut TextColor>,
    mut run_commands: MessageWriter<RunCommand>,
) {
    for (interaction, children) in buttons.iter() {
        match interaction {
            Interaction::Pressed => {
                run_commands.write(RunCommand);
            }
            Interaction::Hovered => {
                for child in children.iter() {
                    if let Ok(mut color) = labels.get_mut(child) {
                        *color = TextColor(Color::WHITE);
                    }
                }
            }
            Interaction::None => {
                for child in children.iter() {
                    if let Ok(mut color) = labels.get_mut(child) {
                        *color = TextColor(run_text());
                    }
                }
            }
        }
    }
}

/// Rewrites the telemetry block every frame.
#[allow(clippy::too_many_arguments)]
pub fn refresh_hud(
    fps: Res<FpsSample>,
    control: Res<CameraControl>,
    quality: Res<ActiveQuality>,
    textures: Res<TextureSet>,
    params: Res<SimulationParameters>,
    run: Res<ImpactRun>,
    mut hud: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut text) = hud.single_mut() else {
        return;
    };
    // Mid-run the snapshotted mode is the one actually driving the camera.
    let mode = if run.is_idle() {
        control.mode
    } else {
        run.camera_mode
    };
    text.0 = hud_line(
        fps.fps,
        mode.name(),
        quality.effective.name(),
        quality.effective != quality.requested,
        textures.ready,
        &params,
        run.phase,
        run.progress,
        run.runs_completed,
    );
}

/// Ages the active alert and clears it after its time-to-live.
pub fn update_alert_line(
    time: Res<Time>,
    mut alerts: ResMut<EngineAlerts>,
    mut line: Query<&mut Text, With<AlertText>>,
) {
    if alerts.line.is_some() {
        alerts.age += time.delta_secs();
        if alerts.age >= ALERT_TTL_SECS {
            alerts.line = None;
        }
    }
    let Ok(mut text) = line.single_mut() else {
        return;
    };
    let desired = alerts.line.clone().unwrap_or_default();
    if text.0 != desired {
        text.0 = desired;
    }
}

/// Mirrors [`OverlayState`] onto the panel's visibility.
pub fn sync_overlay_visibility(
    overlay: Res<OverlayState>,
    mut roots: Query<&mut Visibility, With<OverlayRoot>>,
) {
    if !overlay.is_changed() {
        return;
    }
    for mut visibility in roots.iter_mut() {
        *visibility = if overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

/// Draws the flight trail as a polyline fading toward its oldest point.
pub fn draw_trail_gizmo(mut gizmos: Gizmos, run: Res<ImpactRun>) {
    let count = run.trail.len();
    if count < 2 {
        return;
    }
    for (index, (from, to)) in run
        .trail
        .iter()
        .zip(run.trail.iter().skip(1))
        .enumerate()
    {
        let alpha = 0.85 * (index + 1) as f32 / count as f32;
        gizmos.line(*from, *to, trail_color(alpha));
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .init_resource::<EngineAlerts>()
            .init_resource::<PresetCycle>()
            .add_systems(OnEnter(EngineState::Running), setup_overlay)
            .add_systems(OnExit(EngineState::Running), teardown_overlay)
            .add_systems(
                Update,
                (
                    handle_overlay_keys,
                    run_button_system,
                    refresh_hud,
                    update_alert_line,
                    sync_overlay_visibility,
                    draw_trail_gizmo,
                )
                    .run_if(in_state(EngineState::Running)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Composition;

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            size_m: 100.0,
            velocity_kms: 20.0,
            entry_angle_deg: 45.0,
            composition: Composition::Rock,
        }
    }

    /// The telemetry block carries every field the panel promises.
    #[test]
    fn hud_line_mentions_all_telemetry() {
        let line = hud_line(
            59.8,
            "Follow",
            "High",
            false,
            true,
            &sample_params(),
            RunPhase::Approaching,
            0.42,
            3,
        );
        for needle in [
            "Follow", "High", "ready", "rock", "100", "20.0", "45", "0.42", "runs 3",
        ] {
            assert!(line.contains(needle), "missing {needle:?} in {line:?}");
        }
        assert!(!line.contains("capped"));
    }

    /// A capped tier is labelled so the downgrade is visible.
    #[test]
    fn hud_line_marks_capped_quality() {
        let line = hud_line(
            60.0,
            "Orbital",
            "High",
            true,
            false,
            &sample_params(),
            RunPhase::Idle,
            0.0,
            0,
        );
        assert!(line.contains("(capped)"));
        assert!(line.contains("loading"));
    }

    /// Raising an alert replaces the previous one and restarts its clock.
    #[test]
    fn alerts_replace_and_rearm() {
        let mut alerts = EngineAlerts::default();
        assert!(alerts.line.is_none());
        alerts.raise("first".into());
        alerts.age = 5.0;
        alerts.raise("second".into());
        assert_eq!(alerts.line.as_deref(), Some("second"));
        assert_eq!(alerts.age, 0.0);
    }
}
