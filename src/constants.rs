//! Centralised engine constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//!
//! ## Tuning guidance
//!
//! Each constant includes the observable consequence of changing it where that
//! is not obvious.  Values that benefit from live iteration are mirrored in
//! [`crate::config::EngineConfig`] and can be overridden from
//! `assets/engine.toml` without recompiling.

// ── World Geometry ────────────────────────────────────────────────────────────

/// Planet surface radius (world units).  The collision predicate, trajectory
/// endpoints, and every shell scale below are expressed relative to this.
pub const PLANET_RADIUS: f32 = 100.0;

/// Cloud shell radius as a multiple of [`PLANET_RADIUS`].
/// Below ~1.005 the shell z-fights with the surface at far zoom.
pub const CLOUD_SHELL_SCALE: f32 = 1.015;

/// Inner atmosphere shell scale.  Rendered back-face additive for rim glow.
pub const ATMOSPHERE_INNER_SCALE: f32 = 1.06;

/// Outer atmosphere shell scale.  Fainter second rim layer.
pub const ATMOSPHERE_OUTER_SCALE: f32 = 1.12;

/// Baseline alpha of the inner atmosphere shell (additive strength).
pub const ATMOSPHERE_INNER_ALPHA: f32 = 0.16;

/// Baseline alpha of the outer atmosphere shell.
pub const ATMOSPHERE_OUTER_ALPHA: f32 = 0.07;

/// Moon radius (world units).  Roughly the Earth/Moon size ratio.
pub const MOON_RADIUS: f32 = 27.0;

/// Moon orbital radius around the planet centre (world units).
pub const MOON_ORBIT_RADIUS: f32 = 380.0;

/// Seconds per full moon orbit.  Orbital position is a function of wall-clock
/// time, so the moon keeps moving between animation runs.
pub const MOON_ORBIT_SECS: f32 = 220.0;

/// Seconds per full moon rotation about its own axis.
pub const MOON_SPIN_SECS: f32 = 80.0;

/// Inclination of the moon's orbital plane (radians).
pub const MOON_ORBIT_INCLINATION: f32 = 0.09;

/// Seconds per full planet rotation.
pub const PLANET_ROTATION_SECS: f32 = 240.0;

/// Seconds per full cloud-shell rotation.  Slightly faster than the surface
/// so the cloud pattern visibly drifts.
pub const CLOUD_ROTATION_SECS: f32 = 200.0;

/// Reference ring inner/outer radii (world units) and baseline alpha.
pub const RING_INNER_RADIUS: f32 = 180.0;
pub const RING_OUTER_RADIUS: f32 = 184.0;
pub const RING_ALPHA: f32 = 0.14;

/// Ambient debris belt: rock count and radial band (world units).
pub const BELT_ROCK_COUNT: usize = 48;
pub const BELT_INNER_RADIUS: f32 = 205.0;
pub const BELT_OUTER_RADIUS: f32 = 255.0;

/// Ambient belt rock size range (world units).
pub const BELT_ROCK_MIN_SIZE: f32 = 0.6;
pub const BELT_ROCK_MAX_SIZE: f32 = 2.2;

/// Ambient belt angular speed range (radians/second).
pub const BELT_MIN_ANGULAR_SPEED: f32 = 0.008;
pub const BELT_MAX_ANGULAR_SPEED: f32 = 0.02;

/// Star count and dome radius for the procedural star field.
pub const STAR_COUNT: usize = 900;
pub const STAR_DOME_RADIUS: f32 = 2600.0;

/// Radius of the textured background sphere (used when the background
/// texture loaded).  Must stay inside [`CAMERA_FAR`].
pub const BACKGROUND_SPHERE_RADIUS: f32 = 3000.0;

// ── Trajectory ────────────────────────────────────────────────────────────────

/// Minimum start distance from the origin for any approach (world units).
pub const MIN_START_DISTANCE: f32 = 250.0;

/// Start distance contribution per metre of asteroid size.
pub const START_SIZE_FACTOR: f32 = 1.5;

/// Start distance contribution per km/s of approach velocity.
pub const START_VELOCITY_FACTOR: f32 = 3.0;

/// Gravitational-deflection nudge applied to the impact point.  Slow objects
/// spend longer in the gravity well, so they bend more.
pub const BEND_FACTOR_SLOW: f32 = 0.08;
pub const BEND_FACTOR_FAST: f32 = 0.03;

/// Velocity (km/s) separating the slow and fast bend factors.
pub const BEND_VELOCITY_THRESHOLD: f32 = 25.0;

/// Out-of-plane tilt applied to the approach direction (radians) so the
/// trajectory never reads as perfectly planar.
pub const APPROACH_TILT: f32 = 0.35;

// ── Asteroid Mesh ─────────────────────────────────────────────────────────────

/// Metres of asteroid diameter per world unit of mesh radius.
pub const ASTEROID_SIZE_DIVISOR: f32 = 12.0;

/// Mesh radius clamp (world units).  Keeps degenerate parameter input from
/// producing an invisible or scene-swallowing body.
pub const ASTEROID_MIN_RADIUS: f32 = 1.5;
pub const ASTEROID_MAX_RADIUS: f32 = 20.0;

/// Low-frequency bump deformation: angular frequency and amplitude
/// (fraction of base radius).
pub const BUMP_FREQUENCY: f32 = 3.1;
pub const BUMP_AMPLITUDE: f32 = 0.18;

/// High-frequency crater deformation.  The term is squared so it carves
/// depressions instead of symmetric noise.
pub const CRATER_FREQUENCY: f32 = 7.3;
pub const CRATER_AMPLITUDE: f32 = 0.22;

/// Per-vertex random jitter amplitude (fraction of base radius).
pub const JITTER_AMPLITUDE: f32 = 0.06;

/// Approach velocity (km/s) above which the asteroid gets an entry-trail cone.
pub const FIREBALL_VELOCITY_THRESHOLD: f32 = 30.0;

/// Trail cone proportions relative to the asteroid mesh radius.
pub const TRAIL_CONE_LENGTH_FACTOR: f32 = 6.0;
pub const TRAIL_CONE_RADIUS_FACTOR: f32 = 0.8;

/// Tumble rate: base radians/second plus a velocity-scaled term.
pub const SPIN_BASE_RATE: f32 = 0.25;
pub const SPIN_VELOCITY_FACTOR: f32 = 0.02;

// ── Animation Run ─────────────────────────────────────────────────────────────

/// Run duration is `RUN_DURATION_FACTOR / velocity_kms`, floored at
/// [`RUN_MIN_DURATION_SECS`].  Faster rocks arrive sooner.
pub const RUN_DURATION_FACTOR: f32 = 90.0;
pub const RUN_MIN_DURATION_SECS: f32 = 3.0;

/// Altitude above the surface (world units) at which atmospheric entry
/// begins: the glow light attaches and the asteroid material heats up.
pub const ENTRY_GLOW_ALTITUDE: f32 = 25.0;

/// Entry glow point-light intensity (lumens) and range (world units).
pub const ENTRY_GLOW_INTENSITY: f32 = 4_000_000.0;
pub const ENTRY_GLOW_RANGE: f32 = 90.0;

/// Wall-clock delay between impact and the start of the camera reset.
/// Effects are self-terminating and may outlive this.
pub const IMPACT_HOLD_SECS: f32 = 2.0;

/// Camera reset convergence: exponential ease rate (per second) and the
/// distance epsilon (world units) below which the run is considered settled.
pub const RESET_EASE_RATE: f32 = 2.5;
pub const RESET_EPSILON: f32 = 0.5;

/// Follow camera engages only for progress within this open interval.
pub const FOLLOW_WINDOW_START: f32 = 0.15;
pub const FOLLOW_WINDOW_END: f32 = 0.95;

/// Follow camera offset: base distance behind the asteroid plus a
/// radius-scaled term, raised by an up fraction of the back distance.
pub const FOLLOW_BASE_BACK: f32 = 18.0;
pub const FOLLOW_BACK_RADIUS_FACTOR: f32 = 2.5;
pub const FOLLOW_UP_FRACTION: f32 = 0.35;

/// Follow/cinematic camera easing rate (per second).
pub const CAMERA_EASE_RATE: f32 = 2.0;

/// Cinematic mode framings: wide establishing shot until
/// [`CINEMATIC_TRAILING_AT`], trailing shot until [`CINEMATIC_CLOSE_AT`],
/// close impact shot after.
pub const CINEMATIC_TRAILING_AT: f32 = 0.35;
pub const CINEMATIC_CLOSE_AT: f32 = 0.78;

// ── Impact Effects ────────────────────────────────────────────────────────────

/// Radial gravity applied to explosion particles (world units/s², toward the
/// planet centre).
pub const EXPLOSION_GRAVITY: f32 = 9.0;

/// Air-resistance decay for explosion particles (fraction of velocity lost
/// per second).
pub const EXPLOSION_DRAG: f32 = 0.75;

/// Explosion particle launch speed range (world units/s).
pub const EXPLOSION_MIN_SPEED: f32 = 26.0;
pub const EXPLOSION_MAX_SPEED: f32 = 64.0;

/// Shockwave ring: final radius (world units) and expansion duration.
pub const SHOCKWAVE_MAX_RADIUS: f32 = 55.0;
pub const SHOCKWAVE_DURATION_SECS: f32 = 2.2;

/// Atmospheric flash: spike time to peak, then slow decay back to baseline.
pub const FLASH_SPIKE_SECS: f32 = 0.12;
pub const FLASH_DECAY_SECS: f32 = 2.5;

/// Peak added alpha on the inner atmosphere shell during the flash.
pub const FLASH_PEAK_ALPHA: f32 = 0.55;

/// Camera shake: jitter repetitions, seconds between repetitions, per-step
/// damping, and the clamp on the `velocity × size`-derived magnitude.
pub const SHAKE_REPEATS: u32 = 22;
pub const SHAKE_INTERVAL_SECS: f32 = 0.035;
pub const SHAKE_DAMPING: f32 = 0.88;
pub const SHAKE_MAGNITUDE_FACTOR: f32 = 2.0e-4;
pub const SHAKE_MIN_MAGNITUDE: f32 = 0.15;
pub const SHAKE_MAX_MAGNITUDE: f32 = 7.0;

/// Debris fades over the final quarter of its lifetime.
pub const DEBRIS_FADE_FRACTION: f32 = 0.25;

// ── Camera ────────────────────────────────────────────────────────────────────

/// Initial orbital camera distance from the origin (world units).
pub const CAMERA_START_DISTANCE: f32 = 320.0;

/// Orbital camera distance clamp for user zoom (world units).
pub const CAMERA_MIN_DISTANCE: f32 = 130.0;
pub const CAMERA_MAX_DISTANCE: f32 = 1800.0;

/// Pitch clamp (radians) keeping the orbit camera off the poles.
pub const CAMERA_PITCH_LIMIT: f32 = 1.45;

/// Far clip plane.  Must exceed the largest possible start distance
/// (size 10 000 m, velocity 5 km/s → 15 015 units) plus the background dome.
pub const CAMERA_FAR: f32 = 50_000.0;

/// Mouse-drag orbit sensitivity (radians per logical pixel).
pub const ORBIT_SENSITIVITY: f32 = 0.0045;

/// Scroll zoom sensitivity (world units per scroll line).
pub const ZOOM_SENSITIVITY: f32 = 14.0;

/// Per-frame retention of the residual orbit/zoom motion after the pointer
/// releases.  1.0 would glide forever, 0.0 stops dead on release.
pub const ORBIT_DAMPING: f32 = 0.88;

/// Idle auto-rotation angular speed (radians/second).
pub const AUTO_ROTATE_SPEED: f32 = 0.05;

/// Seconds after the last user input before auto-rotation resumes.
pub const USER_IDLE_GRACE_SECS: f32 = 2.5;

// ── Texture Loading ───────────────────────────────────────────────────────────

/// Watchdog: if any texture is still pending after this many seconds the
/// barrier fires anyway and the pending slots are treated as absent.
pub const TEXTURE_BARRIER_TIMEOUT_SECS: f32 = 12.0;

/// Anisotropic filtering level applied to successfully loaded textures.
pub const TEXTURE_ANISOTROPY: u16 = 8;

// ── Viewport / Scheduler ──────────────────────────────────────────────────────

/// Minimum accepted viewport dimension (pixels).  Resize events below this
/// are clamped before the projection update to avoid a degenerate aspect.
pub const MIN_VIEWPORT_DIM: u32 = 64;

/// Viewport width (pixels) below which the quality tier is capped at High.
pub const MOBILE_WIDTH_THRESHOLD: u32 = 820;

/// FPS is sampled over windows of this length.
pub const FPS_SAMPLE_INTERVAL_SECS: f32 = 1.0;

// ── Parameter Defaults ────────────────────────────────────────────────────────

/// Documented fallback values used when the host supplies malformed or
/// non-finite parameters.
pub const DEFAULT_SIZE_M: f32 = 100.0;
pub const DEFAULT_VELOCITY_KMS: f32 = 20.0;
pub const DEFAULT_ANGLE_DEG: f32 = 45.0;

/// Entry angle clamp (degrees).
pub const MIN_ANGLE_DEG: f32 = 0.0;
pub const MAX_ANGLE_DEG: f32 = 90.0;
