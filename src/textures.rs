//! Texture loading and the one-shot "textures ready" barrier.
//!
//! All eight scene textures are requested concurrently at startup.  Each slot
//! resolves independently: a decode failure or missing file logs a warning
//! and leaves that slot empty, the affected surface later falls back to a
//! flat color, and the barrier still fires.  A watchdog forces the barrier
//! after [`TEXTURE_BARRIER_TIMEOUT_SECS`](crate::constants) so a wedged asset
//! backend cannot keep the engine on the loading screen forever.
//!
//! | System | Schedule | Purpose |
//! |--------|----------|---------|
//! | `begin_texture_loading` | `OnEnter(Loading)` | Kick off all eight loads |
//! | `poll_texture_barrier`  | `Update` (Loading) | Resolve slots, fire barrier once |

use crate::config::EngineConfig;
use crate::error::VizError;
use bevy::asset::LoadState;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;

use crate::constants::TEXTURE_ANISOTROPY;

// ── Engine lifecycle ──────────────────────────────────────────────────────────

/// Top-level engine lifecycle.  The texture barrier gates `Loading → Running`;
/// scene construction happens on entering `Running`, and leaving `Running`
/// (a rebuild request) is the guaranteed teardown path.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    Loading,
    Running,
}

// ── Texture slots ─────────────────────────────────────────────────────────────

/// The fixed set of named textures the scene knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKey {
    PlanetDay,
    PlanetNight,
    PlanetNormal,
    PlanetSpecular,
    Clouds,
    Moon,
    Background,
    AsteroidSurface,
}

impl TextureKey {
    pub const ALL: [TextureKey; 8] = [
        Self::PlanetDay,
        Self::PlanetNight,
        Self::PlanetNormal,
        Self::PlanetSpecular,
        Self::Clouds,
        Self::Moon,
        Self::Background,
        Self::AsteroidSurface,
    ];

    /// File name under the configured texture base path.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PlanetDay => "planet_day.png",
            Self::PlanetNight => "planet_night.png",
            Self::PlanetNormal => "planet_normal.png",
            Self::PlanetSpecular => "planet_specular.png",
            Self::Clouds => "clouds.png",
            Self::Moon => "moon.png",
            Self::Background => "stars_background.png",
            Self::AsteroidSurface => "asteroid_surface.png",
        }
    }

    /// Logical slot name used in warnings.
    pub fn slot_name(self) -> &'static str {
        match self {
            Self::PlanetDay => "planet_day",
            Self::PlanetNight => "planet_night",
            Self::PlanetNormal => "planet_normal",
            Self::PlanetSpecular => "planet_specular",
            Self::Clouds => "clouds",
            Self::Moon => "moon",
            Self::Background => "background",
            Self::AsteroidSurface => "asteroid_surface",
        }
    }
}

/// Final texture inventory handed to the scene builder.  Every entry is
/// independently optional.
#[derive(Resource, Debug, Clone, Default)]
pub struct TextureSet {
    pub planet_day: Option<Handle<Image>>,
    pub planet_night: Option<Handle<Image>>,
    pub planet_normal: Option<Handle<Image>>,
    pub planet_specular: Option<Handle<Image>>,
    pub clouds: Option<Handle<Image>>,
    pub moon: Option<Handle<Image>>,
    pub background: Option<Handle<Image>>,
    pub asteroid_surface: Option<Handle<Image>>,
    /// True once the barrier has fired (telemetry: "texture-ready" flag).
    pub ready: bool,
}

impl TextureSet {
    fn set(&mut self, key: TextureKey, handle: Handle<Image>) {
        let slot = match key {
            TextureKey::PlanetDay => &mut self.planet_day,
            TextureKey::PlanetNight => &mut self.planet_night,
            TextureKey::PlanetNormal => &mut self.planet_normal,
            TextureKey::PlanetSpecular => &mut self.planet_specular,
            TextureKey::Clouds => &mut self.clouds,
            TextureKey::Moon => &mut self.moon,
            TextureKey::Background => &mut self.background,
            TextureKey::AsteroidSurface => &mut self.asteroid_surface,
        };
        *slot = Some(handle);
    }

    /// Number of populated slots.
    pub fn loaded_count(&self) -> usize {
        [
            &self.planet_day,
            &self.planet_night,
            &self.planet_normal,
            &self.planet_specular,
            &self.clouds,
            &self.moon,
            &self.background,
            &self.asteroid_surface,
        ]
        .into_iter()
        .filter(|slot| slot.is_some())
        .count()
    }
}

/// Barrier message, written exactly once per load cycle.
#[derive(Message, Debug, Clone, Copy)]
pub struct TexturesReady {
    pub loaded: usize,
    pub failed: usize,
}

// ── Load tracking ─────────────────────────────────────────────────────────────

/// Resolution state of one in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Loaded,
    Failed,
}

struct PendingSlot {
    key: TextureKey,
    handle: Handle<Image>,
    status: SlotStatus,
}

/// In-flight load bookkeeping, alive only during `EngineState::Loading`.
#[derive(Resource, Default)]
pub struct PendingTextures {
    slots: Vec<PendingSlot>,
    started_at: f32,
}

/// True once no slot is still pending.  This is the barrier condition.
pub fn all_terminal(statuses: &[SlotStatus]) -> bool {
    statuses.iter().all(|s| *s != SlotStatus::Pending)
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Kick off every texture load concurrently.  Re-entering `Loading` (a scene
/// rebuild) restarts the cycle from scratch with fresh handles.
pub fn begin_texture_loading(
    mut pending: ResMut<PendingTextures>,
    mut textures: ResMut<TextureSet>,
    asset_server: Res<AssetServer>,
    config: Res<EngineConfig>,
    time: Res<Time>,
) {
    *textures = TextureSet::default();
    pending.slots = TextureKey::ALL
        .into_iter()
        .map(|key| PendingSlot {
            key,
            handle: asset_server.load(format!("{}/{}", config.texture_base, key.file_name())),
            status: SlotStatus::Pending,
        })
        .collect();
    pending.started_at = time.elapsed_secs();
    info!(
        "Loading {} textures from assets/{}/",
        pending.slots.len(),
        config.texture_base
    );
}

/// Poll the asset server until every slot is terminal, then fire the barrier
/// exactly once and hand control to `EngineState::Running`.
///
/// Successful textures are normalized in place: repeat wrap on both axes and
/// anisotropic filtering, matching what the planet shells expect.  The
/// watchdog path treats still-pending slots as absent.
pub fn poll_texture_barrier(
    mut pending: ResMut<PendingTextures>,
    mut textures: ResMut<TextureSet>,
    mut images: ResMut<Assets<Image>>,
    mut ready: MessageWriter<TexturesReady>,
    mut next_state: ResMut<NextState<EngineState>>,
    asset_server: Res<AssetServer>,
    config: Res<EngineConfig>,
    time: Res<Time>,
) {
    if pending.slots.is_empty() {
        return;
    }

    for slot in pending.slots.iter_mut() {
        if slot.status != SlotStatus::Pending {
            continue;
        }
        match asset_server.get_load_state(slot.handle.id()) {
            Some(LoadState::Loaded) => {
                if let Some(image) = images.get_mut(&slot.handle) {
                    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
                        address_mode_u: ImageAddressMode::Repeat,
                        address_mode_v: ImageAddressMode::Repeat,
                        anisotropy_clamp: TEXTURE_ANISOTROPY,
                        ..ImageSamplerDescriptor::default()
                    });
                }
                slot.status = SlotStatus::Loaded;
            }
            Some(LoadState::Failed(_)) => {
                warn!(
                    "{}",
                    VizError::TextureUnavailable {
                        name: slot.key.slot_name()
                    }
                );
                slot.status = SlotStatus::Failed;
            }
            _ => {}
        }
    }

    let statuses: Vec<SlotStatus> = pending.slots.iter().map(|s| s.status).collect();
    let timed_out =
        time.elapsed_secs() - pending.started_at > config.barrier_timeout_secs;
    if !all_terminal(&statuses) && !timed_out {
        return;
    }
    if timed_out && !all_terminal(&statuses) {
        let stuck = statuses
            .iter()
            .filter(|s| **s == SlotStatus::Pending)
            .count();
        warn!("Texture barrier watchdog fired with {stuck} slots still pending; continuing without them");
    }

    let mut loaded = 0;
    let mut failed = 0;
    for slot in pending.slots.drain(..) {
        match slot.status {
            SlotStatus::Loaded => {
                textures.set(slot.key, slot.handle);
                loaded += 1;
            }
            SlotStatus::Failed | SlotStatus::Pending => failed += 1,
        }
    }
    textures.ready = true;
    ready.write(TexturesReady { loaded, failed });
    next_state.set(EngineState::Running);
    info!("Textures ready: {loaded} loaded, {failed} missing");
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers the lifecycle state, the texture resources, and the barrier.
pub struct TextureLoaderPlugin;

impl Plugin for TextureLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<EngineState>()
            .init_resource::<crate::config::EngineConfig>()
            .init_resource::<TextureSet>()
            .init_resource::<PendingTextures>()
            .add_message::<TexturesReady>()
            .add_systems(OnEnter(EngineState::Loading), begin_texture_loading)
            .add_systems(
                Update,
                poll_texture_barrier.run_if(in_state(EngineState::Loading)),
            );
    }
}
