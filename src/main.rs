use bevy::prelude::*;
use bevy::window::WindowResolution;

mod animation;
mod asteroid;
mod camera;
mod config;
mod constants;
mod effects;
mod error;
mod overlay;
mod params;
mod quality;
mod scene;
mod textures;
mod trajectory;
mod viewport;

use config::EngineConfig;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bolide Impact Visualizer".into(),
                resolution: WindowResolution::new(1280, 720),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::BLACK))
        // Insert EngineConfig with compiled defaults; load_engine_config will
        // overwrite it from assets/engine.toml (if present) in the Startup schedule.
        .insert_resource(EngineConfig::default())
        .add_plugins((
            textures::TextureLoaderPlugin,
            viewport::ViewportPlugin,
            quality::QualityPlugin,
            scene::SceneBuilderPlugin,
            asteroid::AsteroidFactoryPlugin,
            animation::AnimationDriverPlugin,
            camera::CameraRigPlugin,
            effects::ImpactEffectsPlugin,
            overlay::OverlayPlugin,
        ))
        .add_systems(
            Startup,
            (
                // Load config first so every other startup system sees the final values.
                config::load_engine_config,
                params::apply_startup_preset,
                camera::seed_camera_from_config,
                quality::seed_quality_from_config,
                overlay::seed_overlay_from_config,
            )
                .chain(),
        )
        .run();
}
