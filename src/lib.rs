//! Orbital-impact visualization engine library
//!
//! Real-time 3D rendering of an asteroid's approach, atmospheric entry, and
//! impact against a stylized Earth, driven by host-supplied parameters
//! (size, velocity, entry angle, composition).

pub mod animation;
pub mod asteroid;
pub mod camera;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod overlay;
pub mod params;
pub mod quality;
pub mod scene;
pub mod textures;
pub mod trajectory;
pub mod viewport;
