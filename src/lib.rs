//! A small OpenGL renderer for Phong-lit models. This crate holds the
//! model and light registries, the camera, shader management with a
//! built-in fallback program, and a texture cache shared by every model.

pub mod abs;
pub mod camera;
pub mod colour;
pub mod config;
pub mod errors;
pub mod import;
pub mod light;
pub mod logging;
pub mod model;
pub mod renderer;
pub mod transform;

pub use camera::Camera;
pub use colour::Colour;
pub use config::{Config, RendererConfig, WindowConfig};
pub use errors::{ConfigError, ImportError, RenderError, ShaderError, TextureError};
pub use import::{GltfImporter, MeshImporter};
pub use light::{Light, LightBuckets, LightKind};
pub use model::Model;
pub use renderer::{LightHandle, ModelHandle, RenderMode, Renderer, SpotlightParam};
pub use transform::Transform;
