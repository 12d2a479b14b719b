//! This module contains the thin OpenGL layer under the engine: the GPU context seam, shader
//! management, mesh handling and textures, plus the windowed application setup.

#[cfg(feature = "viewer")]
pub mod app;
pub mod gpu;
pub mod mesh;
#[cfg(test)]
pub mod mock;
pub mod shader;
pub mod texture;

#[cfg(feature = "viewer")]
pub use app::*;
pub use gpu::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
