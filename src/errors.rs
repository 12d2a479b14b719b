//! Error types for the renderer.
//!
//! The thin `abs` wrappers report GPU failures as plain `String`s, the same way the GL bindings
//! do. Everything above them returns one of the enums below.

use std::path::PathBuf;

use thiserror::Error;

use crate::abs::gpu::ShaderStage;

/// Top level error returned by [`crate::Renderer`] and [`crate::Model`].
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to import model: {0}")]
    Import(#[from] ImportError),

    #[error("shader error: {0}")]
    Shader(#[from] ShaderError),

    #[error("texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("failed to upload mesh: {0}")]
    Mesh(String),

    #[error("{what} registry is full ({capacity} entries)")]
    RegistryFull { what: &'static str, capacity: usize },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl RenderError {
    /// Whether the error leaves the process without any usable shader.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Shader(ShaderError::FallbackFailed { .. }))
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not read {stage} shader source {path}: {source}")]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("built-in {stage} shader failed to compile: {log}")]
    FallbackFailed { stage: ShaderStage, log: String },

    #[error("program failed to link: {0}")]
    Link(String),

    #[error("shader is already loaded, destroy it before loading again")]
    AlreadyLoaded,

    #[error("shader program is not loaded")]
    NotLoaded,

    #[error("no active uniform named `{0}`")]
    UnknownUniform(String),

    #[error("gpu error: {0}")]
    Gpu(String),
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("could not decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{path} has {components} components, expected 1, 3 or 4")]
    UnsupportedComponents { path: PathBuf, components: u8 },

    #[error("texture cache is full ({capacity} textures)")]
    CacheFull { capacity: usize },

    #[error("gpu error: {0}")]
    Gpu(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not open {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("{0} contains no scenes")]
    NoScene(PathBuf),

    #[error("mesh {mesh} has no vertex positions")]
    MissingPositions { mesh: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}
