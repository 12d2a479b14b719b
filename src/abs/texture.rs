//! Structs and functions for handling textures.
//!
//! [`TextureImage`] is the decoded, CPU side pixel data. [`Texture`] is its GPU side counterpart and
//! [`TextureCache`] makes sure every image file is uploaded at most once, no matter how many models
//! refer to it.

use std::{
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use fxhash::FxHashMap;
use image::DynamicImage;

use crate::{
    abs::gpu::{Gpu, GpuId},
    errors::TextureError,
};

/// Maximum number of distinct textures alive at once. Each one owns a texture unit.
pub const MAX_TEXTURES: usize = 32;

/// Layout of the pixels in a [`TextureImage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn components(self) -> u8 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// 8-bit image data ready to be uploaded.
#[derive(Clone, Debug)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl TextureImage {
    /// Decodes the image file at `path`.
    pub fn decode(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(path, image)
    }

    /// Converts an already decoded image. Only 1, 3 and 4 component images are accepted; wider
    /// sample types are narrowed to 8 bits.
    pub fn from_dynamic(path: &Path, image: DynamicImage) -> Result<Self, TextureError> {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image.color().channel_count() {
            1 => (PixelFormat::Red, image.into_luma8().into_raw()),
            3 => (PixelFormat::Rgb, image.into_rgb8().into_raw()),
            4 => (PixelFormat::Rgba, image.into_rgba8().into_raw()),
            components => {
                return Err(TextureError::UnsupportedComponents {
                    path: path.to_path_buf(),
                    components,
                });
            }
        };
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }
}

/// What a texture is sampled for in the lighting shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Prefix of the sampler uniforms of this kind inside `u_material`.
    pub fn sampler_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureKind::Diffuse => write!(f, "diffuse"),
            TextureKind::Specular => write!(f, "specular"),
        }
    }
}

/// Represents a texture stored on the GPU side.
pub struct Texture {
    gpu: Rc<dyn Gpu>,
    id: GpuId,
    unit: u32,
    kind: TextureKind,
    path: PathBuf,
}

impl Texture {
    /// Uploads `image` and leaves it bound to `unit`.
    pub fn new(
        gpu: &Rc<dyn Gpu>,
        image: &TextureImage,
        unit: u32,
        kind: TextureKind,
        path: PathBuf,
    ) -> Result<Self, String> {
        let id = gpu.create_texture(image, unit)?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            unit,
            kind,
            path,
        })
    }

    /// Binds the texture to its own texture unit.
    pub fn bind(&self) {
        self.gpu.bind_texture(self.unit, Some(self.id));
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// The kind this texture was first loaded as.
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("unit", &self.unit)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.gpu.delete_texture(self.id);
    }
}

/// Index of a texture inside a [`TextureCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(usize);

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Path keyed store of every uploaded texture.
pub struct TextureCache {
    gpu: Rc<dyn Gpu>,
    textures: Vec<Texture>,
    by_path: FxHashMap<PathBuf, TextureId>,
}

impl TextureCache {
    pub fn new(gpu: &Rc<dyn Gpu>) -> Self {
        Self {
            gpu: Rc::clone(gpu),
            textures: Vec::new(),
            by_path: FxHashMap::default(),
        }
    }

    fn key(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }

    /// Returns the texture for `path`, uploading it first if this is the first request.
    ///
    /// The boolean is `true` when a new upload happened.
    pub fn load(&mut self, path: &Path, kind: TextureKind) -> Result<(TextureId, bool), TextureError> {
        let key = Self::key(path);
        if let Some(&id) = self.by_path.get(&key) {
            log::trace!("Reusing {} texture {}", kind, key.display());
            return Ok((id, false));
        }

        if self.textures.len() >= MAX_TEXTURES {
            return Err(TextureError::CacheFull {
                capacity: MAX_TEXTURES,
            });
        }

        let image = TextureImage::decode(&key)?;
        let id = TextureId(self.textures.len());
        let texture = Texture::new(&self.gpu, &image, id.0 as u32, kind, key.clone())
            .map_err(TextureError::Gpu)?;
        log::info!(
            "Loaded {} texture {} ({}x{}, {} components) into unit {}",
            kind,
            key.display(),
            image.width,
            image.height,
            image.format.components(),
            texture.unit()
        );
        self.textures.push(texture);
        self.by_path.insert(key, id);
        Ok((id, true))
    }

    pub fn find(&self, path: &Path) -> Option<TextureId> {
        self.by_path.get(&Self::key(path)).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Deletes every texture. Ids handed out before are invalid afterwards.
    pub fn unload_all(&mut self) {
        if !self.textures.is_empty() {
            log::info!("Unloading {} textures", self.textures.len());
        }
        self.by_path.clear();
        self.textures.clear();
    }
}
