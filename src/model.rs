//! Renderable models.
//!
//! A [`Model`] owns its meshes and its shader, and refers to textures living in the shared
//! [`TextureCache`]. Loading flattens the imported node tree depth first into a plain mesh list.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use glam::{Mat3, Vec2, Vec3};

use crate::{
    abs::{
        gpu::Gpu,
        mesh::{Mesh, ModelVertex},
        shader::Shader,
        texture::{TextureCache, TextureId, TextureKind},
    },
    camera::Camera,
    colour::Colour,
    errors::RenderError,
    import::{ImportedMesh, ImportedNode, ImportedScene, MeshImporter},
    light::{LightBuckets, broadcast},
    transform::Transform,
};

/// A texture used by a model, and what the model samples it as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelTexture {
    pub id: TextureId,
    pub kind: TextureKind,
}

pub struct Model {
    path: PathBuf,
    meshes: Vec<Mesh<ModelVertex>>,
    textures: Vec<ModelTexture>,
    shader: Shader,
    transform: Transform,
    colour: Colour,
    only_colour: bool,
    lights: Option<LightBuckets>,
}

/// Converts imported geometry into model vertices.
fn vertices(mesh: &ImportedMesh) -> Vec<ModelVertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let normal = mesh
                .normals
                .as_ref()
                .and_then(|normals| normals.get(i))
                .map_or(Vec3::ZERO, |n| Vec3::from_array(*n));
            let tex_coords = mesh
                .tex_coords
                .as_ref()
                .and_then(|coords| coords.get(i))
                .map_or(Vec2::ZERO, |uv| Vec2::from_array(*uv));
            ModelVertex::new(Vec3::from_array(*position), normal, tex_coords)
        })
        .collect()
}

/// State threaded through the node walk.
struct Loader<'a> {
    gpu: &'a Rc<dyn Gpu>,
    scene: &'a ImportedScene,
    textures: Option<&'a mut TextureCache>,
    directory: &'a Path,
    meshes: Vec<Mesh<ModelVertex>>,
    model_textures: Vec<ModelTexture>,
}

impl Loader<'_> {
    fn process_node(&mut self, node: &ImportedNode) -> Result<(), RenderError> {
        let scene = self.scene;
        for &index in &node.meshes {
            let Some(mesh) = scene.meshes.get(index) else {
                log::warn!("Node refers to missing mesh {}", index);
                continue;
            };
            self.process_mesh(mesh)?;
        }
        for child in &node.children {
            self.process_node(child)?;
        }
        Ok(())
    }

    fn process_mesh(&mut self, mesh: &ImportedMesh) -> Result<(), RenderError> {
        let uploaded = Mesh::new(self.gpu, vertices(mesh), mesh.indices.clone())
            .map_err(RenderError::Mesh)?;
        self.meshes.push(uploaded);

        let scene = self.scene;
        let material = mesh.material.and_then(|index| scene.materials.get(index));
        if let Some(material) = material {
            for reference in &material.diffuse {
                self.resolve_texture(reference, TextureKind::Diffuse);
            }
            for reference in &material.specular {
                self.resolve_texture(reference, TextureKind::Specular);
            }
        }
        Ok(())
    }

    fn resolve_texture(&mut self, reference: &str, kind: TextureKind) {
        let Some(cache) = self.textures.as_deref_mut() else {
            return;
        };
        let path = self.directory.join(reference);
        match cache.load(&path, kind) {
            Ok((id, _)) => {
                if !self.model_textures.iter().any(|t| t.id == id) {
                    self.model_textures.push(ModelTexture { id, kind });
                }
            }
            Err(e) => log::warn!("Skipping {} texture: {}", kind, e),
        }
    }
}

impl Model {
    /// Imports `model_path`, uploads its meshes, resolves its textures through `textures` and
    /// compiles its shader.
    ///
    /// Textures that fail to load are skipped. With `load_textures` unset the materials are
    /// ignored entirely.
    pub fn load(
        gpu: &Rc<dyn Gpu>,
        importer: &dyn MeshImporter,
        textures: &mut TextureCache,
        model_path: &Path,
        shader_path: Option<&Path>,
        load_textures: bool,
    ) -> Result<Self, RenderError> {
        let scene = importer.import(model_path)?;
        let shader = Shader::new(gpu, shader_path)?;

        let mut loader = Loader {
            gpu,
            scene: &scene,
            textures: load_textures.then_some(&mut *textures),
            directory: model_path.parent().unwrap_or(Path::new("")),
            meshes: Vec::new(),
            model_textures: Vec::new(),
        };
        loader.process_node(&scene.root)?;
        let Loader {
            meshes,
            model_textures,
            ..
        } = loader;

        let model = Self {
            path: model_path.to_path_buf(),
            meshes,
            textures: model_textures,
            shader,
            transform: Transform::new(),
            colour: Colour::WHITE,
            only_colour: false,
            lights: None,
        };
        model.load_textures_to_shader(textures);
        log::info!(
            "Loaded model {} ({} meshes, {} textures)",
            model.path.display(),
            model.meshes.len(),
            model.textures.len()
        );
        Ok(model)
    }

    /// Points the `u_material.texture_<kind>N` samplers at this model's textures, numbering each
    /// kind separately in the order the textures were resolved.
    pub fn load_textures_to_shader(&self, cache: &TextureCache) {
        let (mut diffuse, mut specular) = (0, 0);
        for texture in &self.textures {
            let Some(unit) = cache.get(texture.id).map(|t| t.unit()) else {
                continue;
            };
            let counter = match texture.kind {
                TextureKind::Diffuse => &mut diffuse,
                TextureKind::Specular => &mut specular,
            };
            let name = format!("u_material.{}{}", texture.kind.sampler_prefix(), counter);
            *counter += 1;
            self.shader.set_if_active(&name, unit as i32);
        }
    }

    /// Writes `buckets` into the shader, only touching what changed since the last call.
    pub fn sync_lights(&mut self, buckets: &LightBuckets) -> usize {
        let writes = broadcast(&self.shader, buckets, self.lights.as_ref());
        self.lights = Some(buckets.clone());
        writes
    }

    pub fn draw(&self, camera: &Camera, cache: &TextureCache) {
        if !self.shader.is_loaded() {
            log::debug!("Not drawing {}: shader is not loaded", self.path.display());
            return;
        }

        self.shader.bind();
        let model = self.transform.matrix();
        self.shader.set_if_active("u_camera", camera.world_to_camera());
        self.shader.set_if_active("u_viewPos", camera.position().truncate());
        self.shader.set_if_active("u_model", model);
        self.shader.set_if_active(
            "u_transposeInverseOfModel",
            Mat3::from_mat4(model).inverse().transpose(),
        );

        for texture in &self.textures {
            if let Some(texture) = cache.get(texture.id) {
                texture.bind();
            }
        }
        for mesh in &self.meshes {
            mesh.draw();
        }
    }

    pub fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
        self.shader.set_if_active("u_colour", colour.as_vec3());
    }

    /// Draw with the flat colour only, ignoring lights and textures.
    pub fn set_only_colour(&mut self, only_colour: bool) {
        self.only_colour = only_colour;
        self.shader.set_if_active("u_justColour", only_colour);
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn only_colour(&self) -> bool {
        self.only_colour
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meshes(&self) -> &[Mesh<ModelVertex>] {
        &self.meshes
    }

    pub fn textures(&self) -> &[ModelTexture] {
        &self.textures
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    /// The light buckets last written into the shader.
    pub fn light_snapshot(&self) -> Option<&LightBuckets> {
        self.lights.as_ref()
    }
}
