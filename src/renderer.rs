//! The renderer: registries of models and lights, the camera, and the frame.
//!
//! Models and lights live in generational slot maps so handles stay valid (or detectably stale)
//! across removals, while a separate list keeps registration order. Light slot assignment in the
//! shader arrays depends on that order, so every change to the light list recomputes the
//! [`LightBuckets`] and re-broadcasts them to every model.

use std::{path::Path, rc::Rc};

use slotmap::{SlotMap, new_key_type};

use crate::{
    abs::{gpu::Gpu, shader::Shader, texture::TextureCache},
    camera::Camera,
    colour::Colour,
    config::RendererConfig,
    errors::RenderError,
    import::{GltfImporter, MeshImporter},
    light::{Light, LightBuckets, LightKind, MAX_ANGLE, MAX_BLUR, broadcast, bucketize},
    model::Model,
};

/// Most models a renderer holds at once.
pub const MAX_MODELS: usize = 256;
/// Most lights a renderer holds at once.
pub const MAX_LIGHTS: usize = 256;

/// Spot parameters this close to a bound snap onto it, so repeated float steps land exactly.
const SPOT_TOLERANCE: f32 = 1e-4;

new_key_type! {
    pub struct ModelHandle;
    pub struct LightHandle;
}

/// Polygon rasterisation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Point,
    Line,
    Fill,
}

impl RenderMode {
    fn gl_mode(self) -> u32 {
        match self {
            RenderMode::Point => glow::POINT,
            RenderMode::Line => glow::LINE,
            RenderMode::Fill => glow::FILL,
        }
    }
}

/// Which spot light parameter [`Renderer::modify_spotlights`] changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpotlightParam {
    /// Raw cutoff angle, kept within `[0, 90]` degrees.
    Angle,
    /// Raw blur, kept within `[0, 1]`.
    Blur,
}

impl SpotlightParam {
    fn limit(self) -> f32 {
        match self {
            SpotlightParam::Angle => MAX_ANGLE,
            SpotlightParam::Blur => MAX_BLUR,
        }
    }

    fn get(self, light: &Light) -> f32 {
        match self {
            SpotlightParam::Angle => light.angle_raw(),
            SpotlightParam::Blur => light.blur_raw(),
        }
    }

    fn set(self, light: &mut Light, value: f32) {
        match self {
            SpotlightParam::Angle => light.set_angle(value),
            SpotlightParam::Blur => light.set_blur(value),
        };
    }
}

pub struct Renderer {
    gpu: Rc<dyn Gpu>,
    importer: Box<dyn MeshImporter>,
    models: SlotMap<ModelHandle, Model>,
    model_order: Vec<ModelHandle>,
    lights: SlotMap<LightHandle, Light>,
    light_order: Vec<LightHandle>,
    buckets: LightBuckets,
    textures: TextureCache,
    camera: Camera,
    clear_colour: Colour,
}

impl Renderer {
    /// Sets up the camera and the global GL state from `config`. Models are imported with
    /// [`GltfImporter`] unless another importer is supplied through [`Renderer::with_importer`].
    pub fn new(gpu: Rc<dyn Gpu>, aspect_ratio: f32, config: &RendererConfig) -> Self {
        let mut camera = Camera::new(aspect_ratio, config.field_of_view);
        camera.set_clip_planes(config.near, config.far);
        camera.set_position(config.camera_position);

        let mut renderer = Self {
            textures: TextureCache::new(&gpu),
            gpu,
            importer: Box::new(GltfImporter),
            models: SlotMap::with_key(),
            model_order: Vec::new(),
            lights: SlotMap::with_key(),
            light_order: Vec::new(),
            buckets: LightBuckets::default(),
            camera,
            clear_colour: config.clear_colour,
        };
        renderer.set_clear_colour(config.clear_colour);
        renderer.set_render_depth_buffer(config.depth_test);
        log::info!(
            "Renderer ready (fov {}, camera at {})",
            config.field_of_view,
            config.camera_position
        );
        renderer
    }

    pub fn with_importer(mut self, importer: impl MeshImporter + 'static) -> Self {
        self.importer = Box::new(importer);
        self
    }

    /// Loads a model and registers it after the existing ones.
    ///
    /// The new model's shader receives every registered light before this returns.
    pub fn add_model(
        &mut self,
        path: &Path,
        shader_path: Option<&Path>,
        load_textures: bool,
    ) -> Result<ModelHandle, RenderError> {
        if self.models.len() >= MAX_MODELS {
            log::warn!("Cannot add {}: model registry is full", path.display());
            return Err(RenderError::RegistryFull {
                what: "model",
                capacity: MAX_MODELS,
            });
        }

        let mut model = Model::load(
            &self.gpu,
            self.importer.as_ref(),
            &mut self.textures,
            path,
            shader_path,
            load_textures,
        )?;
        model.sync_lights(&self.buckets);

        let handle = self.models.insert(model);
        self.model_order.push(handle);
        Ok(handle)
    }

    /// Registers a light with default parameters, white unless `colour` is given.
    pub fn add_light(&mut self, kind: LightKind, colour: Option<Colour>) -> Option<LightHandle> {
        let mut light = Light::new(kind);
        if let Some(colour) = colour {
            light.set_colour(colour);
        }
        self.insert_light(light)
    }

    /// Registers `light` after the existing ones. Returns `None` when the registry is full.
    pub fn insert_light(&mut self, light: Light) -> Option<LightHandle> {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("Cannot add {:?} light: light registry is full", light.kind());
            return None;
        }
        let kind = light.kind();
        let handle = self.lights.insert(light);
        self.light_order.push(handle);
        self.relight();
        log::debug!("Added {:?} light ({} lights)", kind, self.lights.len());
        Some(handle)
    }

    /// Unregisters a model, freeing its shader and meshes. Its textures stay cached.
    pub fn remove_model(&mut self, handle: ModelHandle) -> bool {
        let Some(model) = self.models.remove(handle) else {
            return false;
        };
        self.model_order.retain(|h| *h != handle);
        log::debug!("Removed model {}", model.path().display());
        true
    }

    /// Unregisters a light. Later lights of the same kind move down one slot and the freed slot
    /// is cleared in every shader.
    pub fn remove_light(&mut self, handle: LightHandle) -> Option<Light> {
        let light = self.lights.remove(handle)?;
        self.light_order.retain(|h| *h != handle);
        self.relight();
        Some(light)
    }

    /// Changes a light in place and pushes the result to every model.
    pub fn update_light(&mut self, handle: LightHandle, update: impl FnOnce(&mut Light)) -> bool {
        let Some(light) = self.lights.get_mut(handle) else {
            return false;
        };
        update(light);
        self.relight();
        true
    }

    fn relight(&mut self) {
        let lights = &self.lights;
        self.buckets = bucketize(self.light_order.iter().filter_map(|h| lights.get(*h)));
        self.update_all_shaders();
    }

    /// Sends the current light buckets to every model, writing only what each shader has not
    /// seen yet. Returns the number of uniform writes.
    pub fn update_all_shaders(&mut self) -> usize {
        let mut writes = 0;
        for handle in &self.model_order {
            if let Some(model) = self.models.get_mut(*handle) {
                writes += model.sync_lights(&self.buckets);
            }
        }
        writes
    }

    /// Writes every registered light into `shader`, regardless of what it already holds.
    pub fn load_lights_into_shader(&self, shader: &Shader) -> usize {
        broadcast(shader, &self.buckets, None)
    }

    /// Adds `delta` to the chosen raw parameter of every spot light.
    ///
    /// A light whose new value would leave the allowed range keeps its old value. Returns how
    /// many spot lights accepted the change.
    pub fn modify_spotlights(&mut self, param: SpotlightParam, delta: f32) -> usize {
        let spots: Vec<LightHandle> = self
            .light_order
            .iter()
            .copied()
            .filter(|h| self.lights.get(*h).is_some_and(|l| l.kind() == LightKind::Spot))
            .collect();

        let mut accepted = 0;
        for (spot, handle) in spots.into_iter().enumerate() {
            let Some(light) = self.lights.get_mut(handle) else {
                continue;
            };
            let limit = param.limit();
            let mut value = param.get(light) + delta;
            if (value - limit).abs() <= SPOT_TOLERANCE {
                value = limit;
            } else if value.abs() <= SPOT_TOLERANCE {
                value = 0.0;
            }
            if (0.0..=limit).contains(&value) {
                param.set(light, value);
                accepted += 1;
            } else {
                log::debug!(
                    "Spot light {} keeps {:?} {} ({} is out of range)",
                    spot,
                    param,
                    param.get(light),
                    value
                );
            }
        }
        if accepted > 0 {
            self.relight();
        }
        accepted
    }

    /// Clears the frame and draws every model with the renderer's camera.
    pub fn draw(&self) {
        self.draw_with(None);
    }

    /// Clears the frame and draws every model in registration order, from `camera` if given.
    pub fn draw_with(&self, camera: Option<&Camera>) {
        self.gpu.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        let camera = camera.unwrap_or(&self.camera);
        for handle in &self.model_order {
            if let Some(model) = self.models.get(*handle) {
                model.draw(camera, &self.textures);
            }
        }
    }

    pub fn set_clear_colour(&mut self, colour: Colour) {
        self.clear_colour = colour;
        let [r, g, b]: [f32; 3] = colour.into();
        self.gpu.clear_color(r, g, b, 1.0);
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        self.gpu.polygon_mode(glow::FRONT_AND_BACK, mode.gl_mode());
    }

    pub fn set_render_depth_buffer(&self, enabled: bool) {
        if enabled {
            self.gpu.enable(glow::DEPTH_TEST);
        } else {
            self.gpu.disable(glow::DEPTH_TEST);
        }
    }

    /// Resizes the viewport and matches the camera's aspect ratio to it. A zero-sized
    /// resolution (a minimised window) is ignored.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring {}x{} resolution", width, height);
            return;
        }
        self.gpu.viewport(0, 0, width as i32, height as i32);
        self.camera.set_aspect_ratio(width as f32 / height as f32);
    }

    pub fn clear_colour(&self) -> Colour {
        self.clear_colour
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Handles of the registered models, in registration order.
    pub fn model_handles(&self) -> &[ModelHandle] {
        &self.model_order
    }

    /// Handles of the registered lights, in registration order.
    pub fn light_handles(&self) -> &[LightHandle] {
        &self.light_order
    }

    /// The model at position `index` in registration order.
    pub fn model_at(&self, index: usize) -> Option<&Model> {
        let model = self
            .model_order
            .get(index)
            .and_then(|handle| self.models.get(*handle));
        if model.is_none() {
            log::warn!(
                "No model at index {} ({} registered)",
                index,
                self.models.len()
            );
        }
        model
    }

    /// The light at position `index` in registration order.
    pub fn light_at(&self, index: usize) -> Option<&Light> {
        let light = self
            .light_order
            .get(index)
            .and_then(|handle| self.lights.get(*handle));
        if light.is_none() {
            log::warn!(
                "No light at index {} ({} registered)",
                index,
                self.lights.len()
            );
        }
        light
    }

    pub fn model(&self, handle: ModelHandle) -> Option<&Model> {
        self.models.get(handle)
    }

    pub fn model_mut(&mut self, handle: ModelHandle) -> Option<&mut Model> {
        self.models.get_mut(handle)
    }

    /// Lights are changed through [`Renderer::update_light`] so the shaders stay in sync.
    pub fn light(&self, handle: LightHandle) -> Option<&Light> {
        self.lights.get(handle)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn light_buckets(&self) -> &LightBuckets {
        &self.buckets
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let (models, lights, textures) = (self.models.len(), self.lights.len(), self.textures.len());
        self.model_order.clear();
        self.models.clear();
        self.light_order.clear();
        self.lights.clear();
        self.textures.unload_all();
        log::info!(
            "Renderer shut down ({} models, {} lights, {} textures released)",
            models,
            lights,
            textures
        );
    }
}
