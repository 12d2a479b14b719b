//! OpenGL Shaders
//!
//! This module defines the [`Shader`] struct, a vertex + fragment program loaded from
//! `<path>.vert` / `<path>.frag` with a built-in Phong program to fall back on. It also provides
//! the [`Uniform`] trait for setting uniform variables in shader programs.

use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::{
    abs::gpu::{Gpu, GpuId, ShaderStage, UniformLocation},
    errors::ShaderError,
};

/// Built-in vertex stage, used when no usable vertex source is given.
pub const FALLBACK_VERTEX: &str = include_str!("../shaders/fallback/vert.glsl");
/// Built-in Phong fragment stage with room for 3 directional, 30 point and 30 spot lights.
pub const FALLBACK_FRAGMENT: &str = include_str!("../shaders/fallback/frag.glsl");

fn fallback_source(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => FALLBACK_VERTEX,
        ShaderStage::Fragment => FALLBACK_FRAGMENT,
    }
}

/// Reads the source of one stage, found next to `base` with the stage's extension appended.
pub fn read_stage_source(base: &Path, stage: ShaderStage) -> Result<String, ShaderError> {
    let mut file = OsString::from(base.as_os_str());
    file.push(stage.extension());
    let file = PathBuf::from(file);
    std::fs::read_to_string(&file).map_err(|source| ShaderError::Read {
        stage,
        path: file,
        source,
    })
}

fn compile_stage_source(gpu: &dyn Gpu, stage: ShaderStage, source: &str) -> Result<GpuId, ShaderError> {
    let shader = gpu.create_shader(stage).map_err(ShaderError::Gpu)?;
    gpu.shader_source(shader, source);
    gpu.compile_shader(shader);

    if !gpu.shader_compile_status(shader) {
        let log = gpu.shader_info_log(shader);
        gpu.delete_shader(shader);
        return Err(ShaderError::Compile { stage, log });
    }
    Ok(shader)
}

/// Represents a uniform variable in a shader program.
pub trait Uniform {
    /// Writes the value to `location` of the currently bound program.
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation);
}

impl Uniform for bool {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_1_i32(location, *self as i32);
    }
}

impl Uniform for i32 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_1_i32(location, *self);
    }
}

impl Uniform for u32 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_1_u32(location, *self);
    }
}

impl Uniform for f32 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_1_f32(location, *self);
    }
}

impl Uniform for Vec2 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_2_f32(location, self.x, self.y);
    }
}

impl Uniform for Vec3 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_3_f32(location, self.x, self.y, self.z);
    }
}

impl Uniform for Vec4 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_4_f32(location, self.x, self.y, self.z, self.w);
    }
}

impl Uniform for Mat3 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_matrix_3_f32_slice(location, &self.to_cols_array());
    }
}

impl Uniform for Mat4 {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        gpu.uniform_matrix_4_f32_slice(location, &self.to_cols_array());
    }
}

impl<T: Uniform> Uniform for &T {
    fn set_uniform(&self, gpu: &dyn Gpu, location: &UniformLocation) {
        (*self).set_uniform(gpu, location);
    }
}

/// Lifecycle of a [`Shader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderState {
    Unloaded,
    Loading,
    /// Both stages came from the requested files.
    Loaded,
    /// At least one stage uses the built-in source.
    FallbackLoaded,
    /// The stages compiled but the program did not link. Nothing is bound.
    LinkFailed,
}

/// Represents a linked vertex + fragment program.
pub struct Shader {
    gpu: Rc<dyn Gpu>,
    program: Option<GpuId>,
    state: ShaderState,
    path: Option<PathBuf>,
}

impl Shader {
    /// Creates and loads a shader. `None` or an empty path selects the built-in program.
    pub fn new(gpu: &Rc<dyn Gpu>, path: Option<&Path>) -> Result<Self, ShaderError> {
        let mut shader = Self::unloaded(gpu);
        shader.load(path)?;
        Ok(shader)
    }

    /// Creates a shader without any GPU program.
    pub fn unloaded(gpu: &Rc<dyn Gpu>) -> Self {
        Self {
            gpu: Rc::clone(gpu),
            program: None,
            state: ShaderState::Unloaded,
            path: None,
        }
    }

    /// Compiles both stages and links them.
    ///
    /// A stage whose file is missing or fails to compile is replaced by the built-in one. Only a
    /// failing built-in stage is an error; a link failure leaves the shader in
    /// [`ShaderState::LinkFailed`] and returns `Ok`.
    pub fn load(&mut self, path: Option<&Path>) -> Result<(), ShaderError> {
        if self.is_loaded() {
            log::error!(
                "Refusing to load {} over an already loaded shader",
                Self::describe(path)
            );
            return Err(ShaderError::AlreadyLoaded);
        }

        self.state = ShaderState::Loading;
        self.path = path
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);

        let (vertex, vertex_fallback) = match self.compile_stage(ShaderStage::Vertex) {
            Ok(stage) => stage,
            Err(e) => {
                self.state = ShaderState::Unloaded;
                return Err(e);
            }
        };
        let (fragment, fragment_fallback) = match self.compile_stage(ShaderStage::Fragment) {
            Ok(stage) => stage,
            Err(e) => {
                self.gpu.delete_shader(vertex);
                self.state = ShaderState::Unloaded;
                return Err(e);
            }
        };

        match self.link(vertex, fragment) {
            Ok(program) => {
                self.gpu.use_program(Some(program));
                self.program = Some(program);
                self.state = if vertex_fallback || fragment_fallback {
                    ShaderState::FallbackLoaded
                } else {
                    ShaderState::Loaded
                };
                log::info!(
                    "Loaded shader {} ({:?})",
                    Self::describe(self.path.as_deref()),
                    self.state
                );
            }
            Err(e) => {
                log::error!("Shader {}: {}", Self::describe(self.path.as_deref()), e);
                self.state = ShaderState::LinkFailed;
            }
        }
        Ok(())
    }

    fn describe(path: Option<&Path>) -> String {
        match path {
            Some(p) if !p.as_os_str().is_empty() => p.display().to_string(),
            _ => "<built-in>".to_string(),
        }
    }

    /// Compiles one stage, returning whether the built-in source had to be used.
    fn compile_stage(&self, stage: ShaderStage) -> Result<(GpuId, bool), ShaderError> {
        let requested = match &self.path {
            Some(base) => match read_stage_source(base, stage) {
                Ok(source) => Some(source),
                Err(e) => {
                    log::warn!("{}, using the built-in {} shader", e, stage);
                    None
                }
            },
            None => None,
        };

        if let Some(source) = requested {
            match compile_stage_source(&*self.gpu, stage, &source) {
                Ok(shader) => return Ok((shader, false)),
                Err(e) => log::warn!("{}, using the built-in {} shader", e, stage),
            }
        }

        compile_stage_source(&*self.gpu, stage, fallback_source(stage))
            .map(|shader| (shader, true))
            .map_err(|e| match e {
                ShaderError::Compile { stage, log } => {
                    log::error!("Built-in {} shader failed to compile: {}", stage, log);
                    ShaderError::FallbackFailed { stage, log }
                }
                other => other,
            })
    }

    /// Links the two stages. The stages are deleted whatever the outcome.
    fn link(&self, vertex: GpuId, fragment: GpuId) -> Result<GpuId, ShaderError> {
        let gpu = &*self.gpu;
        let program = match gpu.create_program() {
            Ok(program) => program,
            Err(e) => {
                gpu.delete_shader(vertex);
                gpu.delete_shader(fragment);
                return Err(ShaderError::Link(e));
            }
        };

        gpu.attach_shader(program, vertex);
        gpu.attach_shader(program, fragment);
        gpu.link_program(program);
        let linked = gpu.program_link_status(program);
        let log = if linked {
            String::new()
        } else {
            gpu.program_info_log(program)
        };

        gpu.detach_shader(program, vertex);
        gpu.detach_shader(program, fragment);
        gpu.delete_shader(vertex);
        gpu.delete_shader(fragment);

        if !linked {
            gpu.delete_program(program);
            return Err(ShaderError::Link(log));
        }
        Ok(program)
    }

    /// Deletes the program. The shader may be loaded again afterwards.
    pub fn destroy(&mut self) {
        if let Some(program) = self.program.take() {
            self.gpu.delete_program(program);
        }
        self.state = ShaderState::Unloaded;
    }

    /// Binds the shader program for use.
    pub fn bind(&self) {
        if let Some(program) = self.program {
            self.gpu.use_program(Some(program));
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            ShaderState::Loaded | ShaderState::FallbackLoaded
        )
    }

    pub fn state(&self) -> ShaderState {
        self.state
    }

    /// The base path the stages were requested from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn program(&self) -> Option<GpuId> {
        self.program
    }

    /// Sets a uniform variable in the shader program.
    ///
    /// Names the linked program does not know about are reported, not written.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) -> Result<(), ShaderError> {
        let program = self.program.ok_or(ShaderError::NotLoaded)?;
        let location = self
            .gpu
            .uniform_location(program, name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
        self.gpu.use_program(Some(program));
        value.set_uniform(&*self.gpu, &location);
        Ok(())
    }

    /// Like [`Shader::set_uniform`], but only logs failures. Returns whether a write happened.
    pub fn set_if_active<T: Uniform>(&self, name: &str, value: T) -> bool {
        match self.set_uniform(name, value) {
            Ok(()) => true,
            Err(e) => {
                log::trace!("{}", e);
                false
            }
        }
    }

    pub fn set_bool(&self, name: &str, value: bool) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_int(&self, name: &str, value: i32) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_uint(&self, name: &str, value: u32) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_float(&self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_float2(&self, name: &str, value: Vec2) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_float3(&self, name: &str, value: Vec3) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_float4(&self, name: &str, value: Vec4) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_mat3(&self, name: &str, value: Mat3) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) -> Result<(), ShaderError> {
        self.set_uniform(name, value)
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("state", &self.state)
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::mock::{Recorded, RecordingGpu, scratch_dir};

    const VERT: &str = "#version 330 core\nuniform mat4 u_camera;\nvoid main() {}\n";
    const FRAG: &str = "#version 330 core\nuniform vec3 u_tint;\nvoid main() {}\n";

    fn gpu() -> (Rc<RecordingGpu>, Rc<dyn Gpu>) {
        let gpu = Rc::new(RecordingGpu::new());
        let dyn_gpu: Rc<dyn Gpu> = gpu.clone();
        (gpu, dyn_gpu)
    }

    fn write_stages(name: &str, vert: &str, frag: &str) -> PathBuf {
        let dir = scratch_dir(name);
        let base = dir.join("basic");
        std::fs::write(dir.join("basic.vert"), vert).unwrap();
        std::fs::write(dir.join("basic.frag"), frag).unwrap();
        base
    }

    #[test]
    fn test_missing_files_use_fallback() {
        let (_rec, gpu) = gpu();
        let shader = Shader::new(&gpu, Some(Path::new("/no/such/shader"))).unwrap();
        assert!(shader.is_loaded());
        assert_eq!(shader.state(), ShaderState::FallbackLoaded);
        assert_eq!(shader.path(), Some(Path::new("/no/such/shader")));
        assert!(!Path::new("/no/such/shader.vert").exists());
    }

    #[test]
    fn test_no_path_uses_fallback() {
        let (_rec, gpu) = gpu();
        let shader = Shader::new(&gpu, None).unwrap();
        assert_eq!(shader.state(), ShaderState::FallbackLoaded);
        assert!(shader.set_float("u_material.shininess", 32.0).is_ok());

        let empty = Shader::new(&gpu, Some(Path::new(""))).unwrap();
        assert_eq!(empty.state(), ShaderState::FallbackLoaded);
        assert_eq!(empty.path(), None);
    }

    #[test]
    fn test_files_on_disk_are_used() {
        let base = write_stages("shader-disk", VERT, FRAG);
        let (rec, gpu) = gpu();
        let shader = Shader::new(&gpu, Some(&base)).unwrap();
        assert_eq!(shader.state(), ShaderState::Loaded);

        shader.set_float3("u_tint", Vec3::new(1.0, 0.5, 0.25)).unwrap();
        let program = shader.program().unwrap();
        assert_eq!(
            rec.last_write(program, "u_tint"),
            Some(Recorded::Floats(vec![1.0, 0.5, 0.25]))
        );
        // The fallback's uniforms are not part of this program.
        assert!(matches!(
            shader.set_float("u_material.shininess", 1.0),
            Err(ShaderError::UnknownUniform(_))
        ));
        assert_eq!(rec.live_stages(), 0);
    }

    #[test]
    fn test_broken_stage_falls_back_per_stage() {
        let base = write_stages("shader-broken", VERT, "#version 330 core\n#error nope\n");
        let (_rec, gpu) = gpu();
        let shader = Shader::new(&gpu, Some(&base)).unwrap();
        assert_eq!(shader.state(), ShaderState::FallbackLoaded);
        // Vertex stage still came from disk.
        assert!(shader.set_mat4("u_camera", Mat4::IDENTITY).is_ok());
        assert!(shader.set_bool("u_justColour", true).is_ok());
    }

    #[test]
    fn test_fallback_failure_is_reported() {
        let rec = Rc::new(RecordingGpu::failing_compiles());
        let gpu: Rc<dyn Gpu> = rec.clone();
        let err = Shader::new(&gpu, None).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::FallbackFailed {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert_eq!(rec.live_stages(), 0);
    }

    #[test]
    fn test_link_failure_is_not_fatal() {
        let rec = Rc::new(RecordingGpu::failing_link());
        let gpu: Rc<dyn Gpu> = rec.clone();
        let shader = Shader::new(&gpu, None).unwrap();
        assert_eq!(shader.state(), ShaderState::LinkFailed);
        assert!(!shader.is_loaded());
        assert_eq!(rec.live_programs(), 0);
        assert_eq!(rec.live_stages(), 0);
        assert!(matches!(
            shader.set_int("u_anything", 1),
            Err(ShaderError::NotLoaded)
        ));
    }

    #[test]
    fn test_loading_twice_is_an_error() {
        let (rec, gpu) = gpu();
        let mut shader = Shader::new(&gpu, None).unwrap();
        let program = shader.program();
        assert!(matches!(shader.load(None), Err(ShaderError::AlreadyLoaded)));
        assert_eq!(shader.program(), program);
        assert_eq!(rec.live_programs(), 1);

        shader.destroy();
        assert_eq!(shader.state(), ShaderState::Unloaded);
        shader.load(None).unwrap();
        assert!(shader.is_loaded());
        assert_eq!(rec.live_programs(), 1);
    }

    #[test]
    fn test_unknown_uniform_is_not_written() {
        let (rec, gpu) = gpu();
        let shader = Shader::new(&gpu, None).unwrap();
        rec.clear_writes();

        let err = shader.set_float("u_doesNotExist", 1.0).unwrap_err();
        assert!(matches!(err, ShaderError::UnknownUniform(name) if name == "u_doesNotExist"));
        assert!(!shader.set_if_active("u_doesNotExist", 1.0));
        assert!(rec.writes().is_empty());
    }

    #[test]
    fn test_typed_setters_write_values() {
        let (rec, gpu) = gpu();
        let shader = Shader::new(&gpu, None).unwrap();
        let program = shader.program().unwrap();

        shader.set_uint("u_material.texture_diffuse0", 3).unwrap();
        shader.set_float2("u_viewPos", Vec2::new(1.0, 2.0)).unwrap();
        shader
            .set_float4("u_dirLights[0].direction", Vec4::new(0.0, -1.0, 0.0, 0.0))
            .unwrap();
        shader
            .set_mat3("u_transposeInverseOfModel", Mat3::IDENTITY)
            .unwrap();

        assert_eq!(
            rec.last_write(program, "u_material.texture_diffuse0"),
            Some(Recorded::Uint(3))
        );
        assert_eq!(
            rec.last_write(program, "u_dirLights[0].direction")
                .unwrap()
                .floats(),
            &[0.0, -1.0, 0.0, 0.0]
        );
        assert_eq!(
            rec.last_write(program, "u_transposeInverseOfModel")
                .unwrap()
                .floats()
                .len(),
            9
        );
    }

    #[test]
    fn test_drop_deletes_program() {
        let (rec, gpu) = gpu();
        {
            let _shader = Shader::new(&gpu, None).unwrap();
            assert_eq!(rec.live_programs(), 1);
        }
        assert_eq!(rec.live_programs(), 0);
        assert_eq!(rec.deleted_programs(), 1);
    }
}
