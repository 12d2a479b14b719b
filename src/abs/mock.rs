//! An in-memory [`Gpu`] used by the unit tests.
//!
//! Compiling a stage whose source contains `#error` fails. A uniform name resolves to a location
//! when its root identifier (the part before any `[` or `.`) occurs in one of the linked sources.
//! Every uniform write is recorded against the program that was bound at the time.

use std::{
    cell::RefCell,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use image::{ImageBuffer, Rgb};

use crate::abs::{
    gpu::{Gpu, GpuId, MeshBuffers, ShaderStage, UniformLocation, VertexAttrib},
    texture::TextureImage,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Int(i32),
    Uint(u32),
    Floats(Vec<f32>),
}

impl Recorded {
    pub fn floats(&self) -> &[f32] {
        match self {
            Recorded::Floats(values) => values,
            other => panic!("expected floats, got {other:?}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UniformWrite {
    pub program: GpuId,
    pub name: String,
    pub value: Recorded,
}

#[derive(Default)]
struct State {
    next_id: u32,
    stages: Vec<(GpuId, String, bool)>,
    programs: Vec<(GpuId, Vec<GpuId>, Option<String>)>,
    locations: Vec<(GpuId, String)>,
    bound_program: Option<GpuId>,
    writes: Vec<UniformWrite>,
    textures: Vec<(GpuId, u32, u32)>,
    meshes: Vec<MeshBuffers>,
    draws: Vec<(GpuId, i32)>,
    enabled: Vec<u32>,
    clear_colour: Option<[f32; 4]>,
    clears: usize,
    polygon_mode: Option<u32>,
    viewport: Option<[i32; 4]>,
    deleted_programs: usize,
    deleted_textures: usize,
    deleted_meshes: usize,
}

/// Recording stand-in for a GL context.
#[derive(Default)]
pub struct RecordingGpu {
    pub fail_link: bool,
    pub fail_all_compiles: bool,
    state: RefCell<State>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage fails to compile, the built-in sources included.
    pub fn failing_compiles() -> Self {
        Self {
            fail_all_compiles: true,
            ..Self::default()
        }
    }

    /// Every program fails to link.
    pub fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    fn next_id(&self) -> GpuId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        NonZeroU32::new(state.next_id).expect("ids start at one")
    }

    pub fn writes(&self) -> Vec<UniformWrite> {
        self.state.borrow().writes.clone()
    }

    pub fn writes_named(&self, name: &str) -> Vec<UniformWrite> {
        self.writes().into_iter().filter(|w| w.name == name).collect()
    }

    pub fn last_write(&self, program: GpuId, name: &str) -> Option<Recorded> {
        self.writes()
            .into_iter()
            .rev()
            .find(|w| w.program == program && w.name == name)
            .map(|w| w.value)
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    pub fn texture_uploads(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_meshes(&self) -> usize {
        self.state.borrow().meshes.len()
    }

    pub fn draws(&self) -> Vec<(GpuId, i32)> {
        self.state.borrow().draws.clone()
    }

    pub fn is_enabled(&self, capability: u32) -> bool {
        self.state.borrow().enabled.contains(&capability)
    }

    pub fn clear_colour(&self) -> Option<[f32; 4]> {
        self.state.borrow().clear_colour
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn polygon_mode_set(&self) -> Option<u32> {
        self.state.borrow().polygon_mode
    }

    pub fn viewport_set(&self) -> Option<[i32; 4]> {
        self.state.borrow().viewport
    }

    pub fn deleted_programs(&self) -> usize {
        self.state.borrow().deleted_programs
    }

    pub fn deleted_textures(&self) -> usize {
        self.state.borrow().deleted_textures
    }

    pub fn deleted_meshes(&self) -> usize {
        self.state.borrow().deleted_meshes
    }

    fn record(&self, location: &UniformLocation, value: Recorded) {
        let mut state = self.state.borrow_mut();
        let (program, name) = state.locations[location.0 as usize].clone();
        assert_eq!(
            state.bound_program,
            Some(program),
            "uniform `{name}` written while another program was bound"
        );
        state.writes.push(UniformWrite {
            program,
            name,
            value,
        });
    }
}

fn uniform_root(name: &str) -> &str {
    name.split(['[', '.']).next().unwrap_or(name)
}

impl Gpu for RecordingGpu {
    fn create_shader(&self, _stage: ShaderStage) -> Result<GpuId, String> {
        let id = self.next_id();
        self.state.borrow_mut().stages.push((id, String::new(), false));
        Ok(id)
    }

    fn shader_source(&self, shader: GpuId, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(stage) = state.stages.iter_mut().find(|s| s.0 == shader) {
            stage.1 = source.to_string();
        }
    }

    fn compile_shader(&self, shader: GpuId) {
        let fail_all = self.fail_all_compiles;
        let mut state = self.state.borrow_mut();
        if let Some(stage) = state.stages.iter_mut().find(|s| s.0 == shader) {
            stage.2 = !fail_all && !stage.1.contains("#error");
        }
    }

    fn shader_compile_status(&self, shader: GpuId) -> bool {
        self.state
            .borrow()
            .stages
            .iter()
            .any(|s| s.0 == shader && s.2)
    }

    fn shader_info_log(&self, _shader: GpuId) -> String {
        "0:1(1): error: #error directive".to_string()
    }

    fn delete_shader(&self, shader: GpuId) {
        self.state.borrow_mut().stages.retain(|s| s.0 != shader);
    }

    fn create_program(&self) -> Result<GpuId, String> {
        let id = self.next_id();
        self.state.borrow_mut().programs.push((id, Vec::new(), None));
        Ok(id)
    }

    fn attach_shader(&self, program: GpuId, shader: GpuId) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.iter_mut().find(|p| p.0 == program) {
            p.1.push(shader);
        }
    }

    fn detach_shader(&self, program: GpuId, shader: GpuId) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.iter_mut().find(|p| p.0 == program) {
            p.1.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: GpuId) {
        if self.fail_link {
            return;
        }
        let mut state = self.state.borrow_mut();
        let attached = state
            .programs
            .iter()
            .find(|p| p.0 == program)
            .map(|p| p.1.clone())
            .unwrap_or_default();
        let source = state
            .stages
            .iter()
            .filter(|s| attached.contains(&s.0))
            .map(|s| s.1.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(p) = state.programs.iter_mut().find(|p| p.0 == program) {
            p.2 = Some(source);
        }
    }

    fn program_link_status(&self, program: GpuId) -> bool {
        self.state
            .borrow()
            .programs
            .iter()
            .any(|p| p.0 == program && p.2.is_some())
    }

    fn program_info_log(&self, _program: GpuId) -> String {
        "error: linking failed".to_string()
    }

    fn delete_program(&self, program: GpuId) {
        let mut state = self.state.borrow_mut();
        state.programs.retain(|p| p.0 != program);
        state.deleted_programs += 1;
        if state.bound_program == Some(program) {
            state.bound_program = None;
        }
    }

    fn use_program(&self, program: Option<GpuId>) {
        self.state.borrow_mut().bound_program = program;
    }

    fn uniform_location(&self, program: GpuId, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        let source = state
            .programs
            .iter()
            .find(|p| p.0 == program)
            .and_then(|p| p.2.clone())?;
        let root = uniform_root(name);
        let known = source
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .any(|word| word == root);
        if !known {
            return None;
        }
        if let Some(index) = state
            .locations
            .iter()
            .position(|(p, n)| *p == program && n == name)
        {
            return Some(UniformLocation(index as u32));
        }
        state.locations.push((program, name.to_string()));
        Some(UniformLocation(state.locations.len() as u32 - 1))
    }

    fn uniform_1_i32(&self, location: &UniformLocation, x: i32) {
        self.record(location, Recorded::Int(x));
    }

    fn uniform_1_u32(&self, location: &UniformLocation, x: u32) {
        self.record(location, Recorded::Uint(x));
    }

    fn uniform_1_f32(&self, location: &UniformLocation, x: f32) {
        self.record(location, Recorded::Floats(vec![x]));
    }

    fn uniform_2_f32(&self, location: &UniformLocation, x: f32, y: f32) {
        self.record(location, Recorded::Floats(vec![x, y]));
    }

    fn uniform_3_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32) {
        self.record(location, Recorded::Floats(vec![x, y, z]));
    }

    fn uniform_4_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        self.record(location, Recorded::Floats(vec![x, y, z, w]));
    }

    fn uniform_matrix_3_f32_slice(&self, location: &UniformLocation, value: &[f32]) {
        self.record(location, Recorded::Floats(value.to_vec()));
    }

    fn uniform_matrix_4_f32_slice(&self, location: &UniformLocation, value: &[f32]) {
        self.record(location, Recorded::Floats(value.to_vec()));
    }

    fn create_texture(&self, image: &TextureImage, unit: u32) -> Result<GpuId, String> {
        let id = self.next_id();
        self.state.borrow_mut().textures.push((id, unit, image.width));
        Ok(id)
    }

    fn bind_texture(&self, _unit: u32, _texture: Option<GpuId>) {}

    fn delete_texture(&self, texture: GpuId) {
        let mut state = self.state.borrow_mut();
        state.textures.retain(|t| t.0 != texture);
        state.deleted_textures += 1;
    }

    fn create_mesh(
        &self,
        _vertices: &[u8],
        _indices: &[u32],
        _attributes: &[VertexAttrib],
        _stride: i32,
    ) -> Result<MeshBuffers, String> {
        let buffers = MeshBuffers {
            vertex_array: self.next_id(),
            vertex_buffer: self.next_id(),
            index_buffer: self.next_id(),
        };
        self.state.borrow_mut().meshes.push(buffers);
        Ok(buffers)
    }

    fn draw_elements(&self, vertex_array: GpuId, _mode: u32, count: i32) {
        self.state.borrow_mut().draws.push((vertex_array, count));
    }

    fn delete_mesh(&self, buffers: MeshBuffers) {
        let mut state = self.state.borrow_mut();
        state.meshes.retain(|m| *m != buffers);
        state.deleted_meshes += 1;
    }

    fn enable(&self, capability: u32) {
        let mut state = self.state.borrow_mut();
        if !state.enabled.contains(&capability) {
            state.enabled.push(capability);
        }
    }

    fn disable(&self, capability: u32) {
        self.state.borrow_mut().enabled.retain(|c| *c != capability);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().clear_colour = Some([r, g, b, a]);
    }

    fn clear(&self, _mask: u32) {
        self.state.borrow_mut().clears += 1;
    }

    fn polygon_mode(&self, _face: u32, mode: u32) {
        self.state.borrow_mut().polygon_mode = Some(mode);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().viewport = Some([x, y, width, height]);
    }
}

/// Creates a fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("srender-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a small 3 component PNG.
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let image: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([200, 10, 10]));
    image.save(&path).unwrap();
    path
}
