//! The GPU context seam.
//!
//! Everything above this module talks to the GPU through the [`Gpu`] trait instead of
//! [`glow::HasContext`] directly. The trait is the small slice of OpenGL the renderer actually
//! uses, with safe signatures, so that resources can hold an `Rc<dyn Gpu>` and the registry logic
//! can be exercised without a live context.

use std::num::NonZeroU32;

use glow::HasContext;

use crate::abs::texture::{PixelFormat, TextureImage};

/// Name of a GPU object (shader stage, program, texture, buffer or vertex array).
pub type GpuId = NonZeroU32;

/// Location of a uniform inside a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// The two programmable stages the renderer compiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// File extension appended to a shader base path to find this stage's source.
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => ".vert",
            ShaderStage::Fragment => ".frag",
        }
    }

    /// The matching OpenGL shader type.
    pub fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// A single float vertex attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttrib {
    pub location: u32,
    pub components: i32,
    pub offset: i32,
}

/// The buffers backing one indexed mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex_array: GpuId,
    pub vertex_buffer: GpuId,
    pub index_buffer: GpuId,
}

/// The GPU operations the renderer depends on.
///
/// Uniform writes target the currently bound program, exactly like OpenGL.
pub trait Gpu {
    fn create_shader(&self, stage: ShaderStage) -> Result<GpuId, String>;
    fn shader_source(&self, shader: GpuId, source: &str);
    fn compile_shader(&self, shader: GpuId);
    fn shader_compile_status(&self, shader: GpuId) -> bool;
    fn shader_info_log(&self, shader: GpuId) -> String;
    fn delete_shader(&self, shader: GpuId);

    fn create_program(&self) -> Result<GpuId, String>;
    fn attach_shader(&self, program: GpuId, shader: GpuId);
    fn detach_shader(&self, program: GpuId, shader: GpuId);
    fn link_program(&self, program: GpuId);
    fn program_link_status(&self, program: GpuId) -> bool;
    fn program_info_log(&self, program: GpuId) -> String;
    fn delete_program(&self, program: GpuId);
    fn use_program(&self, program: Option<GpuId>);

    fn uniform_location(&self, program: GpuId, name: &str) -> Option<UniformLocation>;
    fn uniform_1_i32(&self, location: &UniformLocation, x: i32);
    fn uniform_1_u32(&self, location: &UniformLocation, x: u32);
    fn uniform_1_f32(&self, location: &UniformLocation, x: f32);
    fn uniform_2_f32(&self, location: &UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32, w: f32);
    fn uniform_matrix_3_f32_slice(&self, location: &UniformLocation, value: &[f32]);
    fn uniform_matrix_4_f32_slice(&self, location: &UniformLocation, value: &[f32]);

    /// Uploads an image, generates mipmaps and leaves the texture bound to `unit`.
    fn create_texture(&self, image: &TextureImage, unit: u32) -> Result<GpuId, String>;
    fn bind_texture(&self, unit: u32, texture: Option<GpuId>);
    fn delete_texture(&self, texture: GpuId);

    fn create_mesh(
        &self,
        vertices: &[u8],
        indices: &[u32],
        attributes: &[VertexAttrib],
        stride: i32,
    ) -> Result<MeshBuffers, String>;
    fn draw_elements(&self, vertex_array: GpuId, mode: u32, count: i32);
    fn delete_mesh(&self, buffers: MeshBuffers);

    fn enable(&self, capability: u32);
    fn disable(&self, capability: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn polygon_mode(&self, face: u32, mode: u32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
}

#[cfg(not(target_arch = "wasm32"))]
impl Gpu for glow::Context {
    fn create_shader(&self, stage: ShaderStage) -> Result<GpuId, String> {
        unsafe { HasContext::create_shader(self, stage.gl_type()).map(|s| s.0) }
    }

    fn shader_source(&self, shader: GpuId, source: &str) {
        unsafe { HasContext::shader_source(self, glow::NativeShader(shader), source) }
    }

    fn compile_shader(&self, shader: GpuId) {
        unsafe { HasContext::compile_shader(self, glow::NativeShader(shader)) }
    }

    fn shader_compile_status(&self, shader: GpuId) -> bool {
        unsafe { self.get_shader_compile_status(glow::NativeShader(shader)) }
    }

    fn shader_info_log(&self, shader: GpuId) -> String {
        unsafe { self.get_shader_info_log(glow::NativeShader(shader)) }
    }

    fn delete_shader(&self, shader: GpuId) {
        unsafe { HasContext::delete_shader(self, glow::NativeShader(shader)) }
    }

    fn create_program(&self) -> Result<GpuId, String> {
        unsafe { HasContext::create_program(self).map(|p| p.0) }
    }

    fn attach_shader(&self, program: GpuId, shader: GpuId) {
        unsafe {
            HasContext::attach_shader(self, glow::NativeProgram(program), glow::NativeShader(shader))
        }
    }

    fn detach_shader(&self, program: GpuId, shader: GpuId) {
        unsafe {
            HasContext::detach_shader(self, glow::NativeProgram(program), glow::NativeShader(shader))
        }
    }

    fn link_program(&self, program: GpuId) {
        unsafe { HasContext::link_program(self, glow::NativeProgram(program)) }
    }

    fn program_link_status(&self, program: GpuId) -> bool {
        unsafe { self.get_program_link_status(glow::NativeProgram(program)) }
    }

    fn program_info_log(&self, program: GpuId) -> String {
        unsafe { self.get_program_info_log(glow::NativeProgram(program)) }
    }

    fn delete_program(&self, program: GpuId) {
        unsafe { HasContext::delete_program(self, glow::NativeProgram(program)) }
    }

    fn use_program(&self, program: Option<GpuId>) {
        unsafe { HasContext::use_program(self, program.map(glow::NativeProgram)) }
    }

    fn uniform_location(&self, program: GpuId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.get_uniform_location(glow::NativeProgram(program), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn uniform_1_i32(&self, location: &UniformLocation, x: i32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_1_i32(self, Some(&loc), x) }
    }

    fn uniform_1_u32(&self, location: &UniformLocation, x: u32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_1_u32(self, Some(&loc), x) }
    }

    fn uniform_1_f32(&self, location: &UniformLocation, x: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_1_f32(self, Some(&loc), x) }
    }

    fn uniform_2_f32(&self, location: &UniformLocation, x: f32, y: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_2_f32(self, Some(&loc), x, y) }
    }

    fn uniform_3_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_3_f32(self, Some(&loc), x, y, z) }
    }

    fn uniform_4_f32(&self, location: &UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_4_f32(self, Some(&loc), x, y, z, w) }
    }

    fn uniform_matrix_3_f32_slice(&self, location: &UniformLocation, value: &[f32]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_matrix_3_f32_slice(self, Some(&loc), false, value) }
    }

    fn uniform_matrix_4_f32_slice(&self, location: &UniformLocation, value: &[f32]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, Some(&loc), false, value) }
    }

    fn create_texture(&self, image: &TextureImage, unit: u32) -> Result<GpuId, String> {
        let format = match image.format {
            PixelFormat::Red => glow::RED,
            PixelFormat::Rgb => glow::RGB,
            PixelFormat::Rgba => glow::RGBA,
        };
        unsafe {
            let texture = HasContext::create_texture(self)?;
            self.active_texture(glow::TEXTURE0 + unit);
            HasContext::bind_texture(self, glow::TEXTURE_2D, Some(texture));
            // Rows of 1 and 3 channel images are not 4-byte aligned.
            self.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format as i32,
                image.width as i32,
                image.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(image.data.as_slice())),
            );
            self.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            self.generate_mipmap(glow::TEXTURE_2D);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            self.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            Ok(texture.0)
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<GpuId>) {
        unsafe {
            self.active_texture(glow::TEXTURE0 + unit);
            HasContext::bind_texture(self, glow::TEXTURE_2D, texture.map(glow::NativeTexture));
        }
    }

    fn delete_texture(&self, texture: GpuId) {
        unsafe { HasContext::delete_texture(self, glow::NativeTexture(texture)) }
    }

    fn create_mesh(
        &self,
        vertices: &[u8],
        indices: &[u32],
        attributes: &[VertexAttrib],
        stride: i32,
    ) -> Result<MeshBuffers, String> {
        unsafe {
            let vao = self.create_vertex_array()?;
            let vbo = self.create_buffer()?;
            let ebo = self.create_buffer()?;

            self.bind_vertex_array(Some(vao));
            self.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.buffer_data_u8_slice(glow::ARRAY_BUFFER, vertices, glow::STATIC_DRAW);

            self.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            self.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::STATIC_DRAW,
            );

            for attrib in attributes {
                self.enable_vertex_attrib_array(attrib.location);
                self.vertex_attrib_pointer_f32(
                    attrib.location,
                    attrib.components,
                    glow::FLOAT,
                    false,
                    stride,
                    attrib.offset,
                );
            }

            self.bind_vertex_array(None);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
            self.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            Ok(MeshBuffers {
                vertex_array: vao.0,
                vertex_buffer: vbo.0,
                index_buffer: ebo.0,
            })
        }
    }

    fn draw_elements(&self, vertex_array: GpuId, mode: u32, count: i32) {
        unsafe {
            self.bind_vertex_array(Some(glow::NativeVertexArray(vertex_array)));
            HasContext::draw_elements(self, mode, count, glow::UNSIGNED_INT, 0);
            self.bind_vertex_array(None);
        }
    }

    fn delete_mesh(&self, buffers: MeshBuffers) {
        unsafe {
            self.delete_buffer(glow::NativeBuffer(buffers.vertex_buffer));
            self.delete_buffer(glow::NativeBuffer(buffers.index_buffer));
            self.delete_vertex_array(glow::NativeVertexArray(buffers.vertex_array));
        }
    }

    fn enable(&self, capability: u32) {
        unsafe { HasContext::enable(self, capability) }
    }

    fn disable(&self, capability: u32) {
        unsafe { HasContext::disable(self, capability) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }

    fn polygon_mode(&self, face: u32, mode: u32) {
        unsafe { HasContext::polygon_mode(self, face, mode) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }
}
