//! Mesh management module.
//!
//! This module defines the [`Mesh`] struct for managing mesh data on the GPU side.
//! Vertices should implement the [`Vertex`] trait.

use std::{mem::offset_of, rc::Rc};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::abs::gpu::{Gpu, MeshBuffers, VertexAttrib};

/// Trait that defines the necessary methods for a vertex.
pub trait Vertex: Pod {
    /// Layout of the float attributes inside one vertex.
    fn attributes() -> &'static [VertexAttrib];
}

/// The vertex layout every model mesh uses.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

impl ModelVertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

const MODEL_VERTEX_ATTRIBS: [VertexAttrib; 3] = [
    VertexAttrib {
        location: 0,
        components: 3,
        offset: offset_of!(ModelVertex, position) as i32,
    },
    VertexAttrib {
        location: 1,
        components: 3,
        offset: offset_of!(ModelVertex, normal) as i32,
    },
    VertexAttrib {
        location: 2,
        components: 2,
        offset: offset_of!(ModelVertex, tex_coords) as i32,
    },
];

impl Vertex for ModelVertex {
    fn attributes() -> &'static [VertexAttrib] {
        &MODEL_VERTEX_ATTRIBS
    }
}

/// Represents an indexed triangle mesh stored on the GPU side.
///
/// The vertex and index lists are kept alongside the buffers and never change after upload.
pub struct Mesh<V: Vertex = ModelVertex> {
    gpu: Rc<dyn Gpu>,
    buffers: MeshBuffers,
    vertices: Vec<V>,
    indices: Vec<u32>,
}

impl<V: Vertex> Mesh<V> {
    /// Creates a new mesh from the given vertex and index data.
    pub fn new(gpu: &Rc<dyn Gpu>, vertices: Vec<V>, indices: Vec<u32>) -> Result<Self, String> {
        let buffers = gpu.create_mesh(
            bytemuck::cast_slice(&vertices),
            &indices,
            V::attributes(),
            std::mem::size_of::<V>() as i32,
        )?;

        Ok(Self {
            gpu: Rc::clone(gpu),
            buffers,
            vertices,
            indices,
        })
    }

    /// Draws the mesh.
    pub fn draw(&self) {
        self.gpu.draw_elements(
            self.buffers.vertex_array,
            glow::TRIANGLES,
            self.indices.len() as i32,
        );
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices drawn per call.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

impl<V: Vertex> Drop for Mesh<V> {
    fn drop(&mut self) {
        self.gpu.delete_mesh(self.buffers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::mock::RecordingGpu;

    fn triangle() -> Vec<ModelVertex> {
        vec![
            ModelVertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            ModelVertex::new(Vec3::X, Vec3::Z, Vec2::X),
            ModelVertex::new(Vec3::Y, Vec3::Z, Vec2::Y),
        ]
    }

    #[test]
    fn test_model_vertex_layout() {
        assert_eq!(std::mem::size_of::<ModelVertex>(), 32);
        let attribs = ModelVertex::attributes();
        assert_eq!(
            attribs.iter().map(|a| a.location).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            attribs.iter().map(|a| a.offset).collect::<Vec<_>>(),
            vec![0, 12, 24]
        );
    }

    #[test]
    fn test_draw_uses_index_count() {
        let rec = Rc::new(RecordingGpu::new());
        let gpu: Rc<dyn Gpu> = rec.clone();
        let mesh = Mesh::new(&gpu, triangle(), vec![0, 1, 2]).unwrap();
        mesh.draw();

        let draws = rec.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].1, 3);
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.index_count(), 3);
    }

    #[test]
    fn test_drop_frees_buffers() {
        let rec = Rc::new(RecordingGpu::new());
        let gpu: Rc<dyn Gpu> = rec.clone();
        let mesh = Mesh::new(&gpu, triangle(), vec![0, 1, 2]).unwrap();
        assert_eq!(rec.live_meshes(), 1);
        drop(mesh);
        assert_eq!(rec.live_meshes(), 0);
        assert_eq!(rec.deleted_meshes(), 1);
    }
}
