//! Mesh import.
//!
//! A [`MeshImporter`] turns a model file into an [`ImportedScene`]: a node tree referring to
//! meshes by index, plus per-material texture references. [`GltfImporter`] reads `.gltf` / `.glb`
//! files with the `gltf` crate.

use std::path::Path;

use crate::errors::ImportError;

/// A node of the imported hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedNode {
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

/// Raw geometry of one mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    /// Index into [`ImportedScene::materials`].
    pub material: Option<usize>,
}

/// Texture references of a material, relative to the model file's directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub diffuse: Vec<String>,
    pub specular: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
    pub root: ImportedNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}

/// Reads a model file into an [`ImportedScene`].
pub trait MeshImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError>;
}

/// Imports glTF 2.0 files.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfImporter;

impl GltfImporter {
    fn image_uri(texture: gltf::Texture<'_>) -> Option<String> {
        match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                Some(uri.to_string())
            }
            _ => {
                log::warn!(
                    "Skipping embedded image {} of texture {}",
                    texture.source().index(),
                    texture.index()
                );
                None
            }
        }
    }

    fn material(material: gltf::Material<'_>) -> ImportedMaterial {
        let diffuse = material
            .pbr_metallic_roughness()
            .base_color_texture()
            .and_then(|info| Self::image_uri(info.texture()));
        let specular = material
            .specular()
            .and_then(|specular| specular.specular_color_texture())
            .and_then(|info| Self::image_uri(info.texture()));
        ImportedMaterial {
            diffuse: diffuse.into_iter().collect(),
            specular: specular.into_iter().collect(),
        }
    }

    fn primitive(
        primitive: &gltf::Primitive<'_>,
        buffers: &[gltf::buffer::Data],
        mesh: usize,
    ) -> Result<ImportedMesh, ImportError> {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or(ImportError::MissingPositions { mesh })?
            .collect();
        let normals = reader.read_normals().map(|normals| normals.collect());
        let tex_coords = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().collect());
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        Ok(ImportedMesh {
            positions,
            normals,
            tex_coords,
            indices,
            material: primitive.material().index(),
        })
    }

    fn node(node: gltf::Node<'_>, mesh_map: &[Vec<usize>]) -> ImportedNode {
        ImportedNode {
            meshes: node
                .mesh()
                .and_then(|mesh| mesh_map.get(mesh.index()))
                .cloned()
                .unwrap_or_default(),
            children: node
                .children()
                .map(|child| Self::node(child, mesh_map))
                .collect(),
        }
    }
}

impl MeshImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError> {
        let gltf_error = |source| ImportError::Gltf {
            path: path.to_path_buf(),
            source,
        };
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(gltf_error)?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob).map_err(gltf_error)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| ImportError::NoScene(path.to_path_buf()))?;

        // Every triangle primitive becomes its own mesh; `mesh_map` maps a glTF mesh to them.
        let mut meshes = Vec::new();
        let mut mesh_map = Vec::new();
        for mesh in document.meshes() {
            let mut imported = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping {:?} primitive {} of mesh {}",
                        primitive.mode(),
                        primitive.index(),
                        mesh.index()
                    );
                    continue;
                }
                imported.push(meshes.len());
                meshes.push(Self::primitive(&primitive, &buffers, mesh.index())?);
            }
            mesh_map.push(imported);
        }

        let materials = document.materials().map(Self::material).collect();
        let root = ImportedNode {
            meshes: Vec::new(),
            children: scene
                .nodes()
                .map(|node| Self::node(node, &mesh_map))
                .collect(),
        };

        log::info!(
            "Imported {}: {} meshes, {} materials",
            path.display(),
            meshes.len(),
            document.materials().len()
        );

        Ok(ImportedScene {
            root,
            meshes,
            materials,
        })
    }
}

/// Returns the same scene for every path.
#[cfg(test)]
pub(crate) struct StaticImporter(pub ImportedScene);

#[cfg(test)]
impl MeshImporter for StaticImporter {
    fn import(&self, _path: &Path) -> Result<ImportedScene, ImportError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::mock::scratch_dir;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_materials_specular"],
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "mesh": 0, "children": [1] },
            { "mesh": 0 }
        ],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
            "extensions": {
                "KHR_materials_specular": { "specularColorTexture": { "index": 1 } }
            }
        }],
        "textures": [{ "source": 0 }, { "source": 1 }],
        "images": [{ "uri": "diffuse.png" }, { "uri": "specular.png" }],
        "buffers": [{ "uri": "triangle.bin", "byteLength": 42 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    fn write_triangle(dir: &Path) -> std::path::PathBuf {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let mut bin = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        std::fs::write(dir.join("triangle.bin"), bin).unwrap();
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();
        path
    }

    #[test]
    fn test_gltf_scene_is_imported() {
        let dir = scratch_dir("import-gltf");
        let path = write_triangle(&dir);
        let scene = GltfImporter.import(&path).unwrap();

        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.normals.is_none());
        assert!(mesh.tex_coords.is_none());
        assert_eq!(mesh.material, Some(0));

        assert_eq!(
            scene.materials[0],
            ImportedMaterial {
                diffuse: vec!["diffuse.png".to_string()],
                specular: vec!["specular.png".to_string()],
            }
        );

        // Root holds the scene's nodes; the second node is a child of the first.
        assert_eq!(scene.root.children.len(), 1);
        assert_eq!(scene.root.children[0].meshes, vec![0]);
        assert_eq!(scene.root.children[0].children[0].meshes, vec![0]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = GltfImporter
            .import(Path::new("/no/such/model.gltf"))
            .unwrap_err();
        assert!(matches!(err, ImportError::Gltf { .. }));
    }
}
