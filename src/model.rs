use glam::{Quat, Vec3, Vec4};
use gltf::buffer;
use itertools::Itertools;

use crate::error::AssetError;
use crate::geometry::Geometry;
use crate::material::{Material, StandardMaterial};
use crate::scene_graph::{Object3D, ObjectId, Scene};

/// Plain-data description of a loaded model. It is built off the render
/// thread and only turned into scene objects by [`spawn_model`].
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub roots: Vec<NodeData>,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub primitives: Vec<PrimitiveData>,
    pub children: Vec<NodeData>,
}

#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Option<Vec<u32>>,
    pub material: MaterialData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    pub emissive_strength: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            metallic: 1.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            emissive_strength: 1.0,
        }
    }
}

impl PrimitiveData {
    /// Index of the first entry that points past the positions, if any.
    pub fn first_invalid_index(&self) -> Option<u32> {
        let vertex_count = self.positions.len();
        self.indices
            .as_ref()?
            .iter()
            .copied()
            .find(|&index| index as usize >= vertex_count)
    }
}

impl NodeData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            primitives: Vec::new(),
            children: Vec::new(),
        }
    }

    fn drop_invalid(&mut self) -> usize {
        let before = self.primitives.len();
        self.primitives
            .retain(|primitive| primitive.first_invalid_index().is_none());

        before - self.primitives.len()
            + self
                .children
                .iter_mut()
                .map(NodeData::drop_invalid)
                .sum::<usize>()
    }

    fn primitive_count(&self) -> usize {
        self.primitives.len()
            + self
                .children
                .iter()
                .map(NodeData::primitive_count)
                .sum::<usize>()
    }
}

pub type Buffers<'a> = &'a [buffer::Data];

impl ModelData {
    /// Parses a binary glTF (or a glTF with embedded buffers).
    pub fn from_glb(name: impl Into<String>, bytes: &[u8]) -> Result<ModelData, AssetError> {
        let name = name.into();
        let (document, buffers, _images) = gltf::import_slice(bytes)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetError::Empty(name.clone()))?;

        let model = ModelData {
            roots: scene
                .nodes()
                .map(|node| read_node(&node, &buffers))
                .collect(),
            name,
        };

        if model.primitive_count() == 0 {
            return Err(AssetError::Empty(model.name));
        }

        Ok(model)
    }

    pub fn primitive_count(&self) -> usize {
        self.roots.iter().map(NodeData::primitive_count).sum()
    }

    /// Drops primitives whose indices point past their positions. Fails if
    /// nothing drawable is left.
    pub fn into_renderable(mut self) -> Result<ModelData, AssetError> {
        let dropped: usize = self.roots.iter_mut().map(NodeData::drop_invalid).sum();
        if dropped > 0 {
            log::warn!(
                "Dropped {} primitives of {} with out of range indices",
                dropped,
                self.name
            );
        }

        if self.primitive_count() == 0 {
            return Err(AssetError::Empty(self.name));
        }

        Ok(self)
    }
}

fn read_node(node: &gltf::Node, buffers: Buffers) -> NodeData {
    let (translation, rotation, scale) = node.transform().decomposed();

    let primitives = node
        .mesh()
        .map(|mesh| read_primitives(&mesh, buffers))
        .unwrap_or_default();

    NodeData {
        name: node.name().unwrap_or("Unnamed").to_string(),
        translation: translation.into(),
        rotation: Quat::from_array(rotation),
        scale: scale.into(),
        primitives,
        children: node
            .children()
            .map(|child| read_node(&child, buffers))
            .collect(),
    }
}

fn read_primitives(mesh: &gltf::Mesh, buffers: Buffers) -> Vec<PrimitiveData> {
    let mesh_name = mesh.name().unwrap_or("Unnamed mesh");
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of {}: unsupported mode {:?}",
                primitive.index(),
                mesh_name,
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let Some(position_reader) = reader.read_positions() else {
            log::warn!(
                "Skipping primitive {} of {}: no positions",
                primitive.index(),
                mesh_name
            );
            continue;
        };
        let positions = position_reader.map(Vec3::from).collect_vec();

        let normals = reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect_vec())
            .filter(|normals| normals.len() == positions.len());

        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect_vec());

        let data = PrimitiveData {
            positions,
            normals,
            indices,
            material: read_material(&primitive.material()),
        };

        if let Some(index) = data.first_invalid_index() {
            log::warn!(
                "Skipping primitive {} of {}: index {} out of range for {} vertices",
                primitive.index(),
                mesh_name,
                index,
                data.positions.len()
            );
            continue;
        }

        primitives.push(data);
    }

    primitives
}

fn read_material(material: &gltf::Material) -> MaterialData {
    let pbr = material.pbr_metallic_roughness();

    MaterialData {
        base_color: Vec4::from(pbr.base_color_factor()),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: Vec3::from(material.emissive_factor()),
        emissive_strength: material.emissive_strength().unwrap_or(1.0),
    }
}

/// Builds scene objects for `model` under a new group that is not attached
/// to any parent yet. Every glTF material becomes a standard material with an
/// emissive channel, as glTF materials always carry one.
pub fn spawn_model(scene: &mut Scene, model: &ModelData) -> ObjectId {
    let group = scene.add_object(Object3D::group(model.name.clone()));

    for node in &model.roots {
        spawn_node(scene, node, group);
    }

    group
}

fn spawn_node(scene: &mut Scene, node: &NodeData, parent: ObjectId) -> ObjectId {
    let mut object = Object3D::group(node.name.clone());
    object
        .transform
        .set_transform(node.translation, node.rotation, node.scale);
    let object_id = scene.add_child(parent, object);

    for (index, primitive) in node.primitives.iter().enumerate() {
        if let Some(invalid) = primitive.first_invalid_index() {
            log::warn!(
                "Not spawning primitive {} of {}: index {} out of range",
                index,
                node.name,
                invalid
            );
            continue;
        }

        let mut geometry = Geometry::new(primitive.positions.clone());
        if let Some(indices) = &primitive.indices {
            geometry = geometry.with_indices(indices.clone());
        }
        match &primitive.normals {
            Some(normals) if normals.len() == primitive.positions.len() => {
                geometry = geometry.with_normals(normals.clone())
            }
            _ => geometry.compute_vertex_normals(),
        }

        let material = &primitive.material;
        let material = Material::standard(StandardMaterial {
            color: material.base_color.truncate(),
            metalness: material.metallic,
            roughness: material.roughness,
            emissive: Some(material.emissive),
            emissive_intensity: material.emissive_strength,
        });

        let geometry_id = scene.add_geometry(geometry);
        let material_id = scene.add_material(material);
        scene.add_child(
            object_id,
            Object3D::mesh(
                format!("{} (primitive {})", node.name, index),
                geometry_id,
                material_id,
            ),
        );
    }

    for child in &node.children {
        spawn_node(scene, child, object_id);
    }

    object_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_node(name: &str, offset: Vec3) -> NodeData {
        let mut node = NodeData::new(name);
        node.primitives.push(PrimitiveData {
            positions: vec![offset, offset + Vec3::X, offset + Vec3::Y],
            normals: None,
            indices: None,
            material: MaterialData::default(),
        });
        node
    }

    #[test]
    fn test_spawn_model_builds_detached_hierarchy() {
        let mut parent = triangle_node("body", Vec3::ZERO);
        parent.children.push(triangle_node("head", Vec3::Y));
        let model = ModelData {
            name: "robot".into(),
            roots: vec![parent],
        };

        let mut scene = Scene::new();
        let group = spawn_model(&mut scene, &model);

        assert!(scene.get_object(group).unwrap().parent_id.is_none());
        assert_eq!(model.primitive_count(), 2);

        let meshes = scene
            .traverse(group)
            .into_iter()
            .filter(|&id| scene.get_object(id).unwrap().drawable().is_some())
            .count();
        assert_eq!(meshes, 2);
        assert!(scene.visible_drawables().is_empty());
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let model = ModelData {
            name: "triangle".into(),
            roots: vec![triangle_node("tri", Vec3::ZERO)],
        };

        let mut scene = Scene::new();
        let group = spawn_model(&mut scene, &model);
        let mesh = scene
            .traverse(group)
            .into_iter()
            .find_map(|id| scene.get_object(id).unwrap().drawable())
            .unwrap();

        let normals = scene.geometry(mesh.0).unwrap().normals();
        assert!((normals[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_out_of_range_indices_are_not_spawned() {
        let mut node = triangle_node("broken", Vec3::ZERO);
        node.primitives[0].indices = Some(vec![0, 1, 7]);
        assert_eq!(node.primitives[0].first_invalid_index(), Some(7));

        let model = ModelData {
            name: "broken".into(),
            roots: vec![node],
        };

        let mut scene = Scene::new();
        let group = spawn_model(&mut scene, &model);
        let meshes = scene
            .traverse(group)
            .into_iter()
            .filter(|&id| scene.get_object(id).unwrap().drawable().is_some())
            .count();
        assert_eq!(meshes, 0);
    }

    #[test]
    fn test_garbage_bytes_fail_to_parse() {
        let result = ModelData::from_glb("broken.glb", b"definitely not a glb");
        assert!(matches!(result, Err(AssetError::Parse(_))));
    }
}
