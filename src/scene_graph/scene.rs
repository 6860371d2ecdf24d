use glam::{Mat4, Vec3};
use id_arena::Arena;

use crate::geometry::{Geometry, GeometryId};
use crate::material::{Material, MaterialId};
use crate::math::Aabb;
use crate::scene_graph::light::Light;
use crate::scene_graph::object3d::{Object3D, ObjectId, ObjectKind};
use crate::scene_graph::transform::Transform;
use crate::texture::{Texture, TextureId};

/// Counts of resources released by [`Scene::dispose_resources`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub geometries: Arena<Geometry>,
    pub materials: Arena<Material>,
    pub textures: Arena<Texture>,
    root: ObjectId,
}

impl Scene {
    pub fn new() -> Self {
        let mut objects = Arena::new();
        let root = objects.alloc(Object3D::group("Scene"));

        Self {
            objects,
            geometries: Arena::new(),
            materials: Arena::new(),
            textures: Arena::new(),
            root,
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Allocates an object without attaching it to the scene root.
    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    /// Allocates an object as a child of the scene root.
    pub fn add(&mut self, object: Object3D) -> ObjectId {
        self.add_child(self.root, object)
    }

    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent));
        object_id
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.alloc(geometry)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.alloc(material)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.alloc(texture)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.get_mut(id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Depth-first, parent before children, starting at (and including) `id`.
    pub fn traverse(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut visited = Vec::new();
        let mut stack = vec![id];

        while let Some(object_id) = stack.pop() {
            if let Some(object) = self.objects.get(object_id) {
                visited.push(object_id);
                stack.extend(object.child_ids.iter().rev().copied());
            }
        }

        visited
    }

    /// Updates all object transforms in hierarchical order
    pub fn update_transforms(&self) {
        let root_objects = self.objects.iter().filter_map(|(id, object)| {
            if object.parent_id.is_none() {
                Some(id)
            } else {
                None
            }
        });

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn detach(&mut self, object_id: ObjectId) {
        self.set_object_parent(object_id, None);
    }

    /// Detaches every child of `group` and disposes the geometries and
    /// materials their subtrees reference. Returns how many children went.
    pub fn clear_children(&mut self, group: ObjectId) -> usize {
        let child_ids = match self.objects.get(group) {
            Some(object) => object.child_ids.clone(),
            None => return 0,
        };

        for &child_id in &child_ids {
            self.dispose_subtree(child_id);
            self.detach(child_id);
        }

        child_ids.len()
    }

    fn dispose_subtree(&mut self, object_id: ObjectId) {
        for id in self.traverse(object_id) {
            let Some((geometry, material)) = self.objects.get(id).and_then(Object3D::drawable)
            else {
                continue;
            };

            if let Some(geometry) = self.geometries.get_mut(geometry) {
                geometry.dispose();
            }
            if let Some(material) = self.materials.get_mut(material) {
                material.dispose();
            }
        }
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_rotation_euler(&mut self, object_id: ObjectId, angles: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation_euler(angles);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_scale(&mut self, object_id: ObjectId, scale: f32) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_uniform_scale(scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    /// World-space box around every drawable in the subtree, built from each
    /// geometry's local box transformed by its world matrix.
    pub fn world_bounds(&self, object_id: ObjectId) -> Option<Aabb> {
        self.update_transforms();

        let mut bounds: Option<Aabb> = None;

        for id in self.traverse(object_id) {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            let Some(local) = object
                .drawable()
                .and_then(|(geometry, _)| self.geometries.get(geometry))
                .and_then(Geometry::bounding_box)
            else {
                continue;
            };

            let world = local.transform(&object.transform.get_world_matrix());
            bounds = Some(match bounds {
                Some(bounds) => bounds.union(&world),
                None => world,
            });
        }

        bounds
    }

    /// Visible drawables reachable from the root, in draw order.
    pub fn visible_drawables(&self) -> Vec<ObjectId> {
        self.visible_from_root()
            .into_iter()
            .filter(|&id| {
                self.objects
                    .get(id)
                    .is_some_and(|object| object.drawable().is_some())
            })
            .collect()
    }

    /// Lights reachable from the root with their world positions.
    pub fn visible_lights(&self) -> Vec<(Light, Vec3)> {
        self.visible_from_root()
            .into_iter()
            .filter_map(|id| {
                let object = self.objects.get(id)?;
                match object.kind {
                    ObjectKind::Light(light) => Some((
                        light,
                        object.transform.get_world_matrix().w_axis.truncate(),
                    )),
                    _ => None,
                }
            })
            .collect()
    }

    fn visible_from_root(&self) -> Vec<ObjectId> {
        let mut visited = Vec::new();
        let mut stack = vec![self.root];

        while let Some(object_id) = stack.pop() {
            let Some(object) = self.objects.get(object_id) else {
                continue;
            };
            if !object.visible {
                continue;
            }

            visited.push(object_id);
            stack.extend(object.child_ids.iter().rev().copied());
        }

        visited
    }

    /// Disposes every geometry, material and texture the scene allocated.
    /// Already-disposed resources are not counted again.
    pub fn dispose_resources(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();

        for (_, geometry) in self.geometries.iter_mut() {
            if !geometry.is_disposed() {
                geometry.dispose();
                report.geometries += 1;
            }
        }

        for (_, material) in self.materials.iter_mut() {
            if !material.is_disposed() {
                material.dispose();
                report.materials += 1;
            }
        }

        for (_, texture) in self.textures.iter_mut() {
            if !texture.is_disposed() {
                texture.dispose();
                report.textures += 1;
            }
        }

        report
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, StandardMaterial};

    fn unit_cube_mesh(scene: &mut Scene, name: &str) -> Object3D {
        let geometry = scene.add_geometry(Geometry::new(vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
        ]));
        let material = scene.add_material(Material::standard(StandardMaterial::default()));
        Object3D::mesh(name, geometry, material)
    }

    #[test]
    fn test_world_bounds_follow_parent_transform() {
        let mut scene = Scene::new();
        let group = scene.add(Object3D::group("group"));
        let mesh = unit_cube_mesh(&mut scene, "cube");
        scene.add_child(group, mesh);

        scene.set_object_translation(group, Vec3::new(10.0, 0.0, 0.0));
        scene.set_object_scale(group, 2.0);

        let bounds = scene.world_bounds(group).unwrap();
        assert!((bounds.center() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!((bounds.size() - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_clear_children_disposes_subtree() {
        let mut scene = Scene::new();
        let group = scene.add(Object3D::group("placeholder"));
        let mesh = unit_cube_mesh(&mut scene, "cube");
        let mesh_id = scene.add_child(group, mesh);

        assert_eq!(scene.clear_children(group), 1);
        assert!(scene.get_object(group).unwrap().child_ids.is_empty());
        assert!(scene.get_object(mesh_id).unwrap().parent_id.is_none());

        let (geometry, material) = scene.get_object(mesh_id).unwrap().drawable().unwrap();
        assert!(scene.geometry(geometry).unwrap().is_disposed());
        assert!(scene.material(material).unwrap().is_disposed());
        assert!(scene.visible_drawables().is_empty());
    }

    #[test]
    fn test_dispose_resources_counts_once() {
        let mut scene = Scene::new();
        let mesh = unit_cube_mesh(&mut scene, "cube");
        scene.add(mesh);

        let first = scene.dispose_resources();
        assert_eq!(first.geometries, 1);
        assert_eq!(first.materials, 1);
        assert_eq!(scene.dispose_resources(), DisposeReport::default());
    }

    #[test]
    fn test_hidden_subtree_is_not_drawn() {
        let mut scene = Scene::new();
        let group = scene.add(Object3D::group("group"));
        let mesh = unit_cube_mesh(&mut scene, "cube");
        scene.add_child(group, mesh);

        assert_eq!(scene.visible_drawables().len(), 1);
        scene.get_object_mut(group).unwrap().visible = false;
        assert!(scene.visible_drawables().is_empty());
    }
}
