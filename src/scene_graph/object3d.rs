use glam::Vec3;
use id_arena::Id;

use crate::geometry::GeometryId;
use crate::material::MaterialId;
use crate::scene_graph::light::Light;
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Group,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
    Points {
        geometry: GeometryId,
        material: MaterialId,
    },
    Light(Light),
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub kind: ObjectKind,
    pub visible: bool,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn mesh(name: impl Into<String>, geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Mesh { geometry, material },
            ..Default::default()
        }
    }

    pub fn points(name: impl Into<String>, geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Points { geometry, material },
            ..Default::default()
        }
    }

    pub fn light(name: impl Into<String>, light: Light, position: Vec3) -> Self {
        Self {
            name: name.into(),
            transform: Transform::from_translation(position),
            kind: ObjectKind::Light(light),
            ..Default::default()
        }
    }

    /// Geometry and material of a drawable object.
    pub fn drawable(&self) -> Option<(GeometryId, MaterialId)> {
        match self.kind {
            ObjectKind::Mesh { geometry, material } | ObjectKind::Points { geometry, material } => {
                Some((geometry, material))
            }
            ObjectKind::Group | ObjectKind::Light(_) => None,
        }
    }

    pub fn parent<'a>(&self, scene: &'a Scene) -> Option<&'a Object3D> {
        self.parent_id.and_then(|id| scene.get_object(id))
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b Object3D> + 'b
    where
        'a: 'b,
    {
        self.child_ids
            .iter()
            .filter_map(move |id| scene.get_object(*id))
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::from_translation(Vec3::ZERO),
            kind: ObjectKind::Group,
            visible: true,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
