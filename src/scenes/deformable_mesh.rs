use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::controller::{CameraSettings, FrameContext, SceneStrategy};
use crate::error::SceneError;
use crate::geometry::{primitives::icosahedron, GeometryId};
use crate::material::{Material, PhysicalMaterial};
use crate::math::Tween;
use crate::rendering::{RendererOptions, ToneMapping};
use crate::scene_graph::{Light, Object3D, ObjectId, Scene};

const FIELD_FREQUENCY: f32 = 1.5;
const FIELD_WEIGHT: f32 = 0.3;
const FIELD_AMPLITUDE: f32 = 0.2;

/// Radial scale of the vertex whose rest position is `rest` at time `t`
/// (seconds scaled by the scene's time factor).
pub fn displacement_scale(rest: Vec3, t: f32) -> f32 {
    let displacement = (rest.x * FIELD_FREQUENCY + t * 1.2).sin() * FIELD_WEIGHT
        + (rest.y * FIELD_FREQUENCY + t * 1.5).cos() * FIELD_WEIGHT
        + (rest.z * FIELD_FREQUENCY + t * 0.8).sin() * FIELD_WEIGHT;

    1.0 + displacement * FIELD_AMPLITUDE
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeformableConfig {
    pub radius: f32,
    pub detail: u32,
    pub time_scale: f64,
    /// Idle rotation rate around x and y.
    pub spin: Vec2,
    pub pointer_influence: f32,
    pub pointer_tween_ms: f64,
    pub camera_distance: f32,
    pub exposure: f32,
}

impl Default for DeformableConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            detail: 30,
            time_scale: 0.001,
            spin: Vec2::new(0.1, 0.15),
            pointer_influence: 0.2,
            pointer_tween_ms: 1500.0,
            camera_distance: 4.5,
            exposure: 1.2,
        }
    }
}

/// The blob hero: an iridescent icosphere whose surface ripples every frame
/// and that eases towards the pointer.
pub struct DeformableMesh {
    config: DeformableConfig,
    mesh: Option<(ObjectId, GeometryId)>,
    rest_positions: Vec<Vec3>,
    pointer_offset: Tween,
}

impl DeformableMesh {
    pub fn new(config: DeformableConfig) -> Self {
        let pointer_offset = Tween::new(Vec2::ZERO, config.pointer_tween_ms);

        Self {
            config,
            mesh: None,
            rest_positions: Vec::new(),
            pointer_offset,
        }
    }

    pub fn mesh(&self) -> Option<ObjectId> {
        self.mesh.map(|(object, _)| object)
    }

    pub fn rest_positions(&self) -> &[Vec3] {
        &self.rest_positions
    }

    pub fn pointer_target(&self) -> Vec2 {
        self.pointer_offset.target()
    }

    /// Rotation for a frame: idle spin plus the eased pointer offset.
    pub fn rotation_at(&self, time_ms: f64, wall_ms: f64) -> Vec3 {
        let t = (time_ms * self.config.time_scale) as f32;
        let offset = self.pointer_offset.value_at(wall_ms);

        Vec3::new(
            t * self.config.spin.x + offset.x,
            t * self.config.spin.y + offset.y,
            0.0,
        )
    }

    fn add_lights(scene: &mut Scene) {
        scene.add(Object3D::light(
            "Ambient",
            Light::ambient(0xffffff, 0.4),
            Vec3::ZERO,
        ));
        scene.add(Object3D::light(
            "Main",
            Light::directional(0xffffff, 2.0),
            Vec3::new(10.0, 10.0, 10.0),
        ));
        scene.add(Object3D::light(
            "Pink",
            Light::point(0xff00ff, 3.0, 20.0),
            Vec3::new(-5.0, 5.0, 5.0),
        ));
        scene.add(Object3D::light(
            "Blue",
            Light::point(0x00ffff, 3.0, 20.0),
            Vec3::new(5.0, -5.0, 5.0),
        ));
    }
}

impl Default for DeformableMesh {
    fn default() -> Self {
        Self::new(DeformableConfig::default())
    }
}

impl SceneStrategy for DeformableMesh {
    const NAME: &'static str = "deformable-mesh";

    fn camera(&self) -> CameraSettings {
        CameraSettings {
            position: Vec3::new(0.0, 0.0, self.config.camera_distance),
            ..Default::default()
        }
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            alpha: true,
            antialias: true,
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: self.config.exposure,
        }
    }

    fn build(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        if self.config.radius <= 0.0 {
            return Err(SceneError::InvalidParameter(format!(
                "blob radius must be positive, got {}",
                self.config.radius
            )));
        }

        let geometry = icosahedron(self.config.radius, self.config.detail);
        self.rest_positions = geometry.positions().to_vec();
        log::debug!(
            "{}: {} vertices, {} triangles",
            Self::NAME,
            geometry.vertex_count(),
            geometry.triangle_count()
        );

        let geometry = scene.add_geometry(geometry);
        let material = scene.add_material(Material::physical(PhysicalMaterial {
            color: Vec3::ONE,
            roughness: 0.15,
            metalness: 0.1,
            transmission: 1.0,
            thickness: 2.0,
            ior: 1.45,
            reflectivity: 0.9,
            iridescence: 1.0,
            iridescence_ior: 1.3,
            clearcoat: 1.0,
            clearcoat_roughness: 0.1,
            double_sided: true,
        }));

        let mesh = scene.add(Object3D::mesh("Blob", geometry, material));
        self.mesh = Some((mesh, geometry));
        Self::add_lights(scene);

        Ok(())
    }

    fn pointer_moved(&mut self, pointer: Vec2, now_ms: f64) {
        let influence = self.config.pointer_influence;
        self.pointer_offset
            .retarget(now_ms, Vec2::new(pointer.y * influence, pointer.x * influence));
    }

    fn update(&mut self, scene: &mut Scene, frame: &FrameContext) {
        let Some((mesh, geometry_id)) = self.mesh else {
            return;
        };

        scene.set_object_rotation_euler(mesh, self.rotation_at(frame.time_ms, frame.wall_ms));

        let Some(geometry) = scene.geometry_mut(geometry_id) else {
            return;
        };

        // always from the rest pose so the surface never drifts
        let t = (frame.time_ms * self.config.time_scale) as f32;
        geometry
            .positions_mut()
            .par_iter_mut()
            .zip(self.rest_positions.par_iter())
            .for_each(|(position, &rest)| *position = rest * displacement_scale(rest, t));
        geometry.compute_vertex_normals();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displacement_formula() {
        let expected = 1.0 + 0.2 * (0.3 * 1.5_f32.sin() + 0.3 * 0.0_f32.cos() + 0.3 * 0.0_f32.sin());
        let scale = displacement_scale(Vec3::X, 0.0);

        assert!((scale - expected).abs() < 1e-6);
        assert!((scale - 1.119_849_7).abs() < 1e-5);
    }

    #[test]
    fn test_deformation_does_not_accumulate() {
        let mut blob = DeformableMesh::new(DeformableConfig {
            detail: 2,
            ..Default::default()
        });
        let mut scene = Scene::new();
        blob.build(&mut scene).unwrap();

        let frame = |time_ms| FrameContext {
            time_ms,
            wall_ms: 0.0,
            pointer: Vec2::ZERO,
        };

        blob.update(&mut scene, &frame(500.0));
        let (_, geometry) = blob.mesh.unwrap();
        let first = scene.geometry(geometry).unwrap().positions().to_vec();

        blob.update(&mut scene, &frame(900.0));
        blob.update(&mut scene, &frame(500.0));
        let again = scene.geometry(geometry).unwrap().positions().to_vec();

        assert_eq!(first, again);
    }

    #[test]
    fn test_pointer_offset_eases_in() {
        let mut blob = DeformableMesh::default();
        blob.pointer_moved(Vec2::new(1.0, 0.5), 1000.0);

        assert!((blob.pointer_target() - Vec2::new(0.1, 0.2)).length() < 1e-6);
        assert_eq!(blob.rotation_at(0.0, 1000.0), Vec3::ZERO);

        let settled = blob.rotation_at(0.0, 2500.0);
        assert!((settled - Vec3::new(0.1, 0.2, 0.0)).length() < 1e-6);

        let midway = blob.rotation_at(0.0, 1750.0);
        assert!(midway.x > 0.05 && midway.x < 0.1);
    }

    #[test]
    fn test_scene_has_four_lights() {
        let mut blob = DeformableMesh::new(DeformableConfig {
            detail: 1,
            ..Default::default()
        });
        let mut scene = Scene::new();
        blob.build(&mut scene).unwrap();

        assert_eq!(scene.visible_lights().len(), 4);
        assert_eq!(scene.visible_drawables().len(), 1);
    }
}
