use glam::{Vec2, Vec3};

use crate::controller::{CameraSettings, FrameContext, SceneStrategy};
use crate::error::{AssetError, SceneError};
use crate::geometry::primitives::sphere;
use crate::material::{color_from_hex, Material, StandardMaterial};
use crate::model::{spawn_model, ModelData};
use crate::rendering::{RendererOptions, ToneMapping};
use crate::scene_graph::{Light, Object3D, ObjectId, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAssetConfig {
    pub asset_path: String,
    /// Largest dimension of the model after normalization.
    pub target_size: f32,
    pub emissive_floor: f32,
    /// Fraction of the remaining distance covered each frame.
    pub smoothing: f32,
    pub yaw_range: f32,
    pub pitch_range: f32,
    pub bob_amplitude: f32,
    pub bob_speed: f32,
    pub fov_degrees: f32,
    pub camera_position: Vec3,
    pub exposure: f32,
    pub max_pixel_ratio: f32,
    pub fallback_radius: f32,
}

impl Default for LoadedAssetConfig {
    fn default() -> Self {
        Self {
            asset_path: "robot_2.0.glb".to_string(),
            target_size: 2.5,
            emissive_floor: 2.0,
            smoothing: 0.08,
            yaw_range: 0.5,
            pitch_range: 0.25,
            bob_amplitude: 0.05,
            bob_speed: 1.5,
            fov_degrees: 35.0,
            camera_position: Vec3::new(0.0, 0.0, 8.0),
            exposure: 1.2,
            max_pixel_ratio: 2.0,
            fallback_radius: 0.5,
        }
    }
}

/// What [`normalize_model`] applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    pub translation: Vec3,
}

/// Scales `model` so its largest dimension becomes `target_size`, then moves
/// it so its bounding box is centered on the origin. The box is measured again
/// after scaling since scaling moves the center.
pub fn normalize_model(scene: &mut Scene, model: ObjectId, target_size: f32) -> Option<Normalization> {
    let bounds = scene.world_bounds(model)?;
    let max_dimension = bounds.size().max_element();
    if max_dimension <= f32::EPSILON {
        return None;
    }

    let scale = target_size / max_dimension;
    scene.set_object_scale(model, scale);

    let scaled = scene.world_bounds(model)?;
    let position = scene.get_object_transform(model)?.translation();
    let translation = position - scaled.center();
    scene.set_object_translation(model, translation);

    Some(Normalization { scale, translation })
}

/// Raises every emissive material under `root` to at least `floor`.
/// Returns how many materials have an emissive channel.
pub fn boost_emissive(scene: &mut Scene, root: ObjectId, floor: f32) -> usize {
    let materials: Vec<_> = scene
        .traverse(root)
        .into_iter()
        .filter_map(|id| scene.get_object(id)?.drawable())
        .map(|(_, material)| material)
        .collect();

    materials
        .into_iter()
        .filter(|&material| {
            scene
                .material_mut(material)
                .is_some_and(|material| material.raise_emissive_floor(floor))
        })
        .count()
}

/// The menu overlay scene: a streamed model that turns towards the pointer
/// with exponential smoothing and bobs gently. A sphere stands in when the
/// model cannot be loaded.
pub struct LoadedAsset {
    config: LoadedAssetConfig,
    group: Option<ObjectId>,
    model: Option<ObjectId>,
    /// Pitch in x, yaw in y.
    target_rotation: Vec2,
    current_rotation: Vec2,
}

impl LoadedAsset {
    pub fn new(config: LoadedAssetConfig) -> Self {
        Self {
            config,
            group: None,
            model: None,
            target_rotation: Vec2::ZERO,
            current_rotation: Vec2::ZERO,
        }
    }

    /// The group that holds the model, or the fallback once loading failed.
    pub fn group(&self) -> Option<ObjectId> {
        self.group
    }

    pub fn model(&self) -> Option<ObjectId> {
        self.model
    }

    pub fn target_rotation(&self) -> Vec2 {
        self.target_rotation
    }

    pub fn current_rotation(&self) -> Vec2 {
        self.current_rotation
    }

    pub fn bob_offset(&self, wall_ms: f64) -> f32 {
        let seconds = (wall_ms * 0.001) as f32;
        (seconds * self.config.bob_speed).sin() * self.config.bob_amplitude
    }

    fn add_lights(scene: &mut Scene) {
        scene.add(Object3D::light(
            "Ambient",
            Light::ambient(0xffffff, 0.6),
            Vec3::ZERO,
        ));
        scene.add(Object3D::light(
            "Key",
            Light::directional(0xffffff, 1.2),
            Vec3::new(3.0, 3.0, 5.0),
        ));
        scene.add(Object3D::light(
            "Rim",
            Light::directional(0x00ffff, 0.5),
            Vec3::new(-3.0, 2.0, -3.0),
        ));
        scene.add(Object3D::light(
            "Fill",
            Light::directional(0x4444ff, 0.3),
            Vec3::new(0.0, -3.0, 2.0),
        ));
    }

    fn insert_model(&mut self, scene: &mut Scene, group: ObjectId, model: &ModelData) {
        let root = spawn_model(scene, model);

        match normalize_model(scene, root, self.config.target_size) {
            Some(normalization) => log::info!(
                "{}: applied scale {:.4}, offset {:?}",
                Self::NAME,
                normalization.scale,
                normalization.translation
            ),
            None => log::warn!("{}: model {} has no extent", Self::NAME, model.name),
        }

        let emissive = boost_emissive(scene, root, self.config.emissive_floor);
        log::debug!("{}: {} emissive materials boosted", Self::NAME, emissive);

        scene.set_object_parent(root, Some(group));
        self.model = Some(root);
    }

    fn insert_fallback(&mut self, scene: &mut Scene, group: ObjectId) {
        let discarded = scene.clear_children(group);
        if discarded > 0 {
            log::debug!("{}: discarded {} placeholder children", Self::NAME, discarded);
        }

        let geometry = scene.add_geometry(sphere(self.config.fallback_radius, 32, 32));
        let material = scene.add_material(Material::standard(StandardMaterial {
            color: color_from_hex(0xffffff),
            metalness: 0.3,
            roughness: 0.4,
            ..Default::default()
        }));

        scene.add_child(group, Object3D::mesh("Fallback", geometry, material));
    }
}

impl Default for LoadedAsset {
    fn default() -> Self {
        Self::new(LoadedAssetConfig::default())
    }
}

impl SceneStrategy for LoadedAsset {
    const NAME: &'static str = "loaded-asset";

    fn camera(&self) -> CameraSettings {
        CameraSettings {
            fov_degrees: self.config.fov_degrees,
            position: self.config.camera_position,
            target: Vec3::ZERO,
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

    fn max_pixel_ratio(&self) -> Option<f32> {
        Some(self.config.max_pixel_ratio)
    }

    fn build(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        if self.config.target_size <= 0.0 {
            return Err(SceneError::InvalidParameter(format!(
                "target size must be positive, got {}",
                self.config.target_size
            )));
        }

        self.group = Some(scene.add(Object3D::group("Placeholder")));
        Self::add_lights(scene);

        Ok(())
    }

    fn asset_path(&self) -> Option<&str> {
        Some(&self.config.asset_path)
    }

    fn asset_loaded(&mut self, scene: &mut Scene, result: Result<ModelData, AssetError>) {
        let Some(group) = self.group else {
            return;
        };

        match result {
            Ok(model) => self.insert_model(scene, group, &model),
            Err(_) => self.insert_fallback(scene, group),
        }
    }

    fn pointer_moved(&mut self, pointer: Vec2, _now_ms: f64) {
        self.target_rotation = Vec2::new(
            -pointer.y * self.config.pitch_range,
            pointer.x * self.config.yaw_range,
        );
    }

    fn update(&mut self, scene: &mut Scene, frame: &FrameContext) {
        let Some(group) = self.group else {
            return;
        };

        self.current_rotation +=
            (self.target_rotation - self.current_rotation) * self.config.smoothing;

        scene.set_object_rotation_euler(
            group,
            Vec3::new(self.current_rotation.x, self.current_rotation.y, 0.0),
        );
        scene.set_object_translation(group, Vec3::new(0.0, self.bob_offset(frame.wall_ms), 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn box_model(scene: &mut Scene, min: Vec3, max: Vec3) -> ObjectId {
        let geometry = scene.add_geometry(Geometry::new(vec![min, max]));
        let material = scene.add_material(Material::standard(StandardMaterial {
            emissive: Some(Vec3::ONE),
            emissive_intensity: 0.5,
            ..Default::default()
        }));

        let root = scene.add_object(Object3D::group("model"));
        scene.add_child(root, Object3D::mesh("body", geometry, material));
        root
    }

    #[test]
    fn test_normalize_scales_and_centers() {
        let mut scene = Scene::new();
        let model = box_model(&mut scene, Vec3::new(1.0, 1.0, 1.0), Vec3::new(5.0, 3.0, 2.0));

        let normalization = normalize_model(&mut scene, model, 2.5).unwrap();
        assert!((normalization.scale - 0.625).abs() < 1e-6);

        let bounds = scene.world_bounds(model).unwrap();
        assert!(bounds.center().length() < 1e-5);
        assert!((bounds.size().max_element() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_emissive_floor_never_lowers() {
        let mut scene = Scene::new();
        let model = box_model(&mut scene, Vec3::ZERO, Vec3::ONE);

        let bright = scene.add_material(Material::standard(StandardMaterial {
            emissive: Some(Vec3::X),
            emissive_intensity: 5.0,
            ..Default::default()
        }));
        let geometry = scene.add_geometry(Geometry::new(vec![Vec3::ZERO, Vec3::ONE]));
        scene.add_child(model, Object3D::mesh("eyes", geometry, bright));

        assert_eq!(boost_emissive(&mut scene, model, 2.0), 2);

        let intensities: Vec<_> = scene
            .materials
            .iter()
            .filter_map(|(_, material)| material.emissive_intensity())
            .collect();
        assert_eq!(intensities, vec![2.0, 5.0]);
    }

    #[test]
    fn test_failure_inserts_fallback() {
        let mut robot = LoadedAsset::default();
        let mut scene = Scene::new();
        robot.build(&mut scene).unwrap();

        robot.asset_loaded(
            &mut scene,
            Err(AssetError::Empty("robot_2.0.glb".to_string())),
        );

        let group = robot.group().unwrap();
        let fallback = scene.get_object(group).unwrap().child_ids[0];
        assert_eq!(scene.get_object(fallback).unwrap().name, "Fallback");
        assert!(robot.model().is_none());
    }

    #[test]
    fn test_rotation_smoothing() {
        let mut robot = LoadedAsset::default();
        let mut scene = Scene::new();
        robot.build(&mut scene).unwrap();

        robot.pointer_moved(Vec2::new(1.0, 1.0), 0.0);
        assert_eq!(robot.target_rotation(), Vec2::new(-0.25, 0.5));

        let frame = FrameContext {
            time_ms: 0.0,
            wall_ms: 0.0,
            pointer: Vec2::ONE,
        };
        robot.update(&mut scene, &frame);
        assert!((robot.current_rotation() - Vec2::new(-0.02, 0.04)).length() < 1e-6);

        for _ in 0..200 {
            robot.update(&mut scene, &frame);
        }
        assert!((robot.current_rotation() - robot.target_rotation()).length() < 1e-4);
    }
}
