use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::controller::{CameraSettings, FrameContext, SceneStrategy};
use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::material::{color_from_hex, Material, PointsMaterial};
use crate::rendering::{RendererOptions, ToneMapping};
use crate::scene_graph::{Object3D, ObjectId, Scene};
use crate::texture::star_sprite;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    pub count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Exponent applied to the uniform sample; below 1 pushes points outward.
    pub radius_exponent: f32,
    pub color_start: u32,
    pub color_end: u32,
    pub point_size: f32,
    pub opacity: f32,
    pub alpha_test: f32,
    /// Radians per unit of scaled time around x and y.
    pub spin: Vec2,
    pub time_scale: f64,
    pub pointer_influence: f32,
    pub camera_distance: f32,
    /// Fixed seed for reproducible clouds. `None` samples from entropy.
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 400,
            min_radius: 0.6,
            max_radius: 2.0,
            radius_exponent: 0.2,
            color_start: 0x3185ff,
            color_end: 0xfc413e,
            point_size: 0.1,
            opacity: 0.8,
            alpha_test: 0.5,
            spin: Vec2::new(0.05, 0.2),
            time_scale: 0.0005,
            pointer_influence: 0.05,
            camera_distance: 4.0,
            seed: None,
        }
    }
}

impl ParticleConfig {
    fn validate(&self) -> Result<(), SceneError> {
        if self.count == 0 {
            return Err(SceneError::InvalidParameter(
                "particle count must be positive".to_string(),
            ));
        }
        if !(self.min_radius >= 0.0 && self.min_radius <= self.max_radius) {
            return Err(SceneError::InvalidParameter(format!(
                "radius range {}..{} is empty",
                self.min_radius, self.max_radius
            )));
        }
        Ok(())
    }
}

/// Positions and colors of a generated cloud, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleCloudData {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
}

/// Samples points in a hollow sphere. The polar angle comes from
/// `acos(2u - 1)` so points spread evenly over the sphere instead of bunching
/// at the poles.
pub fn generate_particles(config: &ParticleConfig, rng: &mut impl Rng) -> ParticleCloudData {
    let start = color_from_hex(config.color_start);
    let end = color_from_hex(config.color_end);

    let mut positions = Vec::with_capacity(config.count);
    let mut colors = Vec::with_capacity(config.count);

    for _ in 0..config.count {
        let radius = config.min_radius
            + (config.max_radius - config.min_radius)
                * rng.gen::<f32>().powf(config.radius_exponent);
        let theta = rng.gen::<f32>() * TAU;
        let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();

        let position = Vec3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
        );

        colors.push(gradient_color(position.x, start, end));
        positions.push(position);
    }

    ParticleCloudData { positions, colors }
}

/// Left-to-right gradient: x = -2 maps to `start`, x = 2 to `end`.
pub fn gradient_color(x: f32, start: Vec3, end: Vec3) -> Vec3 {
    let mix = ((x / 2.0 + 1.0) / 2.0).clamp(0.0, 1.0);
    start.lerp(end, mix)
}

/// The particle hero: a slowly spinning cloud of star sprites that tilts with
/// the pointer immediately, without damping.
pub struct ParticleCloud {
    config: ParticleConfig,
    points: Option<ObjectId>,
}

impl ParticleCloud {
    pub fn new(config: ParticleConfig) -> Self {
        Self {
            config,
            points: None,
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn points(&self) -> Option<ObjectId> {
        self.points
    }

    /// Rotation for a frame: constant spin plus a direct pointer offset.
    pub fn rotation_at(&self, time_ms: f64, pointer: Vec2) -> Vec3 {
        let t = (time_ms * self.config.time_scale) as f32;
        let influence = self.config.pointer_influence;

        Vec3::new(
            t * self.config.spin.x + pointer.y * influence,
            t * self.config.spin.y + pointer.x * influence,
            0.0,
        )
    }
}

impl Default for ParticleCloud {
    fn default() -> Self {
        Self::new(ParticleConfig::default())
    }
}

impl SceneStrategy for ParticleCloud {
    const NAME: &'static str = "particle-cloud";

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
            tone_mapping: ToneMapping::None,
            exposure: 1.0,
        }
    }

    fn build(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        self.config.validate()?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let cloud = generate_particles(&self.config, &mut rng);

        let geometry = scene.add_geometry(Geometry::new(cloud.positions).with_colors(cloud.colors));
        let sprite = scene.add_texture(star_sprite());
        let material = scene.add_material(Material::points(PointsMaterial {
            size: self.config.point_size,
            map: Some(sprite),
            vertex_colors: true,
            transparent: true,
            opacity: self.config.opacity,
            size_attenuation: true,
            alpha_test: self.config.alpha_test,
        }));

        self.points = Some(scene.add(Object3D::points("Particles", geometry, material)));
        log::debug!("{}: generated {} points", Self::NAME, self.config.count);

        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, frame: &FrameContext) {
        let Some(points) = self.points else {
            return;
        };

        let rotation = self.rotation_at(frame.time_ms, frame.pointer);
        scene.set_object_rotation_euler(points, rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> ParticleCloudData {
        generate_particles(&ParticleConfig::default(), &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_radii_stay_in_shell() {
        let cloud = seeded(7);
        assert_eq!(cloud.positions.len(), 400);
        assert_eq!(cloud.colors.len(), 400);

        for position in &cloud.positions {
            let radius = position.length();
            assert!(radius >= 0.6 - 1e-5 && radius <= 2.0 + 1e-5, "radius {}", radius);
        }
    }

    #[test]
    fn test_gradient_endpoints() {
        let start = color_from_hex(0x3185ff);
        let end = color_from_hex(0xfc413e);

        assert!((gradient_color(-2.0, start, end) - start).length() < 1e-6);
        assert!((gradient_color(2.0, start, end) - end).length() < 1e-6);
        assert!((gradient_color(-5.0, start, end) - start).length() < 1e-6);
        assert!((gradient_color(0.0, start, end) - start.lerp(end, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_seed_reproduces_cloud() {
        assert_eq!(seeded(42), seeded(42));
        assert_ne!(seeded(42).positions, seeded(43).positions);
    }

    #[test]
    fn test_pointer_offset_is_additive() {
        let cloud = ParticleCloud::default();

        let idle = cloud.rotation_at(2000.0, Vec2::ZERO);
        assert!((idle - Vec3::new(0.05, 0.2, 0.0)).length() < 1e-6);

        let tilted = cloud.rotation_at(2000.0, Vec2::new(1.0, 1.0));
        assert!((tilted - idle - Vec3::new(0.05, 0.05, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cloud = ParticleCloud::new(ParticleConfig {
            count: 0,
            ..Default::default()
        });
        assert!(cloud.build(&mut Scene::new()).is_err());
    }
}
