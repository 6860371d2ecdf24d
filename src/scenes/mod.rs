//! The three shipped scenes and a single entry point to mount any of them.

pub mod deformable_mesh;
pub mod loaded_asset;
pub mod particle_cloud;

use std::rc::Rc;

use crate::controller::{Environment, ReadyCallback, SceneController, SceneLifecycle};
use crate::platform::Container;

pub use deformable_mesh::{displacement_scale, DeformableConfig, DeformableMesh};
pub use loaded_asset::{boost_emissive, normalize_model, LoadedAsset, LoadedAssetConfig, Normalization};
pub use particle_cloud::{generate_particles, gradient_color, ParticleCloud, ParticleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKind {
    ParticleCloud,
    DeformableMesh,
    LoadedAsset,
}

impl SceneKind {
    pub fn name(self) -> &'static str {
        match self {
            SceneKind::ParticleCloud => "particles",
            SceneKind::DeformableMesh => "blob",
            SceneKind::LoadedAsset => "robot",
        }
    }
}

/// Constructs, initializes and starts the controller for `kind` with its
/// default configuration.
pub fn mount(
    kind: SceneKind,
    container: Rc<Container>,
    env: &Environment,
    on_ready: Option<ReadyCallback>,
) -> Box<dyn SceneLifecycle> {
    let controller: Box<dyn SceneLifecycle> = match kind {
        SceneKind::ParticleCloud => Box::new(SceneController::new(
            ParticleCloud::default(),
            container,
            env.clone(),
            on_ready,
        )),
        SceneKind::DeformableMesh => Box::new(SceneController::new(
            DeformableMesh::default(),
            container,
            env.clone(),
            on_ready,
        )),
        SceneKind::LoadedAsset => Box::new(SceneController::new(
            LoadedAsset::default(),
            container,
            env.clone(),
            on_ready,
        )),
    };

    controller.initialize();
    controller.start();
    controller
}
