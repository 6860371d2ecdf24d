#![allow(dead_code)]

use std::rc::Rc;

use glam::Vec3;
use showreel::{
    asset::ManualAssetSource,
    model::{MaterialData, ModelData, NodeData, PrimitiveData},
    platform::{Container, FrameScheduler, ManualClock, Viewport},
    rendering::HeadlessBackend,
    Environment,
};

/// An environment whose parts stay reachable by their concrete types.
pub struct Harness {
    pub viewport: Rc<Viewport>,
    pub frames: Rc<FrameScheduler>,
    pub backend: Rc<HeadlessBackend>,
    pub assets: Rc<ManualAssetSource>,
    pub clock: Rc<ManualClock>,
    pub container: Rc<Container>,
}

impl Harness {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_backend(width, height, HeadlessBackend::new())
    }

    pub fn with_backend(width: u32, height: u32, backend: HeadlessBackend) -> Self {
        Self {
            viewport: Rc::new(Viewport::new(width as f32, height as f32, 1.0)),
            frames: Rc::new(FrameScheduler::new()),
            backend: Rc::new(backend),
            assets: Rc::new(ManualAssetSource::new()),
            clock: Rc::new(ManualClock::new(0.0)),
            container: Rc::new(Container::new(width, height)),
        }
    }

    pub fn env(&self) -> Environment {
        Environment {
            viewport: self.viewport.clone(),
            frames: self.frames.clone(),
            backend: self.backend.clone(),
            assets: self.assets.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Resizes both the window and the container, then notifies listeners.
    pub fn resize(&self, width: u32, height: u32) {
        self.viewport.set_inner_size(width as f32, height as f32);
        self.container.set_client_size(width, height);
        self.viewport.dispatch_resize();
    }
}

/// A small model with an emissive part, 4 units wide.
pub fn robot_model() -> ModelData {
    let mut body = NodeData::new("body");
    body.primitives.push(PrimitiveData {
        positions: vec![
            Vec3::new(-2.0, -1.0, 0.0),
            Vec3::new(2.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.5),
        ],
        normals: None,
        indices: None,
        material: MaterialData {
            emissive: Vec3::new(0.0, 1.0, 1.0),
            emissive_strength: 0.5,
            ..Default::default()
        },
    });

    ModelData {
        name: "robot_2.0.glb".to_string(),
        roots: vec![body],
    }
}
