use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::platform::NodeId;
use crate::rendering::backend::{RenderBackend, Renderer, RendererOptions};
use crate::scene_graph::Scene;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessStats {
    pub created: usize,
    pub disposed: usize,
    pub frames: usize,
    pub resizes: usize,
    pub last_size: (u32, u32),
    pub pixel_ratio: f32,
    pub last_draw_count: usize,
    /// Options the most recent renderer was created with.
    pub last_options: Option<RendererOptions>,
}

impl HeadlessStats {
    pub fn live(&self) -> usize {
        self.created - self.disposed
    }
}

/// A backend without a GPU. Renderers keep the bookkeeping a real one would
/// and reject frames that would touch released resources.
#[derive(Default)]
pub struct HeadlessBackend {
    stats: Rc<RefCell<HeadlessStats>>,
    refuse_context: Cell<bool>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose context creation always fails, like a browser with
    /// WebGL disabled.
    pub fn without_context() -> Self {
        let backend = Self::default();
        backend.refuse_context.set(true);
        backend
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats.borrow().clone()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_renderer(
        &self,
        options: &RendererOptions,
    ) -> Result<Box<dyn Renderer>, RenderError> {
        if self.refuse_context.get() {
            return Err(RenderError::ContextUnavailable(
                "headless backend configured without a context".to_string(),
            ));
        }

        {
            let mut stats = self.stats.borrow_mut();
            stats.created += 1;
            stats.last_options = Some(*options);
        }

        Ok(Box::new(HeadlessRenderer {
            node: NodeId::next(),
            stats: self.stats.clone(),
            disposed: false,
        }))
    }
}

struct HeadlessRenderer {
    node: NodeId,
    stats: Rc<RefCell<HeadlessStats>>,
    disposed: bool,
}

impl Renderer for HeadlessRenderer {
    fn output_node(&self) -> NodeId {
        self.node
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.stats.borrow_mut().pixel_ratio = ratio;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        let mut stats = self.stats.borrow_mut();
        stats.resizes += 1;
        stats.last_size = (width, height);
    }

    fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::ContextUnavailable(
                "renderer already disposed".to_string(),
            ));
        }

        scene.update_transforms();
        let drawables = scene.visible_drawables();

        for &id in &drawables {
            let Some((geometry, material)) = scene.get_object(id).and_then(|object| object.drawable())
            else {
                continue;
            };

            let geometry_disposed = scene.geometry(geometry).map_or(true, |g| g.is_disposed());
            let material_disposed = scene.material(material).map_or(true, |m| m.is_disposed());
            if geometry_disposed || material_disposed {
                return Err(RenderError::Frame(format!(
                    "object {:?} references a disposed resource",
                    id
                )));
            }
        }

        let mut stats = self.stats.borrow_mut();
        stats.frames += 1;
        stats.last_draw_count = drawables.len();
        Ok(())
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.stats.borrow_mut().disposed += 1;
        }
    }
}
