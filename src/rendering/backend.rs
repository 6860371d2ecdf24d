use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::platform::NodeId;
use crate::scene_graph::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    AcesFilmic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    pub alpha: bool,
    pub antialias: bool,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            alpha: true,
            antialias: true,
            tone_mapping: ToneMapping::None,
            exposure: 1.0,
        }
    }
}

/// One GPU rendering context bound to one output node.
pub trait Renderer {
    /// The node the host appends to (and removes from) its container.
    fn output_node(&self) -> NodeId;

    fn set_pixel_ratio(&mut self, ratio: f32);

    /// Size in CSS pixels; the drawing buffer is this times the pixel ratio.
    fn set_size(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;

    /// Releases every GPU resource. Rendering afterwards fails.
    fn dispose(&mut self);
}

pub trait RenderBackend {
    fn create_renderer(&self, options: &RendererOptions)
        -> Result<Box<dyn Renderer>, RenderError>;
}
