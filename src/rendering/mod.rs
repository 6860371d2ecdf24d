pub mod backend;
pub mod global_uniform;
pub mod headless;
pub mod passes;
pub mod render_model;
pub mod texture;
pub mod wgpu_backend;

pub use backend::{RenderBackend, Renderer, RendererOptions, ToneMapping};
pub use headless::{HeadlessBackend, HeadlessStats};
pub use wgpu_backend::WgpuBackend;
