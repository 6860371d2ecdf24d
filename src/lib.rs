//! Self-contained real-time scenes for a portfolio showreel: a particle hero,
//! a deformable blob hero and a streamed model inside the menu overlay, all
//! driven by one lifecycle controller.

pub mod asset;
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod host;
pub mod material;
pub mod math;
pub mod model;
pub mod platform;
pub mod rendering;
pub mod scene_graph;
pub mod scenes;
pub mod texture;

pub use controller::{
    AssetLoadState, CameraSettings, Environment, FrameContext, LifecycleState, SceneController,
    SceneLifecycle, SceneStrategy, ViewportState,
};
pub use host::{HeroSection, MenuOverlay};
pub use scenes::{mount, SceneKind};
