pub mod bounds;
pub mod easing;

pub use bounds::Aabb;
pub use easing::Tween;
