pub mod light;
pub mod object3d;
pub mod scene;
pub mod transform;

pub use light::{Light, LightKind};
pub use object3d::{Object3D, ObjectId, ObjectKind};
pub use scene::{DisposeReport, Scene};
pub use transform::Transform;
