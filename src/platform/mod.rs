//! The slice of the hosting environment a scene controller is allowed to touch:
//! its container element, the global viewport, the display refresh signal and
//! a wall clock.

pub mod clock;
pub mod container;
pub mod frame;
pub mod viewport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use container::{Container, NodeId};
pub use frame::{FrameHandle, FrameScheduler};
pub use viewport::{ListenerId, PointerEvent, Viewport};
