//! Lumina Scene Model
//!
//! Defines the data contracts the viewer core reads and writes:
//! - **Bounds:** Axis-aligned boxes and bounding spheres
//! - **Scene:** A node arena with local transforms, world matrices, and
//!   the "selectable" tag that marks loaded model geometry
//! - **Camera:** Perspective camera, orbit controls, and saved camera state
//!
//! Vector and matrix math uses `glam`'s double-precision types (`DVec3`,
//! `DQuat`, `DMat4`), re-exported here. World space is right-handed and
//! Y-up. The default camera sits on the +Z axis looking toward the origin.

pub mod bounds;
pub mod camera;
pub mod scene;

pub use bounds::*;
pub use camera::*;
pub use scene::*;

pub use glam::{DMat4, DQuat, DVec3, EulerRot};
