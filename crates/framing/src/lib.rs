//! Lumina Framing: camera auto-fit for the model viewer
//!
//! Frames a freshly loaded model without per-model configuration:
//! - **Bounds:** union the world-space boxes of every selectable mesh
//! - **Sphere:** derive a bounding sphere from that box
//! - **Pose:** back the camera off along a fixed three-quarter direction far
//!   enough that the sphere fits the vertical field of view, with padding
//!
//! The fit runs at most once per viewer session. Until it succeeds it is
//! retried every frame; afterwards it is a single boolean check.
//!
//! This crate is pure computation over the scene model; no I/O.

pub mod auto_fit;
pub mod session;

pub use auto_fit::{AutoFit, AutoFitConfig, DeferReason, FitLatch, FitOutcome, FitResult};
pub use session::ViewerSession;
