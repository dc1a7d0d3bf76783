//! Lumina Toasts
//!
//! A process-wide notification queue for transient, user-facing status
//! messages:
//! - **Bounded:** at most `capacity` (default 3) live notices; overflow
//!   evicts the oldest
//! - **Auto-expiring:** each notice removes itself after its duration unless
//!   the duration is zero
//! - **Observable:** renderers subscribe and receive the full ordered list on
//!   every change
//!
//! Timers go through the [`Scheduler`] trait so tests can drive virtual time
//! with [`ManualScheduler`]. The shared queue uses [`DeadlineScheduler`],
//! which accepts timers from any code path and fires them when the host
//! drives it. [`TokioScheduler`] spawns one task per timer and needs a
//! single-threaded `LocalSet`.

pub mod queue;
pub mod scheduler;
pub mod script;
pub mod toast;

pub use queue::{Subscription, ToastQueue};
pub use scheduler::{
    DeadlineScheduler, ManualScheduler, Scheduler, TimerCallback, TimerHandle, TokioScheduler,
};
pub use toast::{Severity, Toast, ToastId, ToastOptions};
