//! Session clock and frame pacing.
//!
//! A viewer session is anchored to a monotonic epoch taken when the session
//! opens. The render loop is driven in fixed frame steps; `FrameTicker`
//! produces those steps for simulations that run without a real display.

use std::time::Instant;

/// A session clock that provides monotonic timestamps relative to
/// the moment the viewer session opened.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since the session opened.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Seconds elapsed since the session opened.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Fixed-rate frame stepper in virtual milliseconds.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    interval_ms: f64,
    frame: u64,
}

impl FrameTicker {
    /// Create a ticker targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            interval_ms: 1000.0 / target_hz.max(1) as f64,
            frame: 0,
        }
    }

    /// Advance one frame and return `(frame_index, timestamp_ms)` of the
    /// frame just entered. The first call returns frame 0 at 0 ms.
    pub fn tick(&mut self) -> (u64, f64) {
        let current = self.frame;
        self.frame += 1;
        (current, current as f64 * self.interval_ms)
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Frame interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }
}
