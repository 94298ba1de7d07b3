//! Explicit frame timing passed into `Renderer::update`.

use std::time::{Duration, Instant};

/// Elapsed time since start and delta since the previous frame.
///
/// A `start()` clock follows wall time on `tick()`; a `manual()` clock only
/// moves on `advance()`, which keeps tests and offline renders deterministic.
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Option<Instant>,
    elapsed: Duration,
    delta: Duration,
    frame: u64,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            origin: Some(Instant::now()),
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame: 0,
        }
    }

    pub fn manual() -> Self {
        Self {
            origin: None,
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame: 0,
        }
    }

    /// Sample wall time. On a manual clock this is a zero-length advance.
    pub fn tick(&mut self) {
        let now = match self.origin {
            Some(origin) => origin.elapsed(),
            None => self.elapsed,
        };
        self.delta = now.saturating_sub(self.elapsed);
        self.elapsed = now;
        self.frame += 1;
    }

    /// Move forward by a fixed step.
    pub fn advance(&mut self, dt: Duration) {
        self.delta = dt;
        self.elapsed += dt;
        self.frame += 1;
    }

    /// Seconds since start.
    pub fn elapsed(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Seconds since the previous tick or advance.
    pub fn delta(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Number of ticks and advances so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::manual()
    }
}
