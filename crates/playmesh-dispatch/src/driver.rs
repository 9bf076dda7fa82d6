//! Fixed-rate frame driver for a [`GameThreadQueue`].
//!
//! Engines call [`GameThreadQueue::run_pending`] from their own update
//! loop. Headless tools, demos and tests have no such loop; they can hand
//! the queue to a `FrameDriver` inside a Tokio task instead:
//!
//! ```ignore
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let driver = FrameDriver::new(queue, FrameDriverConfig::with_rate(60));
//! tokio::spawn(driver.run(stop_rx));
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::GameThreadQueue;

/// Configuration for a [`FrameDriver`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameDriverConfig {
    /// Frames per second. Clamped to `1..=MAX_FRAME_RATE_HZ`.
    pub frame_rate_hz: u32,
}

impl Default for FrameDriverConfig {
    fn default() -> Self {
        Self { frame_rate_hz: 60 }
    }
}

impl FrameDriverConfig {
    pub const MAX_FRAME_RATE_HZ: u32 = 240;

    pub fn with_rate(frame_rate_hz: u32) -> Self {
        Self { frame_rate_hz }
    }

    pub fn validated(mut self) -> Self {
        let clamped = self.frame_rate_hz.clamp(1, Self::MAX_FRAME_RATE_HZ);
        if clamped != self.frame_rate_hz {
            warn!(
                rate = self.frame_rate_hz,
                clamped,
                "frame_rate_hz out of range: clamping"
            );
            self.frame_rate_hz = clamped;
        }
        self
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// Drains a queue once per frame until told to stop.
pub struct FrameDriver {
    queue: Arc<GameThreadQueue>,
    config: FrameDriverConfig,
}

impl FrameDriver {
    pub fn new(queue: Arc<GameThreadQueue>, config: FrameDriverConfig) -> Self {
        Self {
            queue,
            config: config.validated(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.config.frame_duration()
    }

    /// Runs until `stop` turns `true` or its sender is dropped. A last
    /// drain runs before returning so nothing queued before the stop is
    /// lost. Returns the number of frames driven.
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut interval = time::interval(self.frame_duration());
        // A late frame is not worth a burst of catch-up frames.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(rate_hz = self.config.frame_rate_hz, "frame driver started");
        let mut frames = 0u64;

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.queue.run_pending();
                    frames += 1;
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.queue.run_pending();
        debug!(frames, "frame driver stopped");
        frames
    }
}
