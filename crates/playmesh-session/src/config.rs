//! Session configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a session does when the local player drops out of the mesh while
/// the room is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfDisconnectPolicy {
    /// Tell the listener (`on_self_disconnected`) and stay in the room.
    /// The game decides whether to leave.
    #[default]
    Notify,
    /// Tell the listener, then leave the room (`on_left_room` follows).
    Leave,
}

/// Per-session tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Setup progress reported as soon as the room exists, before any
    /// peer has connected. The remainder up to 100 is split evenly across
    /// the room's participants.
    pub initial_progress_percent: f32,

    pub self_disconnect: SelfDisconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_progress_percent: 20.0,
            self_disconnect: SelfDisconnectPolicy::Notify,
        }
    }
}

impl SessionConfig {
    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        let initial = self.initial_progress_percent;
        if !initial.is_finite() {
            warn!(initial, "initial_progress_percent is not finite: using default");
            self.initial_progress_percent = Self::default().initial_progress_percent;
        } else if !(0.0..=100.0).contains(&initial) {
            warn!(initial, "initial_progress_percent outside 0..=100: clamping");
            self.initial_progress_percent = initial.clamp(0.0, 100.0);
        }
        self
    }
}
