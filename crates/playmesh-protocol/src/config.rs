//! Room creation configuration.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, PlayerSelectResponse};

/// What to ask the service for when creating a room.
///
/// Built with chained setters:
///
/// ```rust
/// use playmesh_protocol::RoomConfig;
///
/// let config = RoomConfig::new()
///     .variant(2)
///     .min_automatch_players(1)
///     .max_automatch_players(3);
/// assert_eq!(config.max_automatch_players, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Game-defined match variant; only rooms with equal variants match.
    pub variant: u32,
    pub min_automatch_players: u32,
    pub max_automatch_players: u32,
    /// Players invited explicitly, in addition to automatch seats.
    pub invited_players: Vec<PlayerId>,
    /// Automatch role mask; 0 means no exclusivity.
    pub exclusive_bitmask: u64,
}

impl RoomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant(mut self, variant: u32) -> Self {
        self.variant = variant;
        self
    }

    pub fn min_automatch_players(mut self, min: u32) -> Self {
        self.min_automatch_players = min;
        self
    }

    pub fn max_automatch_players(mut self, max: u32) -> Self {
        self.max_automatch_players = max;
        self
    }

    pub fn invite(mut self, player: impl Into<PlayerId>) -> Self {
        self.invited_players.push(player.into());
        self
    }

    pub fn exclusive_bitmask(mut self, mask: u64) -> Self {
        self.exclusive_bitmask = mask;
        self
    }

    /// Copies the invitees and automatch bounds chosen on the
    /// player-selection screen.
    pub fn populate_from_selection(mut self, selection: &PlayerSelectResponse) -> Self {
        self.invited_players
            .extend(selection.invited_players.iter().cloned());
        self.min_automatch_players = selection.min_automatch_players;
        self.max_automatch_players = selection.max_automatch_players;
        self
    }

    /// Total seats this config asks for, counting the local player.
    pub fn max_seats(&self) -> usize {
        1 + self.invited_players.len() + self.max_automatch_players as usize
    }
}
