//! Participants: one seat in a room and its status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, PlayerId};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The account behind a participant, when the service knows it.
///
/// Automatched seats have no linked player until the match is formed, and
/// on some platforms never expose one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParticipantStatus
// ---------------------------------------------------------------------------

/// Where a participant is in the invitation/join lifecycle.
///
/// Statuses only move forward:
///
/// ```text
/// NotInvitedYet → Invited → Joined → Left | Finished
///                    │         │
///                    ▼         ▼
///                Declined  Unresponsive
/// ```
///
/// `Declined`, `Left` and `Finished` are terminal. `Unresponsive` is not:
/// the service may report a slow peer as joined again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    NotInvitedYet,
    Invited,
    Joined,
    Declined,
    Left,
    Finished,
    Unresponsive,
}

impl ParticipantStatus {
    /// Returns `true` for statuses a participant never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Left | Self::Finished)
    }

    /// Returns `true` if a participant in `self` may be reported as `next`.
    pub fn can_become(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Declined | Self::Left | Self::Finished => false,
            Self::NotInvitedYet => next != Self::NotInvitedYet,
            Self::Invited => !matches!(next, Self::NotInvitedYet),
            Self::Joined | Self::Unresponsive => {
                !matches!(next, Self::NotInvitedYet | Self::Invited | Self::Declined)
            }
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotInvitedYet => "NotInvitedYet",
            Self::Invited => "Invited",
            Self::Joined => "Joined",
            Self::Declined => "Declined",
            Self::Left => "Left",
            Self::Finished => "Finished",
            Self::Unresponsive => "Unresponsive",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One seat in a room, as reported in a single snapshot.
///
/// `connected` is whether the seat is part of the peer mesh right now. It
/// flips false→true while the mesh forms and true→false when a peer drops,
/// independently of `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub player: Option<Player>,
    pub status: ParticipantStatus,
    pub connected: bool,
}

impl Participant {
    pub fn new(
        id: impl Into<ParticipantId>,
        display_name: impl Into<String>,
        status: ParticipantStatus,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            player: None,
            status,
            connected: false,
        }
    }

    /// Links the seat to a player account.
    pub fn with_player(mut self, player: Player) -> Self {
        self.player = Some(player);
        self
    }

    /// Sets the mesh connectivity flag.
    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Returns `true` for seats filled by automatching with no known player.
    pub fn is_automatch(&self) -> bool {
        self.player.is_none()
    }

    /// Returns `true` if this seat belongs to `player_id`.
    pub fn is_player(&self, player_id: &PlayerId) -> bool {
        self.player.as_ref().is_some_and(|p| &p.id == player_id)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' (id {}, status={}, player={}, connected={})",
            self.display_name,
            self.id,
            self.status,
            self.player.as_ref().map_or("none", |p| p.id.as_str()),
            self.connected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_set() {
        assert!(ParticipantStatus::Declined.is_terminal());
        assert!(ParticipantStatus::Left.is_terminal());
        assert!(ParticipantStatus::Finished.is_terminal());
        assert!(!ParticipantStatus::Joined.is_terminal());
        assert!(!ParticipantStatus::Unresponsive.is_terminal());
    }

    #[test]
    fn test_status_can_become_never_leaves_terminal() {
        assert!(!ParticipantStatus::Left.can_become(ParticipantStatus::Joined));
        assert!(!ParticipantStatus::Declined.can_become(ParticipantStatus::Invited));
        assert!(ParticipantStatus::Left.can_become(ParticipantStatus::Left));
    }

    #[test]
    fn test_status_can_become_moves_forward() {
        assert!(ParticipantStatus::Invited.can_become(ParticipantStatus::Joined));
        assert!(ParticipantStatus::Joined.can_become(ParticipantStatus::Left));
        assert!(ParticipantStatus::Unresponsive.can_become(ParticipantStatus::Joined));
        assert!(!ParticipantStatus::Joined.can_become(ParticipantStatus::Invited));
    }

    #[test]
    fn test_participant_without_player_is_automatch() {
        let seat = Participant::new("p_1", "Anonymous", ParticipantStatus::Joined);
        assert!(seat.is_automatch());

        let linked = seat.with_player(Player::new("g1", "Alice"));
        assert!(!linked.is_automatch());
        assert!(linked.is_player(&PlayerId::from("g1")));
        assert!(!linked.is_player(&PlayerId::from("g2")));
    }
}
