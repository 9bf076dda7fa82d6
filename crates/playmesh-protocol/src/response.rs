//! Results the room service hands back: operation statuses, room responses,
//! UI results and invitations.

use serde::{Deserialize, Serialize};

use crate::{InvitationId, Participant, PlayerId, Room};

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Outcome of a multiplayer service call (room creation, accept, leave).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Valid,
    /// Served from cache; still counts as success.
    ValidButStale,
    Internal,
    NotAuthorized,
    VersionUpdateRequired,
    Timeout,
    /// The call referred to a room this client is not in.
    RoomNotJoined,
}

impl ResponseStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Valid | Self::ValidButStale)
    }
}

/// Outcome of a service-owned UI flow (player picker, invitation inbox).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    Valid,
    Internal,
    NotAuthorized,
    VersionUpdateRequired,
    Timeout,
    /// The user backed out.
    Canceled,
    /// Another UI was already showing.
    UiBusy,
    LeftRoom,
}

impl UiStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

// ---------------------------------------------------------------------------
// RoomResponse
// ---------------------------------------------------------------------------

/// The answer to a create-room or accept-invitation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomResponse {
    pub status: ResponseStatus,
    pub room: Option<Room>,
}

impl RoomResponse {
    /// A successful response carrying the newly joined room.
    pub fn success(room: Room) -> Self {
        Self {
            status: ResponseStatus::Valid,
            room: Some(room),
        }
    }

    /// A failed response.
    pub fn failure(status: ResponseStatus) -> Self {
        Self { status, room: None }
    }

    /// Success requires both a success status and a room.
    pub fn succeeded(&self) -> bool {
        self.status.is_success() && self.room.is_some()
    }

    /// The room, if the call succeeded.
    pub fn into_room(self) -> Option<Room> {
        if self.status.is_success() {
            self.room
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    RealTime,
    TurnBased,
}

/// An invitation to join someone else's room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub kind: InvitationKind,
    pub inviter: Option<Participant>,
    pub variant: u32,
}

impl Invitation {
    pub fn real_time(id: impl Into<InvitationId>) -> Self {
        Self {
            id: id.into(),
            kind: InvitationKind::RealTime,
            inviter: None,
            variant: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// UI responses
// ---------------------------------------------------------------------------

/// Result of the player-selection screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSelectResponse {
    pub status: UiStatus,
    pub invited_players: Vec<PlayerId>,
    pub min_automatch_players: u32,
    pub max_automatch_players: u32,
}

impl PlayerSelectResponse {
    pub fn canceled() -> Self {
        Self {
            status: UiStatus::Canceled,
            invited_players: Vec::new(),
            min_automatch_players: 0,
            max_automatch_players: 0,
        }
    }
}

/// Result of the invitation inbox screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxResponse {
    pub status: UiStatus,
    pub invitation: Option<Invitation>,
}

/// Result of listing the player's pending invitations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchInvitationsResponse {
    pub status: ResponseStatus,
    pub invitations: Vec<Invitation>,
}

impl FetchInvitationsResponse {
    /// Finds a real-time invitation by id. Failed fetches find nothing.
    pub fn find(&self, id: &InvitationId) -> Option<&Invitation> {
        if !self.status.is_success() {
            return None;
        }
        self.invitations.iter().find(|inv| &inv.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RoomId, RoomStatus};

    #[test]
    fn test_room_response_success_requires_room() {
        let no_room = RoomResponse {
            status: ResponseStatus::Valid,
            room: None,
        };
        assert!(!no_room.succeeded());

        let room = Room::new(RoomId::from("r1"), RoomStatus::Inviting, vec![]).unwrap();
        assert!(RoomResponse::success(room).succeeded());
        assert!(!RoomResponse::failure(ResponseStatus::Timeout).succeeded());
    }

    #[test]
    fn test_room_response_stale_counts_as_success() {
        let room = Room::new(RoomId::from("r1"), RoomStatus::Inviting, vec![]).unwrap();
        let response = RoomResponse {
            status: ResponseStatus::ValidButStale,
            room: Some(room),
        };
        assert!(response.succeeded());
        assert!(response.into_room().is_some());
    }

    #[test]
    fn test_fetch_find_ignores_failed_fetch() {
        let response = FetchInvitationsResponse {
            status: ResponseStatus::Internal,
            invitations: vec![Invitation::real_time("inv-1")],
        };
        assert!(response.find(&"inv-1".into()).is_none());

        let ok = FetchInvitationsResponse {
            status: ResponseStatus::Valid,
            ..response
        };
        assert!(ok.find(&"inv-1".into()).is_some());
        assert!(ok.find(&"inv-2".into()).is_none());
    }
}
